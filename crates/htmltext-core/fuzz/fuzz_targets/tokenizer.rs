#![no_main]

use htmltext_core::html::tokenizer::tokenize;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must not panic or loop infinitely on any input.
        let _tokens = tokenize(input);
    }
});
