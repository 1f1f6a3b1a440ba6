#![no_main]

use htmltext_core::resolve::http::parse_response;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Must not panic on any byte sequence. Errors are fine.
    let _result = parse_response(data);
});
