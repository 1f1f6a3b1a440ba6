#![no_main]

use htmltext_core::config::HtmlTextConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _config = HtmlTextConfig::from_toml_str(input);
    }
});
