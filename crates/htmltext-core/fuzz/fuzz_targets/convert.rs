#![no_main]

use htmltext_core::image::ImageArtifact;
use htmltext_core::pipeline::{ConvertOptions, Converter};
use htmltext_core::tags::{LinkHandler, TableHandler};
use libfuzzer_sys::fuzz_target;

struct Sink;

impl TableHandler for Sink {
    fn on_table_click(&self, _html: &str) {}
}

impl LinkHandler for Sink {
    fn on_link_click(&self, _target: &str) {}
}

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must not panic, and every span must land on char boundaries.
        let converter = Converter::new(ConvertOptions {
            trim_trailing_blank_lines: true,
            substitute_symbolic_text: true,
            ..ConvertOptions::default()
        })
        .with_table_handler(Some(&Sink))
        .with_link_handler(Some(&Sink));
        let styled = converter.convert(input, &mut |r: &str| ImageArtifact::placeholder(r));
        for span in styled.spans() {
            assert!(styled.text().is_char_boundary(span.range.start));
            assert!(styled.text().is_char_boundary(span.range.end));
        }
        let _runs = styled.runs();
    }
});
