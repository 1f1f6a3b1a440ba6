//! Shared test doubles.

use std::cell::RefCell;
use std::collections::HashMap;

use htmltext_types::error::{HtmlTextError, Result};

use crate::image::ImageArtifact;
use crate::resolve::{Fetcher, ImageResolver, Url};
use crate::styled::{Annotation, LinkStyle, StyledText};
use crate::tags::{LinkHandler, TableHandler};

/// Records every reference it is asked for and answers with a placeholder.
#[derive(Debug, Default)]
pub struct CountingResolver {
    pub calls: Vec<String>,
}

impl ImageResolver for CountingResolver {
    fn resolve(&mut self, reference: &str) -> ImageArtifact {
        self.calls.push(reference.to_string());
        ImageArtifact::placeholder(reference)
    }
}

/// Text covered by every span whose annotation matches `pred`, in span order.
pub fn annotated_text(styled: &StyledText, pred: impl Fn(&Annotation) -> bool) -> Vec<&str> {
    styled
        .spans()
        .iter()
        .filter(|s| pred(&s.annotation))
        .map(|s| &styled.text()[s.range.clone()])
        .collect()
}

/// Smallest byte sequence that sniffs as a 1x1 PNG.
pub fn tiny_png() -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data.extend_from_slice(&[0; 4]);
    data
}

/// Fetcher that never succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingFetcher;

impl Fetcher for FailingFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        Err(HtmlTextError::Network(format!("unreachable: {url}")))
    }
}

/// Fetcher serving canned bodies keyed by full URL.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl StaticFetcher {
    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let key = url.to_string();
        self.requests.borrow_mut().push(key.clone());
        self.bodies
            .get(&key)
            .cloned()
            .ok_or_else(|| HtmlTextError::Network(format!("404 for {key}")))
    }
}

#[derive(Debug, Default)]
pub struct RecordingTableHandler {
    pub clicks: RefCell<Vec<String>>,
}

impl TableHandler for RecordingTableHandler {
    fn on_table_click(&self, html: &str) {
        self.clicks.borrow_mut().push(html.to_string());
    }
}

#[derive(Debug, Default)]
pub struct RecordingLinkHandler {
    pub style: LinkStyle,
    pub clicks: RefCell<Vec<String>>,
}

impl RecordingLinkHandler {
    pub fn with_style(style: LinkStyle) -> Self {
        Self {
            style,
            clicks: RefCell::default(),
        }
    }
}

impl LinkHandler for RecordingLinkHandler {
    fn style(&self) -> LinkStyle {
        self.style.clone()
    }

    fn on_link_click(&self, target: &str) {
        self.clicks.borrow_mut().push(target.to_string());
    }
}
