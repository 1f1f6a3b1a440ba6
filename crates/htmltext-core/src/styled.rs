//! Styled text: a string plus possibly-overlapping annotated ranges.
//!
//! Ranges are half-open byte offsets into the text and always fall on
//! char boundaries. Annotations may nest or overlap freely; [`StyledText::runs`]
//! flattens them into a contiguous sequence of runs for renderers.

use std::ops::Range;

use htmltext_types::color::Color;
use htmltext_types::error::Result;
use serde::Serialize;

use crate::image::ImageArtifact;

/// Object replacement character used to stand in for inline images.
pub const OBJECT_CHAR: char = '\u{FFFC}';

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Normal,
    Center,
    Opposite,
}

/// Draw style applied to internal links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkStyle {
    pub color: Option<Color>,
    pub underline: bool,
    /// Text size relative to the surrounding text.
    pub text_size: Option<f32>,
}

impl Default for LinkStyle {
    fn default() -> Self {
        Self {
            color: None,
            underline: true,
            text_size: None,
        }
    }
}

/// A style or region tag attached to a range of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Monospace,
    Superscript,
    Subscript,
    RelativeSize { scale: f32 },
    Color { color: Color },
    Typeface { family: String },
    Quote,
    Link { href: String },
    Image { artifact: ImageArtifact },
    Bullet { depth: usize },
    Indent { depth: usize },
    Align { alignment: Alignment },
    TableCell { row: usize, column: usize, header: bool },
    /// A whole table, clickable when a table handler is configured.
    Table { html: String },
    InternalLink { target: String, style: LinkStyle },
}

impl Annotation {
    /// Whether a pointer sequence landing on this annotation activates it.
    pub fn is_clickable(&self) -> bool {
        matches!(
            self,
            Annotation::Link { .. } | Annotation::Table { .. } | Annotation::InternalLink { .. }
        )
    }
}

/// One annotation over a byte range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub range: Range<usize>,
    pub annotation: Annotation,
}

/// A maximal slice of text over which the set of annotations is constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Run<'a> {
    pub range: Range<usize>,
    pub text: &'a str,
    pub annotations: Vec<&'a Annotation>,
}

/// Immutable styled text value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyledText {
    text: String,
    spans: Vec<Span>,
}

impl StyledText {
    /// Unstyled text.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Annotations covering the byte at `offset`.
    pub fn annotations_at(&self, offset: usize) -> impl Iterator<Item = &Annotation> {
        self.spans
            .iter()
            .filter(move |s| s.range.contains(&offset))
            .map(|s| &s.annotation)
    }

    /// The innermost clickable span covering `offset`.
    pub fn clickable_at(&self, offset: usize) -> Option<&Span> {
        self.spans
            .iter()
            .filter(|s| s.annotation.is_clickable() && s.range.contains(&offset))
            .min_by_key(|s| s.range.len())
    }

    /// All clickable spans, in text order.
    pub fn link_regions(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(|s| s.annotation.is_clickable())
    }

    /// Flatten the spans into contiguous runs covering the whole text.
    pub fn runs(&self) -> Vec<Run<'_>> {
        if self.text.is_empty() {
            return Vec::new();
        }
        let mut cuts: Vec<usize> = Vec::with_capacity(self.spans.len() * 2 + 2);
        cuts.push(0);
        cuts.push(self.text.len());
        for span in &self.spans {
            cuts.push(span.range.start);
            cuts.push(span.range.end);
        }
        cuts.sort_unstable();
        cuts.dedup();

        cuts.windows(2)
            .map(|w| {
                let range = w[0]..w[1];
                let annotations = self
                    .spans
                    .iter()
                    .filter(|s| s.range.start <= range.start && range.end <= s.range.end)
                    .map(|s| &s.annotation)
                    .collect();
                Run {
                    text: &self.text[range.clone()],
                    range,
                    annotations,
                }
            })
            .collect()
    }

    /// Drop everything from `len` on. Spans are clamped to the new end and
    /// spans left empty are removed.
    ///
    /// `len` must lie on a char boundary.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.text.len() {
            return;
        }
        self.text.truncate(len);
        self.spans.retain_mut(|s| {
            s.range.end = s.range.end.min(len);
            s.range.start < s.range.end
        });
    }

    /// Pretty-printed JSON dump of the text and its spans.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Append-only buffer used while parsing.
#[derive(Debug, Default)]
pub struct StyledTextBuilder {
    text: String,
    spans: Vec<Span>,
}

impl StyledTextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    pub fn push_char(&mut self, c: char) {
        self.text.push(c);
    }

    /// Current length in bytes, usable as a span offset.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn last_char(&self) -> Option<char> {
        self.text.chars().next_back()
    }

    /// Number of consecutive `\n` at the end of the buffer.
    pub fn trailing_newlines(&self) -> usize {
        self.text.bytes().rev().take_while(|&b| b == b'\n').count()
    }

    /// Start a new line unless the buffer is empty or already at one.
    pub fn ensure_line_break(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }

    /// Make sure the buffer ends in at least `count` newlines. No-op on an
    /// empty buffer.
    pub fn ensure_newlines(&mut self, count: usize) {
        if self.text.is_empty() {
            return;
        }
        for _ in self.trailing_newlines()..count {
            self.text.push('\n');
        }
    }

    /// Remove trailing ASCII spaces and tabs that start at or after `floor`.
    /// Spans already added are clamped to the new end; spans left empty
    /// are removed.
    pub fn trim_trailing_spaces(&mut self, floor: usize) {
        let len = floor + self.text[floor..].trim_end_matches([' ', '\t']).len();
        if len == self.text.len() {
            return;
        }
        self.text.truncate(len);
        self.spans.retain_mut(|s| {
            s.range.end = s.range.end.min(len);
            s.range.start < s.range.end
        });
    }

    /// Attach `annotation` to `range`. Empty, out-of-bounds or
    /// mid-character ranges are ignored.
    pub fn add_span(&mut self, range: Range<usize>, annotation: Annotation) {
        if range.start >= range.end
            || range.end > self.text.len()
            || !self.text.is_char_boundary(range.start)
            || !self.text.is_char_boundary(range.end)
        {
            return;
        }
        self.spans.push(Span { range, annotation });
    }

    /// Attach `annotation` from `start` to the current end.
    pub fn close_span(&mut self, start: usize, annotation: Annotation) {
        let end = self.text.len();
        self.add_span(start..end, annotation);
    }

    pub fn finish(mut self) -> StyledText {
        // Outer spans before inner ones that start at the same offset.
        self.spans
            .sort_by(|a, b| a.range.start.cmp(&b.range.start).then(b.range.end.cmp(&a.range.end)));
        StyledText {
            text: self.text,
            spans: self.spans,
        }
    }
}
