//! Base markup parser: tokens in, styled text out.
//!
//! Understands the classic rich-text subset (`b`, `i`, `font`, `a`,
//! `img`, headings, paragraphs, ...). Any other tag is offered to a
//! [`TagHandler`]. A tag nobody claims is dropped and its content kept.
//!
//! Elements are tracked on a stack. A close tag ends the most recent open
//! element with the same name and leaves the others open, so
//! `<b>x<i>y</b>z</i>` produces overlapping bold and italic ranges.

use htmltext_types::color::Color;

use crate::html::tokenizer::{Attribute, Token, Tokenizer};
use crate::resolve::ImageResolver;
use crate::styled::{Annotation, OBJECT_CHAR, StyledText, StyledTextBuilder};

/// Default bound on element nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

// ---------------------------------------------------------------------------
// Tag handler hook
// ---------------------------------------------------------------------------

/// A tag the base parser does not understand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagEvent<'a> {
    Open {
        name: &'a str,
        attributes: &'a [Attribute],
        self_closing: bool,
    },
    Close {
        name: &'a str,
    },
}

impl<'a> TagEvent<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            TagEvent::Open { name, .. } | TagEvent::Close { name } => name,
        }
    }

    /// Attribute value on an open tag.
    pub fn attr(&self, key: &str) -> Option<&'a str> {
        match self {
            TagEvent::Open { attributes, .. } => attributes
                .iter()
                .find(|a| a.name == key)
                .map(|a| a.value.as_str()),
            TagEvent::Close { .. } => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, TagEvent::Open { .. })
    }
}

/// Hook for tags outside the base vocabulary.
pub trait TagHandler {
    /// Handle an unknown tag. Return `true` if the tag was claimed.
    fn handle_tag(&mut self, tag: &TagEvent<'_>, out: &mut StyledTextBuilder) -> bool;

    /// Called before character data is appended. Return `false` to drop
    /// the text.
    fn before_text(&mut self, _text: &str, _out: &mut StyledTextBuilder) -> bool {
        true
    }

    /// Called once at end of input.
    fn finish(&mut self, _out: &mut StyledTextBuilder) {}
}

/// Claims nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTags;

impl TagHandler for NoTags {
    fn handle_tag(&mut self, _tag: &TagEvent<'_>, _out: &mut StyledTextBuilder) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Element table
// ---------------------------------------------------------------------------

/// Block behaviour of a base element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Inline,
    /// Paragraph break before and after.
    Paragraph,
}

/// Elements whose content is not displayed.
fn is_hidden(name: &str) -> bool {
    matches!(name, "script" | "style" | "head" | "title")
}

/// Elements that never have content or a close tag.
fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn heading_scale(name: &str) -> Option<f32> {
    let scale = match name {
        "h1" => 1.5,
        "h2" => 1.4,
        "h3" => 1.3,
        "h4" => 1.2,
        "h5" => 1.1,
        "h6" => 1.0,
        _ => return None,
    };
    Some(scale)
}

/// Block kind and annotations for a base container element, or `None`
/// when the element is outside the base vocabulary.
fn base_element(name: &str, attrs: &[Attribute]) -> Option<(Block, Vec<Annotation>)> {
    let attr = |key: &str| {
        attrs
            .iter()
            .find(|a| a.name == key)
            .map(|a| a.value.as_str())
    };

    if let Some(scale) = heading_scale(name) {
        return Some((
            Block::Paragraph,
            vec![Annotation::Bold, Annotation::RelativeSize { scale }],
        ));
    }

    let element = match name {
        "p" | "div" => (Block::Paragraph, Vec::new()),
        "blockquote" => (Block::Paragraph, vec![Annotation::Quote]),
        "b" | "strong" => (Block::Inline, vec![Annotation::Bold]),
        "i" | "em" | "cite" | "dfn" => (Block::Inline, vec![Annotation::Italic]),
        "u" => (Block::Inline, vec![Annotation::Underline]),
        "s" | "strike" | "del" => (Block::Inline, vec![Annotation::Strikethrough]),
        "tt" => (Block::Inline, vec![Annotation::Monospace]),
        "big" => (Block::Inline, vec![Annotation::RelativeSize { scale: 1.25 }]),
        "small" => (Block::Inline, vec![Annotation::RelativeSize { scale: 0.8 }]),
        "sup" => (Block::Inline, vec![Annotation::Superscript]),
        "sub" => (Block::Inline, vec![Annotation::Subscript]),
        "font" => {
            let mut anns = Vec::new();
            if let Some(color) = attr("color").and_then(Color::parse) {
                anns.push(Annotation::Color { color });
            }
            if let Some(face) = attr("face").filter(|f| !f.trim().is_empty()) {
                anns.push(Annotation::Typeface {
                    family: face.trim().to_string(),
                });
            }
            (Block::Inline, anns)
        },
        "a" => {
            let anns = attr("href")
                .map(|href| {
                    vec![Annotation::Link {
                        href: href.to_string(),
                    }]
                })
                .unwrap_or_default();
            (Block::Inline, anns)
        },
        _ => return None,
    };
    Some(element)
}

#[derive(Debug)]
struct OpenElement {
    name: String,
    start: usize,
    block: Block,
    annotations: Vec<Annotation>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'r> {
    out: StyledTextBuilder,
    stack: Vec<OpenElement>,
    /// Nesting level inside hidden elements.
    hidden: usize,
    images: &'r mut dyn ImageResolver,
    tags: &'r mut dyn TagHandler,
    max_depth: usize,
}

/// Parse `markup` into styled text.
///
/// `images` is asked for every `<img src>`. `tags` sees every tag outside
/// the base vocabulary. Nesting deeper than `max_depth` is flattened.
pub fn parse(
    markup: &str,
    images: &mut dyn ImageResolver,
    tags: &mut dyn TagHandler,
    max_depth: usize,
) -> StyledText {
    let mut parser = Parser {
        out: StyledTextBuilder::new(),
        stack: Vec::new(),
        hidden: 0,
        images,
        tags,
        max_depth,
    };
    for token in Tokenizer::new(markup) {
        parser.token(token);
    }
    parser.finish()
}

impl Parser<'_> {
    fn token(&mut self, token: Token) {
        match token {
            Token::StartTag(tag) => {
                self.open(&tag.name, &tag.attributes, tag.self_closing);
            },
            Token::EndTag(tag) => self.close(&tag.name),
            Token::Text(text) => self.text(&text),
            Token::Comment(_) | Token::Doctype(_) => {},
        }
    }

    fn open(&mut self, name: &str, attrs: &[Attribute], self_closing: bool) {
        if is_hidden(name) {
            if !self_closing {
                self.hidden += 1;
            }
            return;
        }
        if self.hidden > 0 {
            return;
        }

        match name {
            "br" => {
                self.out.push_char('\n');
                return;
            },
            "img" => {
                self.image(attrs);
                return;
            },
            _ => {},
        }

        let Some((block, annotations)) = base_element(name, attrs) else {
            let event = TagEvent::Open {
                name,
                attributes: attrs,
                self_closing,
            };
            if !self.tags.handle_tag(&event, &mut self.out) {
                log::trace!("dropping unknown tag <{name}>");
            }
            return;
        };

        if block == Block::Paragraph {
            self.out.ensure_newlines(2);
        }
        if self_closing || is_void(name) {
            return;
        }
        if self.stack.len() >= self.max_depth {
            log::debug!("nesting deeper than {} at <{name}>, flattening", self.max_depth);
            return;
        }
        self.stack.push(OpenElement {
            name: name.to_string(),
            start: self.out.len(),
            block,
            annotations,
        });
    }

    fn close(&mut self, name: &str) {
        if is_hidden(name) {
            self.hidden = self.hidden.saturating_sub(1);
            return;
        }
        if self.hidden > 0 {
            return;
        }
        if base_element(name, &[]).is_none() {
            let event = TagEvent::Close { name };
            self.tags.handle_tag(&event, &mut self.out);
            return;
        }

        match self.stack.iter().rposition(|e| e.name == name) {
            Some(idx) => {
                let element = self.stack.remove(idx);
                self.end_element(element);
            },
            None => log::trace!("ignoring unmatched </{name}>"),
        }
    }

    fn end_element(&mut self, element: OpenElement) {
        for annotation in element.annotations {
            self.out.close_span(element.start, annotation);
        }
        if element.block == Block::Paragraph {
            self.out.ensure_newlines(2);
        }
    }

    fn image(&mut self, attrs: &[Attribute]) {
        let Some(src) = attrs
            .iter()
            .find(|a| a.name == "src")
            .map(|a| a.value.trim())
            .filter(|s| !s.is_empty())
        else {
            return;
        };
        let artifact = self.images.resolve(src);
        let start = self.out.len();
        self.out.push_char(OBJECT_CHAR);
        self.out.close_span(start, Annotation::Image { artifact });
    }

    fn text(&mut self, text: &str) {
        if self.hidden > 0 {
            return;
        }
        if !self.tags.before_text(text, &mut self.out) {
            return;
        }
        push_collapsed(&mut self.out, text);
    }

    fn finish(mut self) -> StyledText {
        self.tags.finish(&mut self.out);
        while let Some(element) = self.stack.pop() {
            log::trace!("closing <{}> at end of input", element.name);
            self.end_element(element);
        }
        self.out.finish()
    }
}

/// Append character data, collapsing whitespace.
///
/// A whitespace run is dropped at the start of output or after existing
/// whitespace. Otherwise a run containing newlines keeps exactly those
/// newlines and any other run becomes one space.
pub(crate) fn push_collapsed(out: &mut StyledTextBuilder, text: &str) {
    let mut rest = text;
    while !rest.is_empty() {
        let ws_len = rest
            .find(|c: char| !c.is_ascii_whitespace())
            .unwrap_or(rest.len());
        if ws_len > 0 {
            let run = &rest[..ws_len];
            let at_break = out.last_char().is_none_or(|c| c.is_ascii_whitespace());
            if !at_break {
                let newlines = run.bytes().filter(|&b| b == b'\n').count();
                if newlines == 0 {
                    out.push_char(' ');
                }
                for _ in 0..newlines {
                    out.push_char('\n');
                }
            }
            rest = &rest[ws_len..];
            continue;
        }
        let word_len = rest
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(rest.len());
        out.push_str(&rest[..word_len]);
        rest = &rest[word_len..];
    }
}
