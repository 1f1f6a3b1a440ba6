//! Streaming HTML tokenizer.
//!
//! A forgiving subset of the WHATWG tokenization rules, sized for the
//! markup found in help pages, release notes and chat messages: tags with
//! attributes, comments, DOCTYPE, character references, raw text
//! (`<script>`, `<style>`) and escapable raw text (`<title>`,
//! `<textarea>`).
//!
//! Tokens are pulled one at a time. Each token carries the byte range of
//! the source it came from, so callers can rewrite the markup in place.
//! Malformed input never panics: stray `<` becomes text, and a tag cut off
//! by the end of input is dropped.

use std::borrow::Cow;
use std::ops::Range;

use super::entities::lookup_entity;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

/// A single token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartTag(StartTag),
    EndTag(EndTag),
    /// Text with character references already decoded.
    Text(String),
    Comment(String),
    Doctype(String),
}

/// An opening tag. Names are ASCII-lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
}

impl StartTag {
    /// Value of the first attribute called `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// A closing tag. Any attributes it carried are discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct EndTag {
    pub name: String,
}

/// A `name="value"` pair. Valueless attributes have an empty value.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// A token together with the source bytes it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

/// How the contents of the element just opened are tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMode {
    /// No markup or character references until the matching end tag.
    Raw,
    /// No markup, but character references are decoded.
    Escapable,
}

fn text_mode_for(tag: &str) -> Option<TextMode> {
    match tag {
        "script" | "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(TextMode::Raw),
        "title" | "textarea" => Some(TextMode::Escapable),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Pull tokenizer over a borrowed string.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    /// Set after a raw-text start tag until its end tag is reached.
    pending: Option<(String, TextMode)>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            pending: None,
        }
    }

    /// The full input being tokenized.
    pub fn source(&self) -> &'a str {
        self.input
    }

    /// Next token and its source range, or `None` at end of input.
    pub fn next_spanned(&mut self) -> Option<Spanned> {
        loop {
            if self.pos >= self.input.len() {
                return None;
            }
            let start = self.pos;

            if let Some((name, mode)) = self.pending.take() {
                let end = find_end_tag(self.input, start, &name);
                if end > start {
                    self.pos = end;
                    let raw = &self.input[start..end];
                    let text = match mode {
                        TextMode::Raw => raw.to_string(),
                        TextMode::Escapable => decode_references(raw, false).into_owned(),
                    };
                    return Some(Spanned {
                        token: Token::Text(text),
                        span: start..end,
                    });
                }
                continue;
            }

            let rest = &self.input[start..];
            let token = if rest.starts_with('<') && starts_markup(rest) {
                match self.markup() {
                    Some(Some(token)) => token,
                    // Construct with no token (`</>`), keep going.
                    Some(None) => continue,
                    // Cut off by end of input.
                    None => {
                        self.pos = self.input.len();
                        return None;
                    },
                }
            } else {
                let end = next_markup(self.input, start);
                self.pos = end;
                Token::Text(decode_references(&self.input[start..end], false).into_owned())
            };

            if let Token::StartTag(tag) = &token
                && !tag.self_closing
                && let Some(mode) = text_mode_for(&tag.name)
            {
                self.pending = Some((tag.name.clone(), mode));
            }
            return Some(Spanned {
                token,
                span: start..self.pos,
            });
        }
    }

    /// Consume a markup construct starting at `<`.
    ///
    /// Returns `None` if the input ends inside it, `Some(None)` for
    /// constructs that produce nothing.
    fn markup(&mut self) -> Option<Option<Token>> {
        let rest = &self.input[self.pos..];

        if let Some(body) = rest.strip_prefix("<!--") {
            // `<!-->` and `<!--->` are complete (empty) comments.
            for abrupt in [">", "->"] {
                if body.starts_with(abrupt) {
                    self.pos += 4 + abrupt.len();
                    return Some(Some(Token::Comment(String::new())));
                }
            }
            let (text, consumed) = match body.find("-->") {
                Some(i) => (&body[..i], i + 3),
                None => (body, body.len()),
            };
            self.pos += 4 + consumed;
            return Some(Some(Token::Comment(text.to_string())));
        }

        if let Some(body) = rest.strip_prefix("<!").or_else(|| rest.strip_prefix("<?")) {
            let (text, consumed) = match body.find('>') {
                Some(i) => (&body[..i], i + 1),
                None => (body, body.len()),
            };
            self.pos += 2 + consumed;
            let is_doctype = text
                .get(..7)
                .is_some_and(|p| p.eq_ignore_ascii_case("doctype"));
            if rest.starts_with("<!") && is_doctype {
                let name = text[7..].trim().to_ascii_lowercase();
                return Some(Some(Token::Doctype(name)));
            }
            let kept = if rest.starts_with("<?") {
                format!("?{text}")
            } else {
                text.to_string()
            };
            return Some(Some(Token::Comment(kept)));
        }

        if let Some(body) = rest.strip_prefix("</") {
            if body.starts_with('>') {
                self.pos += 3;
                return Some(None);
            }
            if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
                // Bogus comment up to the next `>`.
                let (text, consumed) = match body.find('>') {
                    Some(i) => (&body[..i], i + 1),
                    None => (body, body.len()),
                };
                self.pos += 2 + consumed;
                return Some(Some(Token::Comment(text.to_string())));
            }
            let name_len = body
                .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
                .unwrap_or(body.len());
            let name = body[..name_len].to_ascii_lowercase();
            // Skip anything after the name, honouring quotes.
            let close = find_tag_close(body, name_len)?;
            self.pos += 2 + close + 1;
            return Some(Some(Token::EndTag(EndTag { name })));
        }

        self.start_tag().map(Some)
    }

    fn start_tag(&mut self) -> Option<Token> {
        let bytes = self.input.as_bytes();
        let mut i = self.pos + 1;
        let name_start = i;
        while i < bytes.len() && !is_tag_delim(bytes[i]) {
            i += 1;
        }
        let name = self.input[name_start..i].to_ascii_lowercase();
        let mut tag = StartTag {
            name,
            attributes: Vec::new(),
            self_closing: false,
        };

        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i)? {
                b'>' => {
                    i += 1;
                    break;
                },
                b'/' => {
                    i += 1;
                    if bytes.get(i) == Some(&b'>') {
                        tag.self_closing = true;
                        i += 1;
                        break;
                    }
                    continue;
                },
                _ => {},
            }

            // Attribute name. A leading `=` belongs to the name.
            let attr_start = i;
            i += 1;
            while i < bytes.len() && !is_tag_delim(bytes[i]) && bytes[i] != b'=' {
                i += 1;
            }
            let attr_name = self.input[attr_start..i].to_ascii_lowercase();

            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let mut value = String::new();
            if bytes.get(j) == Some(&b'=') {
                j += 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                match bytes.get(j)? {
                    q @ (b'"' | b'\'') => {
                        let open = j + 1;
                        let len = self.input[open..].find(*q as char)?;
                        value = decode_references(&self.input[open..open + len], true).into_owned();
                        j = open + len + 1;
                    },
                    _ => {
                        let open = j;
                        while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>'
                        {
                            j += 1;
                        }
                        value = decode_references(&self.input[open..j], true).into_owned();
                    },
                }
                i = j;
            }

            // First occurrence wins.
            if !tag.attributes.iter().any(|a| a.name == attr_name) {
                tag.attributes.push(Attribute {
                    name: attr_name,
                    value,
                });
            }
        }

        self.pos = i;
        Some(Token::StartTag(tag))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_spanned().map(|s| s.token)
    }
}

/// Tokenize a whole string.
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).collect()
}

// ---------------------------------------------------------------------------
// Scanning helpers
// ---------------------------------------------------------------------------

fn is_tag_delim(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

/// Whether `rest` (which starts with `<`) opens a markup construct rather
/// than being a literal less-than sign.
fn starts_markup(rest: &str) -> bool {
    match rest.as_bytes().get(1) {
        Some(b) if b.is_ascii_alphabetic() => true,
        Some(b'!' | b'?') => true,
        Some(b'/') => true,
        _ => false,
    }
}

/// Byte offset of the next `<` at or after `from` that opens markup.
fn next_markup(input: &str, from: usize) -> usize {
    let mut i = from;
    while let Some(off) = input.get(i..).and_then(|s| s.find('<')) {
        let at = i + off;
        if starts_markup(&input[at..]) {
            return at;
        }
        i = at + 1;
    }
    input.len()
}

/// Offset (within `body`) of the `>` closing a tag, skipping quoted values.
fn find_tag_close(body: &str, from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in body.as_bytes().iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {},
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {},
        }
    }
    None
}

/// Start of the `</name` that ends a raw-text element, or end of input.
fn find_end_tag(input: &str, from: usize, name: &str) -> usize {
    let bytes = input.as_bytes();
    let mut i = from;
    while let Some(off) = input.get(i..).and_then(|s| s.find("</")) {
        let at = i + off;
        let name_end = at + 2 + name.len();
        if let Some(candidate) = input.get(at + 2..name_end)
            && candidate.eq_ignore_ascii_case(name)
            && bytes.get(name_end).is_none_or(|&b| is_tag_delim(b))
        {
            return at;
        }
        i = at + 2;
    }
    input.len()
}

// ---------------------------------------------------------------------------
// Character references
// ---------------------------------------------------------------------------

/// Decode `&name;`, `&#123;` and `&#x7B;` references.
///
/// Unknown references are kept literally. Outside attributes a named
/// reference may omit its `;`. Invalid code points become U+FFFD.
pub fn decode_references(raw: &str, in_attribute: bool) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match decode_one(after, in_attribute) {
            Some((text, consumed)) => {
                out.push_str(&text);
                rest = &after[consumed..];
            },
            None => {
                out.push('&');
                rest = after;
            },
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Decode one reference following a `&`. Returns the text and the number
/// of bytes consumed after the `&`.
fn decode_one(after: &str, in_attribute: bool) -> Option<(Cow<'static, str>, usize)> {
    if let Some(num) = after.strip_prefix('#') {
        let (digits, radix, prefix) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 2),
            None => (num, 10, 1),
        };
        let len = digits
            .find(|c: char| !c.is_digit(radix))
            .unwrap_or(digits.len());
        if len == 0 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..len], radix).unwrap_or(u32::MAX);
        let ch = match code {
            0 => '\u{FFFD}',
            c => char::from_u32(c).unwrap_or('\u{FFFD}'),
        };
        let semi = usize::from(digits[len..].starts_with(';'));
        return Some((Cow::Owned(ch.to_string()), prefix + len + semi));
    }

    let len = after
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(after.len());
    if len == 0 {
        return None;
    }
    let name = &after[..len];
    let text = lookup_entity(name)?;
    if after[len..].starts_with(';') {
        return Some((Cow::Borrowed(text), len + 1));
    }
    if in_attribute {
        return None;
    }
    Some((Cow::Borrowed(text), len))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn start(name: &str, attrs: &[(&str, &str)]) -> Token {
        Token::StartTag(StartTag {
            name: name.to_string(),
            attributes: attrs
                .iter()
                .map(|(n, v)| Attribute {
                    name: n.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            self_closing: false,
        })
    }

    fn end(name: &str) -> Token {
        Token::EndTag(EndTag {
            name: name.to_string(),
        })
    }

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    #[test]
    fn plain_text() {
        assert_eq!(tokenize("hello world"), vec![text("hello world")]);
    }

    #[test]
    fn empty_input() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn simple_element() {
        assert_eq!(
            tokenize("<b>bold</b>"),
            vec![start("b", &[]), text("bold"), end("b")]
        );
    }

    #[test]
    fn attributes_quoted_and_unquoted() {
        let toks = tokenize(r#"<a href="x.html" title='T' data=raw hidden>"#);
        assert_eq!(
            toks,
            vec![start(
                "a",
                &[
                    ("href", "x.html"),
                    ("title", "T"),
                    ("data", "raw"),
                    ("hidden", "")
                ]
            )]
        );
    }

    #[test]
    fn names_are_lowercased() {
        let toks = tokenize(r#"<DIV CLASS="x"></Div>"#);
        assert_eq!(toks, vec![start("div", &[("class", "x")]), end("div")]);
    }

    #[test]
    fn duplicate_attribute_first_wins() {
        let toks = tokenize(r#"<img src="a" src="b">"#);
        assert_eq!(toks, vec![start("img", &[("src", "a")])]);
    }

    #[test]
    fn self_closing() {
        let toks = tokenize("<br/><br />");
        for tok in &toks {
            match tok {
                Token::StartTag(t) => {
                    assert_eq!(t.name, "br");
                    assert!(t.self_closing);
                },
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(toks.len(), 2);
    }

    #[test]
    fn spaces_around_equals() {
        let toks = tokenize(r#"<font color = "red">"#);
        assert_eq!(toks, vec![start("font", &[("color", "red")])]);
    }

    #[test]
    fn gt_inside_quoted_value() {
        let toks = tokenize(r#"<a title="a>b">x</a>"#);
        assert_eq!(
            toks,
            vec![start("a", &[("title", "a>b")]), text("x"), end("a")]
        );
    }

    #[test]
    fn stray_less_than_is_text() {
        assert_eq!(tokenize("a < b <3"), vec![text("a < b <3")]);
    }

    #[test]
    fn empty_end_tag_vanishes() {
        assert_eq!(tokenize("a</>b"), vec![text("a"), text("b")]);
    }

    #[test]
    fn unterminated_tag_dropped() {
        assert_eq!(tokenize("ok<b class=\"x"), vec![text("ok")]);
        assert_eq!(tokenize("ok<div"), vec![text("ok")]);
    }

    #[test]
    fn comments() {
        assert_eq!(
            tokenize("a<!-- note -->b"),
            vec![text("a"), Token::Comment(" note ".into()), text("b")]
        );
        assert_eq!(tokenize("<!-->x"), vec![Token::Comment(String::new()), text("x")]);
        assert_eq!(tokenize("<!-- open"), vec![Token::Comment(" open".into())]);
    }

    #[test]
    fn doctype_and_bogus_comments() {
        assert_eq!(
            tokenize("<!DOCTYPE html><?xml v?>"),
            vec![
                Token::Doctype("html".into()),
                Token::Comment("?xml v?".into())
            ]
        );
        assert_eq!(tokenize("</3>"), vec![Token::Comment("3".into())]);
    }

    #[test]
    fn script_is_raw() {
        let toks = tokenize("<script>if (a < b && c) { x = '<b>'; }</script>after");
        assert_eq!(
            toks,
            vec![
                start("script", &[]),
                text("if (a < b && c) { x = '<b>'; }"),
                end("script"),
                text("after"),
            ]
        );
    }

    #[test]
    fn style_end_tag_case_insensitive() {
        let toks = tokenize("<style>p{}</STYLE>");
        assert_eq!(toks, vec![start("style", &[]), text("p{}"), end("style")]);
    }

    #[test]
    fn raw_text_requires_full_name() {
        let toks = tokenize("<script>a</scripts>b</script>");
        assert_eq!(
            toks,
            vec![start("script", &[]), text("a</scripts>b"), end("script")]
        );
    }

    #[test]
    fn title_decodes_references() {
        let toks = tokenize("<title>A &amp; <b></title>");
        assert_eq!(toks, vec![start("title", &[]), text("A & <b>"), end("title")]);
    }

    #[test]
    fn named_references() {
        assert_eq!(tokenize("a &lt;b&gt; &copy;"), vec![text("a <b> \u{00A9}")]);
        assert_eq!(tokenize("&amp"), vec![text("&")]);
    }

    #[test]
    fn numeric_references() {
        assert_eq!(tokenize("&#65;&#x42;&#X43"), vec![text("ABC")]);
        assert_eq!(tokenize("&#0;"), vec![text("\u{FFFD}")]);
        assert_eq!(tokenize("&#xD800;"), vec![text("\u{FFFD}")]);
        assert_eq!(tokenize("&#99999999999;"), vec![text("\u{FFFD}")]);
    }

    #[test]
    fn unknown_and_bare_ampersands() {
        assert_eq!(tokenize("&bogus; & &#;"), vec![text("&bogus; & &#;")]);
    }

    #[test]
    fn attribute_reference_needs_semicolon() {
        let toks = tokenize(r#"<a href="?a=1&copy=2&amp;b">"#);
        assert_eq!(toks, vec![start("a", &[("href", "?a=1&copy=2&b")])]);
    }

    #[test]
    fn spans_cover_source() {
        let src = "<p>Hi <b>there</b></p>";
        let mut t = Tokenizer::new(src);
        let mut spans = Vec::new();
        while let Some(s) = t.next_spanned() {
            spans.push(s.span);
        }
        assert_eq!(spans.first().map(|r| r.start), Some(0));
        assert_eq!(spans.last().map(|r| r.end), Some(src.len()));
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(&src[spans[1].clone()], "Hi ");
    }

    #[test]
    fn multibyte_text() {
        assert_eq!(
            tokenize("<i>caf\u{00E9} \u{1F600}</i>"),
            vec![start("i", &[]), text("caf\u{00E9} \u{1F600}"), end("i")]
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_panics(s in ".{0,200}") {
                let _ = tokenize(&s);
            }

            #[test]
            fn spans_are_contiguous(s in "[a-z<>/!&;=\" -]{0,80}") {
                let mut t = Tokenizer::new(&s);
                let mut last = 0;
                while let Some(sp) = t.next_spanned() {
                    prop_assert!(sp.span.start >= last);
                    prop_assert!(sp.span.end <= s.len());
                    prop_assert!(sp.span.start < sp.span.end);
                    last = sp.span.end;
                }
            }

            #[test]
            fn text_without_markup_is_preserved(s in "[a-zA-Z0-9 .,]{1,60}") {
                prop_assert_eq!(tokenize(&s), vec![Token::Text(s.clone())]);
            }
        }
    }
}
