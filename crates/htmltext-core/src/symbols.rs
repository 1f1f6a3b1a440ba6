//! Symbolic-text pre-pass: ASCII emoticons to inline image tags.
//!
//! Runs over raw markup before parsing. Only text nodes are rewritten;
//! tags, attribute values, comments and the bodies of raw-text elements
//! (`script`, `style`, `title`, `textarea`) pass through byte for byte.
//! An emoticon must stand alone: preceded by the start of the text node
//! or whitespace, and followed by the end of the text node, whitespace or
//! one of `.,!?`.

use std::borrow::Cow;

use crate::html::tokenizer::{Token, Tokenizer};

/// Emoticon to bundled image name. Longer forms come first so `:-)` wins
/// over `:)` where both could match.
pub const EMOTICONS: &[(&str, &str)] = &[
    (":'(", "emoji_cry"),
    (":-)", "emoji_smile"),
    (":-(", "emoji_sad"),
    (";-)", "emoji_wink"),
    (":-D", "emoji_grin"),
    (":-P", "emoji_tongue"),
    (":-p", "emoji_tongue"),
    (":)", "emoji_smile"),
    (":(", "emoji_sad"),
    (";)", "emoji_wink"),
    (":D", "emoji_grin"),
    (":P", "emoji_tongue"),
    (":p", "emoji_tongue"),
    (":o", "emoji_surprised"),
    (":O", "emoji_surprised"),
    ("<3", "emoji_heart"),
];

fn is_raw_element(name: &str) -> bool {
    matches!(
        name,
        "script" | "style" | "title" | "textarea" | "xmp" | "iframe" | "noembed" | "noframes"
    )
}

/// Replace standalone emoticons in text nodes with `<img src="emoji_*">`.
///
/// Returns the input unchanged (borrowed) when nothing matched.
pub fn substitute(markup: &str) -> Cow<'_, str> {
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut in_raw = false;
    let mut tokens = Tokenizer::new(markup);

    while let Some(spanned) = tokens.next_spanned() {
        match &spanned.token {
            Token::StartTag(tag) => {
                in_raw = !tag.self_closing && is_raw_element(&tag.name);
            },
            Token::EndTag(_) => in_raw = false,
            Token::Text(_) if !in_raw => {
                let raw = &markup[spanned.span.clone()];
                if let Cow::Owned(replaced) = substitute_text(raw) {
                    let buf = out.get_or_insert_with(|| String::with_capacity(markup.len() + 64));
                    buf.push_str(&markup[copied..spanned.span.start]);
                    buf.push_str(&replaced);
                    copied = spanned.span.end;
                }
            },
            _ => {},
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&markup[copied..]);
            Cow::Owned(buf)
        },
        None => Cow::Borrowed(markup),
    }
}

/// Substitute inside one raw text node.
fn substitute_text(text: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut copied = 0;
    let mut i = 0;
    let bytes = text.as_bytes();

    while i < bytes.len() {
        let preceded_ok = i == 0 || bytes[i - 1].is_ascii_whitespace();
        let matched = preceded_ok
            .then(|| {
                EMOTICONS.iter().find(|(face, _)| {
                    text[i..].starts_with(face) && stands_alone(bytes.get(i + face.len()))
                })
            })
            .flatten();
        match matched {
            Some((face, image)) => {
                out.push_str(&text[copied..i]);
                out.push_str(&format!("<img src=\"{image}\">"));
                i += face.len();
                copied = i;
            },
            None => {
                // Advance by whole chars to stay on boundaries.
                i += text[i..].chars().next().map_or(1, char::len_utf8);
            },
        }
    }

    if copied == 0 {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

fn stands_alone(next: Option<&u8>) -> bool {
    match next {
        None => true,
        Some(b) => b.is_ascii_whitespace() || matches!(b, b'.' | b',' | b'!' | b'?'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_standalone_face() {
        assert_eq!(substitute("hi :)"), "hi <img src=\"emoji_smile\">");
        assert_eq!(substitute(":-D!"), "<img src=\"emoji_grin\">!");
    }

    #[test]
    fn multiple_faces() {
        assert_eq!(
            substitute("a ;) b :( c"),
            "a <img src=\"emoji_wink\"> b <img src=\"emoji_sad\"> c"
        );
    }

    #[test]
    fn heart_in_text() {
        assert_eq!(substitute("I <3 Rust"), "I <img src=\"emoji_heart\"> Rust");
    }

    #[test]
    fn face_at_text_node_edges() {
        assert_eq!(
            substitute("<b>:)</b>"),
            "<b><img src=\"emoji_smile\"></b>"
        );
        assert_eq!(
            substitute("<p>ok :P</p>"),
            "<p>ok <img src=\"emoji_tongue\"></p>"
        );
    }

    #[test]
    fn embedded_faces_untouched() {
        for s in ["http://x", "a:)", ":)b", "12:30", "f(a:b)", "<3x"] {
            assert_eq!(substitute(s), s);
        }
    }

    #[test]
    fn tags_and_attributes_untouched() {
        let markup = r#"<a title=":) :(" href="x">link</a>"#;
        assert_eq!(substitute(markup), markup);
    }

    #[test]
    fn raw_elements_untouched() {
        let markup = "<script>if (a <3) { f(':)'); }</script><style>a:hover{}</style>";
        assert_eq!(substitute(markup), markup);
    }

    #[test]
    fn comments_untouched() {
        let markup = "<!-- :) -->";
        assert_eq!(substitute(markup), markup);
    }

    #[test]
    fn text_after_raw_element_substituted() {
        assert_eq!(
            substitute("<script>x</script> :)"),
            "<script>x</script> <img src=\"emoji_smile\">"
        );
    }

    #[test]
    fn borrowed_when_unchanged() {
        assert!(matches!(substitute("plain <b>text</b>"), Cow::Borrowed(_)));
    }

    #[test]
    fn longest_form_preferred() {
        assert_eq!(substitute(":-)"), "<img src=\"emoji_smile\">");
        assert_eq!(substitute(":'("), "<img src=\"emoji_cry\">");
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(
            substitute("caf\u{00E9} :) \u{1F600}"),
            "caf\u{00E9} <img src=\"emoji_smile\"> \u{1F600}"
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn no_faces_means_identity(s in "[a-zA-Z0-9 <>/=\"]{0,80}") {
                prop_assume!(!s.contains("<3"));
                prop_assert_eq!(substitute(&s), s.as_str());
            }

            #[test]
            fn never_panics(s in ".{0,120}") {
                let _ = substitute(&s);
            }
        }
    }
}
