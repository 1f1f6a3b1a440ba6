//! Extended tags: tables, internal links, lists, `code` and `center`.
//!
//! [`ExtendedTagHandler`] plugs into the base parser as its
//! [`TagHandler`]. Table and internal-link tags are only claimed when the
//! matching handler is configured; otherwise they fall through and their
//! content is kept as plain text.
//!
//! Tables and internal links live on a frame stack scoped to one parse.
//! A close tag that does not match the top frame is ignored. Frames left
//! open at the end of input are dropped without an annotation.

use std::fmt;

use crate::markup::{DEFAULT_MAX_DEPTH, TagEvent, TagHandler};
use crate::styled::{Alignment, Annotation, LinkStyle, StyledTextBuilder};

/// Separator placed between the cells of a row.
pub const CELL_SEPARATOR: &str = " | ";

/// Tag name for links into the host application.
pub const INTERNAL_LINK_TAG: &str = "internal-link";

// ---------------------------------------------------------------------------
// Handler traits
// ---------------------------------------------------------------------------

/// Receives clicks on rendered tables.
pub trait TableHandler {
    /// Called with the table's reconstructed markup.
    fn on_table_click(&self, html: &str);
}

/// Styles and receives clicks on internal links.
pub trait LinkHandler {
    fn style(&self) -> LinkStyle {
        LinkStyle::default()
    }

    fn on_link_click(&self, target: &str);
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TableFrame {
    start: usize,
    rows: usize,
    column: usize,
    cell: Option<OpenCell>,
}

#[derive(Debug, Clone, Copy)]
struct OpenCell {
    start: usize,
    header: bool,
}

#[derive(Debug)]
enum Frame {
    Table(TableFrame),
    Link { target: String, start: usize },
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Table(t) => write!(f, "<table> at {}", t.start),
            Frame::Link { target, start } => write!(f, "<{INTERNAL_LINK_TAG} {target}> at {start}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum List {
    Unordered,
    Ordered { next: usize },
}

#[derive(Debug)]
struct Item {
    start: usize,
    depth: usize,
    bullet: bool,
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Tag interceptor for one parse.
pub struct ExtendedTagHandler<'h> {
    tables: Option<&'h dyn TableHandler>,
    links: Option<&'h dyn LinkHandler>,
    max_depth: usize,
    frames: Vec<Frame>,
    /// Markup of the outermost open table, rebuilt as it is parsed.
    table_html: String,
    /// A line break is owed after a closed table.
    pending_break: bool,
    lists: Vec<List>,
    items: Vec<Item>,
    /// Open `code` / `center` elements.
    inline: Vec<(&'static str, usize)>,
}

impl<'h> ExtendedTagHandler<'h> {
    pub fn new(tables: Option<&'h dyn TableHandler>, links: Option<&'h dyn LinkHandler>) -> Self {
        Self {
            tables,
            links,
            max_depth: DEFAULT_MAX_DEPTH,
            frames: Vec::new(),
            table_html: String::new(),
            pending_break: false,
            lists: Vec::new(),
            items: Vec::new(),
            inline: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn in_table(&self) -> bool {
        self.frames.iter().any(|f| matches!(f, Frame::Table(_)))
    }

    fn top_table(&mut self) -> Option<&mut TableFrame> {
        match self.frames.last_mut() {
            Some(Frame::Table(t)) => Some(t),
            _ => None,
        }
    }

    fn record_html(&mut self, fragment: &str) {
        if self.in_table() {
            self.table_html.push_str(fragment);
        }
    }

    // -- Tables --

    fn table_tag(&mut self, tag: &TagEvent<'_>, out: &mut StyledTextBuilder) -> bool {
        let name = tag.name();
        match (name, tag.is_open()) {
            ("table", true) => {
                if self.frames.len() >= self.max_depth {
                    log::debug!("table nesting deeper than {}, flattening", self.max_depth);
                    return false;
                }
                if !self.in_table() {
                    self.table_html.clear();
                    out.ensure_line_break();
                }
                self.frames.push(Frame::Table(TableFrame {
                    start: out.len(),
                    rows: 0,
                    column: 0,
                    cell: None,
                }));
                self.record_html("<table>");
                true
            },
            ("table", false) => {
                let Some(table) = self.top_table() else {
                    log::trace!("ignoring </table> outside its frame");
                    return self.in_table();
                };
                close_cell(table, out);
                let start = table.start;
                self.record_html("</table>");
                self.frames.pop();
                if !self.in_table() {
                    let html = std::mem::take(&mut self.table_html);
                    out.close_span(start, Annotation::Table { html });
                    self.pending_break = true;
                }
                true
            },
            ("tr", true) => {
                let Some(table) = self.top_table() else {
                    return false;
                };
                close_cell(table, out);
                if table.rows > 0 {
                    out.push_char('\n');
                }
                table.rows += 1;
                table.column = 0;
                self.record_html("<tr>");
                true
            },
            ("tr", false) => {
                let Some(table) = self.top_table() else {
                    return false;
                };
                close_cell(table, out);
                self.record_html("</tr>");
                true
            },
            ("td" | "th", true) => {
                let Some(table) = self.top_table() else {
                    return false;
                };
                close_cell(table, out);
                if table.rows == 0 {
                    table.rows = 1;
                }
                if table.column > 0 {
                    out.push_str(CELL_SEPARATOR);
                }
                let header = name == "th";
                table.cell = Some(OpenCell {
                    start: out.len(),
                    header,
                });
                self.record_html(if header { "<th>" } else { "<td>" });
                true
            },
            ("td" | "th", false) => {
                let Some(table) = self.top_table() else {
                    return false;
                };
                close_cell(table, out);
                self.record_html(if name == "th" { "</th>" } else { "</td>" });
                true
            },
            // Structural wrappers carry no text of their own.
            ("thead" | "tbody" | "tfoot" | "colgroup" | "col" | "caption", _) => {
                self.top_table().is_some()
            },
            _ => false,
        }
    }

    // -- Internal links --

    fn link_tag(&mut self, tag: &TagEvent<'_>, out: &mut StyledTextBuilder) -> bool {
        let Some(links) = self.links else {
            return false;
        };
        match tag {
            TagEvent::Open { self_closing, .. } => {
                let Some(target) = tag
                    .attr("target")
                    .or_else(|| tag.attr("href"))
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                else {
                    log::debug!("<{INTERNAL_LINK_TAG}> without a target");
                    return false;
                };
                if *self_closing {
                    return true;
                }
                if self.frames.len() >= self.max_depth {
                    log::debug!("link nesting deeper than {}, flattening", self.max_depth);
                    return false;
                }
                self.frames.push(Frame::Link {
                    target: target.to_string(),
                    start: out.len(),
                });
                true
            },
            TagEvent::Close { .. } => {
                if !matches!(self.frames.last(), Some(Frame::Link { .. })) {
                    log::trace!("ignoring </{INTERNAL_LINK_TAG}> outside its frame");
                    return true;
                }
                if let Some(Frame::Link { target, start }) = self.frames.pop() {
                    out.close_span(
                        start,
                        Annotation::InternalLink {
                            target,
                            style: links.style(),
                        },
                    );
                }
                true
            },
        }
    }

    // -- Lists --

    fn list_tag(&mut self, tag: &TagEvent<'_>, out: &mut StyledTextBuilder) {
        let name = tag.name();
        match (name, tag.is_open()) {
            ("ul" | "ol", true) => {
                out.ensure_line_break();
                if self.lists.len() < self.max_depth {
                    self.lists.push(if name == "ol" {
                        List::Ordered { next: 1 }
                    } else {
                        List::Unordered
                    });
                }
            },
            ("ul" | "ol", false) => {
                self.lists.pop();
                out.ensure_line_break();
            },
            ("li", true) => {
                out.ensure_line_break();
                if self.items.len() >= self.max_depth {
                    return;
                }
                let depth = self.lists.len().max(1);
                let start = out.len();
                let bullet = match self.lists.last_mut() {
                    Some(List::Ordered { next }) => {
                        out.push_str(&format!("{next}. "));
                        *next += 1;
                        false
                    },
                    _ => true,
                };
                self.items.push(Item {
                    start,
                    depth,
                    bullet,
                });
            },
            ("li", false) => {
                if let Some(item) = self.items.pop() {
                    let end = out.len();
                    out.add_span(item.start..end, Annotation::Indent { depth: item.depth });
                    if item.bullet {
                        out.add_span(item.start..end, Annotation::Bullet { depth: item.depth });
                    }
                }
                out.ensure_line_break();
            },
            _ => {},
        }
    }

    // -- code / center --

    fn inline_tag(&mut self, tag: &TagEvent<'_>, out: &mut StyledTextBuilder) {
        let name: &'static str = match tag.name() {
            "code" => "code",
            _ => "center",
        };
        if tag.is_open() {
            if name == "center" {
                out.ensure_line_break();
            }
            if self.inline.len() < self.max_depth {
                self.inline.push((name, out.len()));
            }
            return;
        }
        let Some(idx) = self.inline.iter().rposition(|(n, _)| *n == name) else {
            return;
        };
        let (_, start) = self.inline.remove(idx);
        let annotation = match name {
            "code" => Annotation::Monospace,
            _ => Annotation::Align {
                alignment: Alignment::Center,
            },
        };
        out.close_span(start, annotation);
        if name == "center" {
            out.ensure_line_break();
        }
    }
}

/// Close the open cell of `table`, if any.
fn close_cell(table: &mut TableFrame, out: &mut StyledTextBuilder) {
    let Some(cell) = table.cell.take() else {
        return;
    };
    out.trim_trailing_spaces(cell.start);
    out.close_span(
        cell.start,
        Annotation::TableCell {
            row: table.rows.saturating_sub(1),
            column: table.column,
            header: cell.header,
        },
    );
    table.column += 1;
}

impl TagHandler for ExtendedTagHandler<'_> {
    fn handle_tag(&mut self, tag: &TagEvent<'_>, out: &mut StyledTextBuilder) -> bool {
        match tag.name() {
            "table" | "tr" | "td" | "th" | "thead" | "tbody" | "tfoot" | "colgroup" | "col"
            | "caption" => self.tables.is_some() && self.table_tag(tag, out),
            INTERNAL_LINK_TAG => self.link_tag(tag, out),
            "ul" | "ol" | "li" => {
                self.list_tag(tag, out);
                true
            },
            "code" | "center" => {
                self.inline_tag(tag, out);
                true
            },
            _ => false,
        }
    }

    fn before_text(&mut self, text: &str, out: &mut StyledTextBuilder) -> bool {
        let blank = text.chars().all(|c| c.is_ascii_whitespace());
        if self.pending_break && !blank {
            out.ensure_line_break();
            self.pending_break = false;
        }
        if let Some(table) = self.top_table()
            && table.cell.is_none()
            && blank
        {
            return false;
        }
        if self.in_table() {
            self.table_html.push_str(&escape_html(text));
        }
        true
    }

    fn finish(&mut self, _out: &mut StyledTextBuilder) {
        for frame in self.frames.drain(..).rev() {
            log::debug!("dropping unclosed {frame}");
        }
        if !self.items.is_empty() || !self.inline.is_empty() {
            log::debug!(
                "dropping {} unclosed list item(s) and {} unclosed code/center element(s)",
                self.items.len(),
                self.inline.len()
            );
        }
        self.table_html.clear();
        self.lists.clear();
        self.items.clear();
        self.inline.clear();
    }
}

/// Escape text for inclusion in reconstructed table markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{NoTags, parse};
    use crate::styled::StyledText;
    use crate::test_utils::{CountingResolver, RecordingLinkHandler, RecordingTableHandler, annotated_text};
    use htmltext_types::color::Color;

    fn convert(
        markup: &str,
        tables: Option<&dyn TableHandler>,
        links: Option<&dyn LinkHandler>,
    ) -> StyledText {
        let mut images = CountingResolver::default();
        let mut handler = ExtendedTagHandler::new(tables, links);
        parse(markup, &mut images, &mut handler, DEFAULT_MAX_DEPTH)
    }

    fn tables_only(markup: &str) -> StyledText {
        let th = RecordingTableHandler::default();
        convert(markup, Some(&th), None)
    }

    fn table_regions(st: &StyledText) -> Vec<(std::ops::Range<usize>, String)> {
        st.spans()
            .iter()
            .filter_map(|s| match &s.annotation {
                Annotation::Table { html } => Some((s.range.clone(), html.clone())),
                _ => None,
            })
            .collect()
    }

    // -- Tables --

    #[test]
    fn single_cell_table() {
        let st = tables_only("<table><tr><td>A</td></tr></table>");
        assert_eq!(st.text(), "A");
        let regions = table_regions(&st);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].0, 0..1);
        assert_eq!(regions[0].1, "<table><tr><td>A</td></tr></table>");
    }

    #[test]
    fn rows_and_cells() {
        let st = tables_only(
            "<table>\n  <tr><th>Name</th><th>Qty</th></tr>\n  <tr><td>Apple </td><td> 3</td></tr>\n</table>",
        );
        assert_eq!(st.text(), "Name | Qty\nApple | 3");
        let cells: Vec<(usize, usize, bool)> = st
            .spans()
            .iter()
            .filter_map(|s| match s.annotation {
                Annotation::TableCell { row, column, header } => Some((row, column, header)),
                _ => None,
            })
            .collect();
        assert_eq!(
            cells,
            vec![(0, 0, true), (0, 1, true), (1, 0, false), (1, 1, false)]
        );
        assert_eq!(
            annotated_text(&st, |a| matches!(a, Annotation::TableCell { row: 1, column: 0, .. })),
            vec!["Apple"]
        );
        assert_eq!(table_regions(&st)[0].0, 0..st.len());
    }

    #[test]
    fn table_html_escapes_text() {
        let st = tables_only("<table><tr><td>a &lt; b</td></tr></table>");
        assert_eq!(st.text(), "a < b");
        assert_eq!(
            table_regions(&st)[0].1,
            "<table><tr><td>a &lt; b</td></tr></table>"
        );
    }

    #[test]
    fn table_line_breaks_around() {
        let st = tables_only("before<table><tr><td>x</td></tr></table>after");
        assert_eq!(st.text(), "before\nx\nafter");
        assert_eq!(table_regions(&st)[0].0, 7..8);
    }

    #[test]
    fn cell_trim_clamps_inner_spans() {
        let st = tables_only("<table><tr><td><b>x </b></td></tr></table>");
        assert_eq!(st.text(), "x");
        assert!(st.spans().iter().all(|s| s.range == (0..1)));
        let runs = st.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "x");
    }

    #[test]
    fn link_in_cell_stays_inside_cell() {
        let st = tables_only(r#"<table><tr><td><a href="u">x </a></td><td>y</td></tr></table>"#);
        assert_eq!(st.text(), "x | y");
        assert_eq!(
            annotated_text(&st, |a| matches!(a, Annotation::Link { .. })),
            vec!["x"]
        );
    }

    #[test]
    fn cells_without_rows() {
        let st = tables_only("<table><td>a</td><td>b</td></table>");
        assert_eq!(st.text(), "a | b");
    }

    #[test]
    fn unclosed_cells_are_closed_by_next() {
        let st = tables_only("<table><tr><td>a<td>b<tr><td>c</table>");
        assert_eq!(st.text(), "a | b\nc");
        assert_eq!(table_regions(&st).len(), 1);
    }

    #[test]
    fn nested_table_single_region() {
        let st = tables_only(
            "<table><tr><td><table><tr><td>in</td></tr></table></td></tr></table>",
        );
        let regions = table_regions(&st);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].1.matches("<table>").count() == 2);
        assert!(st.text().contains("in"));
    }

    #[test]
    fn table_without_handler_is_plain() {
        let st = convert("<table><tr><td>A</td><td>B</td></tr></table>", None, None);
        assert_eq!(st.text(), "AB");
        assert!(table_regions(&st).is_empty());
        assert!(st.spans().is_empty());
    }

    #[test]
    fn stray_table_close_ignored() {
        let st = tables_only("a</table>b</td>c");
        assert_eq!(st.text(), "abc");
        assert!(st.spans().is_empty());
    }

    #[test]
    fn unclosed_table_dropped() {
        let st = tables_only("<table><tr><td>A</td>");
        assert_eq!(st.text(), "A");
        assert!(table_regions(&st).is_empty());
    }

    // -- Internal links --

    #[test]
    fn internal_link_region() {
        let lh = RecordingLinkHandler::with_style(LinkStyle {
            color: Some(Color::rgb(0, 0, 255)),
            underline: false,
            text_size: Some(1.2),
        });
        let st = convert(
            r#"Go to <internal-link target="settings">Settings</internal-link> now"#,
            None,
            Some(&lh),
        );
        assert_eq!(st.text(), "Go to Settings now");
        let span = st.link_regions().next().unwrap();
        assert_eq!(&st.text()[span.range.clone()], "Settings");
        match &span.annotation {
            Annotation::InternalLink { target, style } => {
                assert_eq!(target, "settings");
                assert!(!style.underline);
                assert_eq!(style.color, Some(Color::rgb(0, 0, 255)));
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn internal_link_href_fallback() {
        let lh = RecordingLinkHandler::default();
        let st = convert(r#"<internal-link href="about">A</internal-link>"#, None, Some(&lh));
        assert!(matches!(
            &st.spans()[0].annotation,
            Annotation::InternalLink { target, .. } if target == "about"
        ));
    }

    #[test]
    fn internal_link_without_handler_is_plain() {
        let st = convert(r#"<internal-link target="x">text</internal-link>"#, None, None);
        assert_eq!(st.text(), "text");
        assert!(st.spans().is_empty());
    }

    #[test]
    fn internal_link_without_target_is_plain() {
        let lh = RecordingLinkHandler::default();
        let st = convert("<internal-link>text</internal-link>", None, Some(&lh));
        assert_eq!(st.text(), "text");
        assert!(st.spans().is_empty());
    }

    #[test]
    fn crossing_close_ignored() {
        let th = RecordingTableHandler::default();
        let lh = RecordingLinkHandler::default();
        let st = convert(
            r#"<table><tr><td><internal-link target="t">x</td></tr></table></internal-link>"#,
            Some(&th),
            Some(&lh),
        );
        assert_eq!(st.text(), "x");
        // </table> did not match the link frame; the link then closed,
        // leaving the table open at end of input.
        assert!(table_regions(&st).is_empty());
        assert_eq!(st.link_regions().count(), 1);
    }

    #[test]
    fn unclosed_link_dropped() {
        let lh = RecordingLinkHandler::default();
        let st = convert(r#"<internal-link target="t">dangling"#, None, Some(&lh));
        assert_eq!(st.text(), "dangling");
        assert!(st.spans().is_empty());
    }

    #[test]
    fn frame_depth_bounded() {
        let lh = RecordingLinkHandler::default();
        let markup = format!(
            "{}x{}",
            r#"<internal-link target="t">"#.repeat(5),
            "</internal-link>".repeat(5)
        );
        let mut images = CountingResolver::default();
        let mut handler = ExtendedTagHandler::new(None, Some(&lh)).with_max_depth(2);
        let st = parse(&markup, &mut images, &mut handler, DEFAULT_MAX_DEPTH);
        assert_eq!(st.text(), "x");
        assert_eq!(st.link_regions().count(), 2);
    }

    // -- Lists, code, center --

    #[test]
    fn unordered_list() {
        let st = convert("<ul><li>one</li><li>two</li></ul>", None, None);
        assert_eq!(st.text(), "one\ntwo\n");
        assert_eq!(
            annotated_text(&st, |a| matches!(a, Annotation::Bullet { depth: 1 })),
            vec!["one", "two"]
        );
    }

    #[test]
    fn ordered_list_numbers() {
        let st = convert("intro<ol><li>a</li><li>b</li></ol>", None, None);
        assert_eq!(st.text(), "intro\n1. a\n2. b\n");
        assert!(
            !st.spans()
                .iter()
                .any(|s| matches!(s.annotation, Annotation::Bullet { .. }))
        );
    }

    #[test]
    fn nested_list_depth() {
        let st = convert("<ul><li>a<ul><li>b</li></ul></li></ul>", None, None);
        assert_eq!(
            annotated_text(&st, |a| matches!(a, Annotation::Indent { depth: 2 })),
            vec!["b"]
        );
    }

    #[test]
    fn code_and_center() {
        let st = convert("run <code>ls -l</code><center>mid</center>", None, None);
        assert_eq!(st.text(), "run ls -l\nmid\n");
        assert_eq!(
            annotated_text(&st, |a| *a == Annotation::Monospace),
            vec!["ls -l"]
        );
        assert_eq!(
            annotated_text(&st, |a| matches!(a, Annotation::Align { alignment: Alignment::Center })),
            vec!["mid"]
        );
    }

    #[test]
    fn no_extended_tags_matches_base() {
        let markup = "<p>Hello <b>bold</b> <a href=\"u\">link</a></p><br>tail\n\n";
        let mut images = CountingResolver::default();
        let base = parse(markup, &mut images, &mut NoTags, DEFAULT_MAX_DEPTH);
        let th = RecordingTableHandler::default();
        let lh = RecordingLinkHandler::default();
        assert_eq!(convert(markup, Some(&th), Some(&lh)), base);
    }

    #[test]
    fn escape() {
        assert_eq!(escape_html(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }
}
