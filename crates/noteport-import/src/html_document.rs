//! HTML to normalized document conversion.
//!
//! The DOM is walked directly. Unknown containers are transparent, so a
//! `<div>` or table cell contributes its children to the surrounding flow.
//! All parsing happens in synchronous functions; parsed trees never cross an
//! `.await`.

use scraper::{ElementRef, Html, Node};

use noteport_core::defaults::FALLBACK_NOTE_TITLE;
use noteport_core::{
    Block, Document, HeadingAttrs, ImportMetadata, Inline, LinkAttrs, ListItem, Mark,
    OrderedListAttrs, TaskItem, TaskItemAttrs,
};

use crate::metadata;

/// The parts of an HTML page the markup converters need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlPage {
    /// Text of the first non-empty `<h1>`.
    pub h1: Option<String>,
    /// Text of a non-empty `<title>`.
    pub title: Option<String>,
    /// Text of the first non-empty `<p>` or `<div>`.
    pub first_block: Option<String>,
    /// Inner HTML of `<body>`.
    pub body_html: String,
    pub metadata: ImportMetadata,
}

impl HtmlPage {
    /// Parse a full HTML page.
    pub fn parse(html: &str) -> Self {
        let doc = Html::parse_document(html);
        let mut page = HtmlPage {
            metadata: metadata::extract_from(&doc),
            ..Default::default()
        };

        for node in doc.root_element().descendants() {
            let Some(el) = ElementRef::wrap(node) else {
                continue;
            };
            match el.value().name() {
                "h1" if page.h1.is_none() => page.h1 = element_text(el),
                "title" if page.title.is_none() => page.title = element_text(el),
                "p" | "div" if page.first_block.is_none() => page.first_block = element_text(el),
                "body" if page.body_html.is_empty() => page.body_html = el.inner_html(),
                _ => {}
            }
        }
        page
    }

    /// `<h1>`, then `<title>`, then the fixed fallback.
    pub fn title(&self) -> String {
        self.h1
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| FALLBACK_NOTE_TITLE.to_string())
    }

    /// Like [`HtmlPage::title`], trying the first paragraph or div before the
    /// fixed fallback.
    pub fn title_or_first_block(&self) -> String {
        self.h1
            .clone()
            .or_else(|| self.title.clone())
            .or_else(|| self.first_block.clone())
            .unwrap_or_else(|| FALLBACK_NOTE_TITLE.to_string())
    }
}

/// Whitespace-collapsed, trimmed text of an element. `None` when empty.
fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&el.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Collapse every whitespace run (including non-breaking spaces) to one space
/// and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert an HTML fragment (typically a body's inner HTML) to a document.
pub fn html_to_document(html: &str) -> Document {
    let fragment = Html::parse_fragment(html);
    let mut blocks = Vec::new();
    convert_blocks(fragment.root_element(), &mut blocks);
    Document::new(blocks)
}

// =============================================================================
// ELEMENT CLASSIFICATION
// =============================================================================

fn is_skipped(name: &str) -> bool {
    matches!(
        name,
        "head"
            | "script"
            | "style"
            | "title"
            | "meta"
            | "link"
            | "img"
            | "picture"
            | "svg"
            | "object"
            | "iframe"
            | "noscript"
            | "template"
            | "input"
            | "button"
            | "select"
            | "textarea"
    )
}

fn is_inline(name: &str) -> bool {
    matches!(
        name,
        "a" | "abbr"
            | "b"
            | "strong"
            | "i"
            | "em"
            | "cite"
            | "dfn"
            | "s"
            | "strike"
            | "del"
            | "code"
            | "kbd"
            | "samp"
            | "tt"
            | "var"
            | "span"
            | "font"
            | "u"
            | "ins"
            | "mark"
            | "small"
            | "big"
            | "sub"
            | "sup"
            | "label"
            | "q"
            | "time"
            | "br"
            | "wbr"
            | "nobr"
    )
}

fn is_heading(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn has_block_descendant(el: ElementRef<'_>) -> bool {
    el.descendants().skip(1).any(|node| match node.value() {
        Node::Element(child) => !is_inline(child.name()) && !is_skipped(child.name()),
        _ => false,
    })
}

// =============================================================================
// BLOCK CONVERSION
// =============================================================================

fn convert_blocks(parent: ElementRef<'_>, out: &mut Vec<Block>) {
    let mut pending = InlineBuffer::default();

    for child in parent.children() {
        match child.value() {
            Node::Text(text) => pending.push_text(text, &[]),
            Node::Element(_) => {
                let Some(el) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = el.value().name();
                if is_skipped(name) {
                    continue;
                }
                if name == "br" {
                    pending.hard_break();
                    continue;
                }
                if is_inline(name) && !has_block_descendant(el) {
                    collect_inline_element(el, &[], &mut pending);
                    continue;
                }
                flush_paragraph(&mut pending, out);
                convert_block_element(el, name, out);
            }
            _ => {}
        }
    }
    flush_paragraph(&mut pending, out);
}

fn flush_paragraph(pending: &mut InlineBuffer, out: &mut Vec<Block>) {
    let content = std::mem::take(pending).finish();
    if !content.is_empty() {
        out.push(Block::Paragraph { content });
    }
}

fn convert_block_element(el: ElementRef<'_>, name: &str, out: &mut Vec<Block>) {
    if let Some(level) = is_heading(name) {
        let content = inline_content(el);
        if !content.is_empty() {
            out.push(Block::Heading {
                attrs: HeadingAttrs { level },
                content,
            });
        }
        return;
    }

    match name {
        "p" => {
            if has_block_descendant(el) {
                convert_blocks(el, out);
            } else {
                out.push(Block::Paragraph {
                    content: inline_content(el),
                });
            }
        }
        "ul" | "ol" => out.push(convert_list(el, name == "ol")),
        "blockquote" => {
            let mut content = Vec::new();
            convert_blocks(el, &mut content);
            if content.is_empty() {
                content.push(Block::paragraph(""));
            }
            out.push(Block::Blockquote { content });
        }
        "pre" => {
            let text: String = el.text().collect();
            let text = text.trim_end_matches('\n');
            let content = if text.is_empty() {
                Vec::new()
            } else {
                vec![Inline::text(text)]
            };
            out.push(Block::CodeBlock { content });
        }
        "hr" => out.push(Block::HorizontalRule),
        // div, section, table cells, stray li, and anything unknown
        _ => convert_blocks(el, out),
    }
}

fn inline_content(el: ElementRef<'_>) -> Vec<Inline> {
    let mut buffer = InlineBuffer::default();
    collect_inline_children(el, &[], &mut buffer);
    buffer.finish()
}

// =============================================================================
// LISTS
// =============================================================================

fn convert_list(list: ElementRef<'_>, ordered: bool) -> Block {
    let items: Vec<ElementRef<'_>> = list
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| !is_skipped(el.value().name()))
        .collect();

    let is_task_list = list.value().attr("data-type") == Some("taskList")
        || (!items.is_empty() && items.iter().all(|li| task_state(*li).is_some()));

    if is_task_list {
        let content = items
            .into_iter()
            .map(|li| TaskItem {
                attrs: TaskItemAttrs {
                    checked: task_state(li).unwrap_or(false),
                },
                content: list_item_blocks(li),
            })
            .collect();
        return Block::TaskList { content };
    }

    let content: Vec<ListItem> = items
        .into_iter()
        .map(|li| ListItem {
            content: list_item_blocks(li),
        })
        .collect();

    if ordered {
        let start = list
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        Block::OrderedList {
            attrs: OrderedListAttrs { start },
            content,
        }
    } else {
        Block::BulletList { content }
    }
}

/// Blocks of a list item. The first child is always a paragraph.
fn list_item_blocks(li: ElementRef<'_>) -> Vec<Block> {
    let mut blocks = Vec::new();
    if li.value().name() == "li" {
        convert_blocks(li, &mut blocks);
    } else {
        // Nested list placed directly inside the parent list.
        convert_block_element(li, li.value().name(), &mut blocks);
    }
    if !matches!(blocks.first(), Some(Block::Paragraph { .. })) {
        blocks.insert(0, Block::paragraph(""));
    }
    blocks
}

/// Checked state of a task item, or `None` if the item is not a task.
fn task_state(li: ElementRef<'_>) -> Option<bool> {
    if li.value().attr("data-type") == Some("taskItem") {
        return Some(li.value().attr("data-checked") == Some("true"));
    }
    find_checkbox(li)
}

fn find_checkbox(el: ElementRef<'_>) -> Option<bool> {
    for child in el.children().filter_map(ElementRef::wrap) {
        let value = child.value();
        match value.name() {
            "input" if value.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) => {
                return Some(value.attr("checked").is_some());
            }
            "ul" | "ol" => continue,
            _ => {
                if let Some(state) = find_checkbox(child) {
                    return Some(state);
                }
            }
        }
    }
    None
}

// =============================================================================
// INLINE CONVERSION
// =============================================================================

fn collect_inline_children(parent: ElementRef<'_>, marks: &[Mark], out: &mut InlineBuffer) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => out.push_text(text, marks),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    collect_inline_element(el, marks, out);
                }
            }
            _ => {}
        }
    }
}

fn collect_inline_element(el: ElementRef<'_>, marks: &[Mark], out: &mut InlineBuffer) {
    let value = el.value();
    let name = value.name();
    if is_skipped(name) {
        return;
    }
    if name == "br" {
        out.hard_break();
        return;
    }

    let mut marks = marks.to_vec();
    let mut add = |mark: Mark| {
        if !marks.contains(&mark) {
            marks.push(mark);
        }
    };
    match name {
        "b" | "strong" => add(Mark::Bold),
        "i" | "em" | "cite" | "dfn" | "var" => add(Mark::Italic),
        "s" | "strike" | "del" => add(Mark::Strike),
        "code" | "kbd" | "samp" | "tt" => add(Mark::Code),
        "a" => {
            if let Some(href) = value.attr("href").map(str::trim).filter(|h| !h.is_empty()) {
                add(Mark::Link {
                    attrs: LinkAttrs {
                        href: href.to_string(),
                    },
                });
            }
        }
        _ => {}
    }
    if let Some(style) = value.attr("style") {
        for mark in marks_from_style(style) {
            add(mark);
        }
    }

    collect_inline_children(el, &marks, out);
}

/// Marks implied by inline CSS, as Office exports bold and italic this way.
fn marks_from_style(style: &str) -> Vec<Mark> {
    let mut marks = Vec::new();
    for decl in style.split(';') {
        let Some((prop, value)) = decl.split_once(':') else {
            continue;
        };
        let prop = prop.trim().to_ascii_lowercase();
        let value = value.trim().to_ascii_lowercase();
        match prop.as_str() {
            "font-weight" => {
                let heavy = value == "bold"
                    || value == "bolder"
                    || value.parse::<u16>().is_ok_and(|w| w >= 600);
                if heavy {
                    marks.push(Mark::Bold);
                }
            }
            "font-style" if value == "italic" || value == "oblique" => marks.push(Mark::Italic),
            "text-decoration" | "text-decoration-line" if value.contains("line-through") => {
                marks.push(Mark::Strike)
            }
            _ => {}
        }
    }
    marks
}

/// Accumulates inline runs with HTML whitespace collapsing.
#[derive(Debug, Default)]
struct InlineBuffer {
    inlines: Vec<Inline>,
}

impl InlineBuffer {
    fn at_line_start(&self) -> bool {
        match self.inlines.last() {
            None | Some(Inline::HardBreak) => true,
            Some(Inline::Text { text, .. }) => text.ends_with(' '),
        }
    }

    fn push_text(&mut self, raw: &str, marks: &[Mark]) {
        let mut skip_space = self.at_line_start();
        let mut text = String::with_capacity(raw.len());
        for c in raw.chars() {
            if c.is_whitespace() {
                if !skip_space {
                    text.push(' ');
                    skip_space = true;
                }
            } else {
                text.push(c);
                skip_space = false;
            }
        }
        if text.is_empty() {
            return;
        }
        if let Some(Inline::Text {
            text: prev,
            marks: prev_marks,
        }) = self.inlines.last_mut()
        {
            if prev_marks.as_slice() == marks {
                prev.push_str(&text);
                return;
            }
        }
        self.inlines.push(Inline::marked(text, marks.to_vec()));
    }

    fn hard_break(&mut self) {
        self.trim_trailing_space();
        self.inlines.push(Inline::HardBreak);
    }

    fn trim_trailing_space(&mut self) {
        while let Some(Inline::Text { text, .. }) = self.inlines.last_mut() {
            let trimmed_len = text.trim_end_matches(' ').len();
            text.truncate(trimmed_len);
            if text.is_empty() {
                self.inlines.pop();
            } else {
                break;
            }
        }
    }

    fn finish(mut self) -> Vec<Inline> {
        self.trim_trailing_space();
        while matches!(self.inlines.last(), Some(Inline::HardBreak)) {
            self.inlines.pop();
            self.trim_trailing_space();
        }
        self.inlines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_json(html: &str) -> serde_json::Value {
        serde_json::to_value(html_to_document(html)).unwrap()
    }

    #[test]
    fn test_title_prefers_h1() {
        let page = HtmlPage::parse(
            "<html><head><title>Page</title></head><body><h1> Heading  One </h1></body></html>",
        );
        assert_eq!(page.title(), "Heading One");
    }

    #[test]
    fn test_title_falls_back_to_title_tag() {
        let page =
            HtmlPage::parse("<html><head><title>Page Title</title></head><body><p>x</p></body></html>");
        assert_eq!(page.title(), "Page Title");
    }

    #[test]
    fn test_title_fixed_fallback() {
        let page = HtmlPage::parse("<p>Just text</p>");
        assert_eq!(page.title(), FALLBACK_NOTE_TITLE);
        assert_eq!(page.title_or_first_block(), "Just text");
    }

    #[test]
    fn test_empty_h1_is_ignored() {
        let page = HtmlPage::parse("<title>T</title><h1>  </h1>");
        assert_eq!(page.title(), "T");
    }

    #[test]
    fn test_body_html_extracted() {
        let page = HtmlPage::parse("<html><body><p>A</p></body></html>");
        assert_eq!(page.body_html, "<p>A</p>");
    }

    #[test]
    fn test_paragraphs_and_headings() {
        assert_eq!(
            doc_json("<h2>Title</h2><p>Body text</p>"),
            json!({
                "type": "doc",
                "content": [
                    {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Title"}]},
                    {"type": "paragraph", "content": [{"type": "text", "text": "Body text"}]}
                ]
            })
        );
    }

    #[test]
    fn test_whitespace_collapsed_and_nbsp() {
        let doc = html_to_document("<p>  a \n\t b&nbsp;&nbsp;c </p>");
        assert_eq!(doc.plain_text(), "a b c");
    }

    #[test]
    fn test_marks_and_merging() {
        let value = doc_json(r#"<p>plain <b>bold</b><strong> more</strong> <a href="https://x.test">link</a></p>"#);
        let content = &value["content"][0]["content"];
        assert_eq!(content[0], json!({"type": "text", "text": "plain "}));
        assert_eq!(
            content[1],
            json!({"type": "text", "text": "bold more", "marks": [{"type": "bold"}]})
        );
        assert_eq!(content[2], json!({"type": "text", "text": " "}));
        assert_eq!(content[3]["marks"][0]["attrs"]["href"], "https://x.test");
    }

    #[test]
    fn test_style_marks() {
        let value = doc_json(r#"<p><span style="font-weight:bold;font-style:italic">x</span></p>"#);
        assert_eq!(
            value["content"][0]["content"][0]["marks"],
            json!([{"type": "bold"}, {"type": "italic"}])
        );
    }

    #[test]
    fn test_divs_are_transparent() {
        let doc = html_to_document("<div>First</div><div><div>Second</div></div>");
        assert_eq!(doc.content, vec![Block::paragraph("First"), Block::paragraph("Second")]);
    }

    #[test]
    fn test_bare_inline_wrapped_in_paragraph() {
        let doc = html_to_document("loose <i>text</i><p>para</p>tail");
        assert_eq!(doc.content.len(), 3);
        assert_eq!(doc.plain_text(), "loose text\npara\ntail");
    }

    #[test]
    fn test_bullet_and_ordered_lists() {
        let value = doc_json(r#"<ul><li>a</li><li><p>b</p></li></ul><ol start="3"><li>c</li></ol>"#);
        assert_eq!(value["content"][0]["type"], "bulletList");
        assert_eq!(value["content"][0]["content"][1]["type"], "listItem");
        assert_eq!(
            value["content"][0]["content"][1]["content"][0]["content"][0]["text"],
            "b"
        );
        assert_eq!(value["content"][1]["type"], "orderedList");
        assert_eq!(value["content"][1]["attrs"]["start"], 3);
    }

    #[test]
    fn test_empty_list_item_gets_paragraph() {
        let doc = html_to_document("<ul><li></li></ul>");
        match &doc.content[0] {
            Block::BulletList { content } => {
                assert_eq!(content[0].content, vec![Block::paragraph("")]);
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_nested_list_item_starts_with_paragraph() {
        let doc = html_to_document("<ul><li><ul><li>inner</li></ul></li></ul>");
        let Block::BulletList { content } = &doc.content[0] else {
            panic!("expected bullet list");
        };
        assert!(matches!(content[0].content[0], Block::Paragraph { .. }));
        assert!(matches!(content[0].content[1], Block::BulletList { .. }));
    }

    #[test]
    fn test_task_list_from_checkboxes() {
        let doc = html_to_document(
            r#"<ul><li><input type="checkbox" checked>done</li><li><input type="checkbox">todo</li></ul>"#,
        );
        let Block::TaskList { content } = &doc.content[0] else {
            panic!("expected task list, got {:?}", doc.content);
        };
        assert!(content[0].attrs.checked);
        assert!(!content[1].attrs.checked);
        assert_eq!(content[1].content, vec![Block::paragraph("todo")]);
    }

    #[test]
    fn test_task_list_from_data_type() {
        let doc = html_to_document(
            r#"<ul data-type="taskList"><li data-type="taskItem" data-checked="true"><p>x</p></li></ul>"#,
        );
        assert!(matches!(&doc.content[0], Block::TaskList { content } if content[0].attrs.checked));
    }

    #[test]
    fn test_skips_images_scripts_styles() {
        let doc = html_to_document(
            r#"<style>p{}</style><script>alert(1)</script><p>A<img src="x.png">B</p>"#,
        );
        assert_eq!(doc.plain_text(), "AB");
    }

    #[test]
    fn test_hard_break_and_blockquote() {
        let value = doc_json("<blockquote><p>line1<br>line2</p></blockquote><hr>");
        let para = &value["content"][0]["content"][0];
        assert_eq!(para["content"][1], json!({"type": "hardBreak"}));
        assert_eq!(value["content"][1], json!({"type": "horizontalRule"}));
    }

    #[test]
    fn test_pre_keeps_whitespace() {
        let doc = html_to_document("<pre>fn main() {\n    x();\n}\n</pre>");
        assert_eq!(
            doc.content,
            vec![Block::CodeBlock {
                content: vec![Inline::text("fn main() {\n    x();\n}")]
            }]
        );
    }

    #[test]
    fn test_tables_flattened() {
        let doc = html_to_document(
            "<table><tr><td>cell one</td><td><p>cell two</p></td></tr></table>",
        );
        assert_eq!(doc.plain_text(), "cell one\ncell two");
    }

    #[test]
    fn test_span_wrapping_blocks_is_transparent() {
        let doc = html_to_document("<span><p>a</p><p>b</p></span>");
        assert_eq!(doc.content, vec![Block::paragraph("a"), Block::paragraph("b")]);
    }
}
