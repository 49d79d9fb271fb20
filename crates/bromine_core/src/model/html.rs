//! HTML codec for note bodies.
//!
//! # Responsibility
//! - Parse the editor's HTML into a [`Document`] tree.
//! - Serialize a [`Document`] back into canonical HTML.
//!
//! # Invariants
//! - Parsing never fails: unknown elements contribute their text, stray
//!   closing tags are ignored, unclosed elements end at end of input.
//! - `Document::parse_html(&doc.to_html()) == doc` for documents built
//!   from parsed input.

use crate::model::document::{Block, Document, Inline, ListItem, Mark, TableCell, TableRow};
use crate::model::note_link::{NoteLink, NOTE_LINK_TAG};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s/>=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*(/?)>"#,
    )
    .expect("valid tag regex")
});
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s/>=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("valid attribute regex")
});

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "col", "meta", "link", "wbr"];
const MAX_DEPTH: usize = 128;

#[derive(Debug)]
enum RawNode {
    Element(RawElement),
    Text(String),
}

#[derive(Debug, Default)]
struct RawElement {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<RawNode>,
}

impl RawElement {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn text_content(&self) -> String {
        let mut out = String::new();
        push_text_content(&self.children, &mut out);
        out
    }
}

fn push_text_content(nodes: &[RawNode], out: &mut String) {
    for node in nodes {
        match node {
            RawNode::Text(text) => out.push_str(text),
            RawNode::Element(element) if element.name == "br" => out.push('\n'),
            RawNode::Element(element) => push_text_content(&element.children, out),
        }
    }
}

impl Document {
    /// Parses a serialized note body.
    pub fn parse_html(source: &str) -> Self {
        let root = build_tree(source);
        Self::new(convert_blocks(&root.children))
    }

    /// Serializes this document into canonical HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_blocks(self.blocks(), &mut out);
        out
    }
}

fn build_tree(source: &str) -> RawElement {
    let mut stack: Vec<RawElement> = vec![RawElement::default()];
    let mut cursor = 0;

    for caps in TAG_RE.captures_iter(source) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        push_text(&mut stack, &source[cursor..whole.start()]);
        cursor = whole.end();

        let Some(name) = caps.get(2) else {
            continue; // comment
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());

        if closing {
            close_element(&mut stack, &name);
            continue;
        }

        let element = RawElement {
            attrs: parse_attributes(caps.get(3).map_or("", |m| m.as_str())),
            name,
            children: Vec::new(),
        };
        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());
        if self_closing || VOID_ELEMENTS.contains(&element.name.as_str()) || stack.len() > MAX_DEPTH
        {
            attach(&mut stack, RawNode::Element(element));
        } else {
            stack.push(element);
        }
    }
    push_text(&mut stack, &source[cursor..]);

    while stack.len() > 1 {
        if let Some(element) = stack.pop() {
            attach(&mut stack, RawNode::Element(element));
        }
    }
    stack.pop().unwrap_or_default()
}

fn parse_attributes(source: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(source)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let raw = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            Some((name, html_escape::decode_html_entities(raw).into_owned()))
        })
        .collect()
}

fn push_text(stack: &mut [RawElement], raw: &str) {
    if raw.is_empty() {
        return;
    }
    let decoded = html_escape::decode_html_entities(raw).into_owned();
    if let Some(top) = stack.last_mut() {
        top.children.push(RawNode::Text(decoded));
    }
}

fn attach(stack: &mut [RawElement], node: RawNode) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

fn close_element(stack: &mut Vec<RawElement>, name: &str) {
    let Some(position) = stack.iter().skip(1).rposition(|element| element.name == name) else {
        return;
    };
    // rposition over skip(1) is relative to index 1.
    let target = position + 1;
    while stack.len() > target {
        if let Some(element) = stack.pop() {
            attach(stack, RawNode::Element(element));
        }
    }
}

fn convert_blocks(nodes: &[RawNode]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending: Vec<Inline> = Vec::new();

    for node in nodes {
        match node {
            RawNode::Text(text) => {
                if !text.trim().is_empty() || !pending.is_empty() {
                    push_inline(&mut pending, Inline::text(text.as_str()));
                }
            }
            RawNode::Element(element) => match block_from_element(element) {
                BlockParse::Block(block) => {
                    flush_paragraph(&mut blocks, &mut pending);
                    blocks.push(block);
                }
                BlockParse::Many(children) => {
                    flush_paragraph(&mut blocks, &mut pending);
                    blocks.extend(children);
                }
                BlockParse::Inline => {
                    collect_inline(std::slice::from_ref(node), &BTreeSet::new(), &mut pending);
                }
            },
        }
    }
    flush_paragraph(&mut blocks, &mut pending);
    blocks
}

enum BlockParse {
    Block(Block),
    Many(Vec<Block>),
    Inline,
}

fn block_from_element(element: &RawElement) -> BlockParse {
    let inline = |element: &RawElement| {
        let mut content = Vec::new();
        collect_inline(&element.children, &BTreeSet::new(), &mut content);
        content
    };

    let block = match element.name.as_str() {
        "p" => Block::Paragraph {
            content: inline(element),
        },
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Block::Heading {
            level: element.name[1..].parse().unwrap_or(1),
            content: inline(element),
        },
        "ul" => Block::BulletList {
            items: list_items(element),
        },
        "ol" => Block::OrderedList {
            start: element
                .attr("start")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(1),
            items: list_items(element),
        },
        "blockquote" => Block::Blockquote {
            blocks: convert_blocks(&element.children),
        },
        "pre" => code_block(element),
        "hr" => Block::HorizontalRule,
        "table" => Block::Table {
            rows: table_rows(element),
        },
        NOTE_LINK_TAG => Block::NoteLink(NoteLink::from_attributes(
            element
                .attrs
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )),
        "div" | "section" | "article" | "main" | "body" | "html" | "li" | "thead" | "tbody" => {
            return BlockParse::Many(convert_blocks(&element.children));
        }
        "head" | "script" | "style" | "title" => return BlockParse::Many(Vec::new()),
        _ => return BlockParse::Inline,
    };
    BlockParse::Block(block)
}

fn list_items(element: &RawElement) -> Vec<ListItem> {
    element
        .children
        .iter()
        .filter_map(|child| match child {
            RawNode::Element(item) if item.name == "li" => Some(ListItem {
                blocks: convert_blocks(&item.children),
            }),
            _ => None,
        })
        .collect()
}

fn code_block(element: &RawElement) -> Block {
    let language = element.children.iter().find_map(|child| match child {
        RawNode::Element(code) if code.name == "code" => code
            .attr("class")
            .and_then(|class| {
                class
                    .split_whitespace()
                    .find_map(|token| token.strip_prefix("language-"))
            })
            .map(str::to_string),
        _ => None,
    });
    Block::CodeBlock {
        language,
        text: element.text_content(),
    }
}

fn table_rows(element: &RawElement) -> Vec<TableRow> {
    let mut rows = Vec::new();
    collect_rows(&element.children, &mut rows);
    rows
}

fn collect_rows(nodes: &[RawNode], rows: &mut Vec<TableRow>) {
    for node in nodes {
        let RawNode::Element(element) = node else {
            continue;
        };
        match element.name.as_str() {
            "tr" => rows.push(TableRow {
                cells: element
                    .children
                    .iter()
                    .filter_map(|cell| match cell {
                        RawNode::Element(cell) if cell.name == "td" || cell.name == "th" => {
                            Some(TableCell {
                                header: cell.name == "th",
                                blocks: convert_blocks(&cell.children),
                            })
                        }
                        _ => None,
                    })
                    .collect(),
            }),
            "thead" | "tbody" | "tfoot" => collect_rows(&element.children, rows),
            _ => {}
        }
    }
}

fn collect_inline(nodes: &[RawNode], marks: &BTreeSet<Mark>, out: &mut Vec<Inline>) {
    for node in nodes {
        match node {
            RawNode::Text(text) => push_inline(
                out,
                Inline::Text {
                    text: text.clone(),
                    marks: marks.clone(),
                },
            ),
            RawNode::Element(element) => {
                let mark = match element.name.as_str() {
                    "br" => {
                        out.push(Inline::HardBreak);
                        continue;
                    }
                    "strong" | "b" => Some(Mark::Bold),
                    "em" | "i" => Some(Mark::Italic),
                    "s" | "strike" | "del" => Some(Mark::Strike),
                    "code" => Some(Mark::Code),
                    _ => None,
                };
                match mark {
                    Some(mark) => {
                        let mut nested = marks.clone();
                        nested.insert(mark);
                        collect_inline(&element.children, &nested, out);
                    }
                    None => collect_inline(&element.children, marks, out),
                }
            }
        }
    }
}

// Merges adjacent text runs that carry the same marks.
fn push_inline(out: &mut Vec<Inline>, inline: Inline) {
    if let Inline::Text { text, marks } = &inline {
        if text.is_empty() {
            return;
        }
        if let Some(Inline::Text {
            text: last_text,
            marks: last_marks,
        }) = out.last_mut()
        {
            if last_marks == marks {
                last_text.push_str(text);
                return;
            }
        }
    }
    out.push(inline);
}

fn flush_paragraph(blocks: &mut Vec<Block>, pending: &mut Vec<Inline>) {
    if pending.is_empty() {
        return;
    }
    let content = std::mem::take(pending);
    let blank = content.iter().all(|inline| match inline {
        Inline::Text { text, .. } => text.trim().is_empty(),
        Inline::HardBreak => false,
    });
    if !blank {
        blocks.push(Block::Paragraph { content });
    }
}

fn write_blocks(blocks: &[Block], out: &mut String) {
    for block in blocks {
        write_block(block, out);
    }
}

fn write_block(block: &Block, out: &mut String) {
    match block {
        Block::Paragraph { content } => {
            out.push_str("<p>");
            write_inline(content, out);
            out.push_str("</p>");
        }
        Block::Heading { level, content } => {
            let level = (*level).clamp(1, 6);
            out.push_str(&format!("<h{level}>"));
            write_inline(content, out);
            out.push_str(&format!("</h{level}>"));
        }
        Block::BulletList { items } => {
            out.push_str("<ul>");
            write_items(items, out);
            out.push_str("</ul>");
        }
        Block::OrderedList { start, items } => {
            if *start == 1 {
                out.push_str("<ol>");
            } else {
                out.push_str(&format!("<ol start=\"{start}\">"));
            }
            write_items(items, out);
            out.push_str("</ol>");
        }
        Block::Blockquote { blocks } => {
            out.push_str("<blockquote>");
            write_blocks(blocks, out);
            out.push_str("</blockquote>");
        }
        Block::CodeBlock { language, text } => {
            match language {
                Some(language) => out.push_str(&format!(
                    "<pre><code class=\"language-{}\">",
                    html_escape::encode_double_quoted_attribute(language)
                )),
                None => out.push_str("<pre><code>"),
            }
            out.push_str(&html_escape::encode_text(text));
            out.push_str("</code></pre>");
        }
        Block::HorizontalRule => out.push_str("<hr>"),
        Block::Table { rows } => {
            out.push_str("<table><tbody>");
            for row in rows {
                out.push_str("<tr>");
                for cell in &row.cells {
                    let tag = if cell.header { "th" } else { "td" };
                    out.push_str(&format!("<{tag}>"));
                    write_blocks(&cell.blocks, out);
                    out.push_str(&format!("</{tag}>"));
                }
                out.push_str("</tr>");
            }
            out.push_str("</tbody></table>");
        }
        Block::NoteLink(link) => {
            out.push('<');
            out.push_str(NOTE_LINK_TAG);
            for (name, value) in link.attributes() {
                out.push_str(&format!(
                    " {name}=\"{}\"",
                    html_escape::encode_double_quoted_attribute(&value)
                ));
            }
            out.push_str("></");
            out.push_str(NOTE_LINK_TAG);
            out.push('>');
        }
    }
}

fn write_items(items: &[ListItem], out: &mut String) {
    for item in items {
        out.push_str("<li>");
        write_blocks(&item.blocks, out);
        out.push_str("</li>");
    }
}

fn write_inline(content: &[Inline], out: &mut String) {
    for inline in content {
        match inline {
            Inline::HardBreak => out.push_str("<br>"),
            Inline::Text { text, marks } => {
                for mark in marks {
                    out.push_str(mark_open(*mark));
                }
                out.push_str(&html_escape::encode_text(text));
                for mark in marks.iter().rev() {
                    out.push_str(mark_close(*mark));
                }
            }
        }
    }
}

fn mark_open(mark: Mark) -> &'static str {
    match mark {
        Mark::Bold => "<strong>",
        Mark::Italic => "<em>",
        Mark::Strike => "<s>",
        Mark::Code => "<code>",
    }
}

fn mark_close(mark: Mark) -> &'static str {
    match mark {
        Mark::Bold => "</strong>",
        Mark::Italic => "</em>",
        Mark::Strike => "</s>",
        Mark::Code => "</code>",
    }
}

#[cfg(test)]
mod tests {
    use crate::model::document::{Block, Document, Inline, Mark};
    use crate::model::note_link::ViewMode;

    #[test]
    fn parses_editor_markup_into_tagged_blocks() {
        let doc = Document::parse_html(
            "<h2>Plan</h2><p>Buy <strong>flour</strong><br>and eggs</p><ul><li><p>one</p></li></ul><hr>",
        );
        assert_eq!(doc.len(), 4);
        assert_eq!(
            doc.blocks()[1],
            Block::Paragraph {
                content: vec![
                    Inline::text("Buy "),
                    Inline::marked("flour", [Mark::Bold]),
                    Inline::HardBreak,
                    Inline::text("and eggs"),
                ],
            }
        );
        assert!(matches!(doc.blocks()[2], Block::BulletList { ref items } if items.len() == 1));
        assert_eq!(doc.blocks()[3], Block::HorizontalRule);
    }

    #[test]
    fn parses_note_link_attributes_case_insensitively() {
        let doc = Document::parse_html(
            r#"<note-link id="5f0c2f3e-4d3e-4b55-9c51-0e8f4f1b2a10" title="Recipes &amp; more" preview="Flour, eggs" viewMode="link" createdAt="2026-01-01T00:00:00.000Z"></note-link>"#,
        );
        let link = doc.note_link(0).expect("link should parse");
        assert_eq!(link.title, "Recipes & more");
        assert_eq!(link.view_mode, ViewMode::Link);
        assert_eq!(link.created_at.as_deref(), Some("2026-01-01T00:00:00.000Z"));
        assert!(link.target_id.is_some());
    }

    #[test]
    fn serialization_roundtrips_parsed_documents() {
        let source = concat!(
            "<h1>T</h1>",
            "<p>a &lt;b&gt; <strong><em>c</em></strong></p>",
            "<ol start=\"3\"><li><p>x</p></li></ol>",
            "<blockquote><p>q</p></blockquote>",
            "<pre><code class=\"language-rust\">fn main() {}\n</code></pre>",
            "<table><tbody><tr><th><p>h</p></th><td><p>d</p></td></tr></tbody></table>",
            "<note-link title=\"N\" preview=\"\" viewmode=\"card\"></note-link>",
        );
        let parsed = Document::parse_html(source);
        assert_eq!(parsed.to_html(), source);
        assert_eq!(Document::parse_html(&parsed.to_html()), parsed);
    }

    #[test]
    fn lenient_parsing_handles_plain_text_and_broken_markup() {
        assert_eq!(Document::parse_html("hello").blocks(), [Block::paragraph("hello")]);
        assert_eq!(Document::parse_html("").len(), 0);
        assert_eq!(
            Document::parse_html("<p>open <em>never closed").plain_text(),
            "open never closed"
        );
        assert_eq!(Document::parse_html("</div><p>x</p>").blocks(), [Block::paragraph("x")]);
    }

    #[test]
    fn empty_paragraph_survives_roundtrip() {
        let doc = Document::parse_html("<p></p>");
        assert_eq!(doc.blocks(), [Block::Paragraph { content: vec![] }]);
        assert_eq!(doc.to_html(), "<p></p>");
    }
}
