//! Structured note body.
//!
//! # Responsibility
//! - Model the rich-text body as a closed set of tagged block variants.
//! - Provide the editing operations the editor session needs: block
//!   insertion/removal, Link Node insertion, view toggles and slash commands.
//!
//! # Invariants
//! - `NoteLink` blocks are atomic: they are inserted, toggled or removed
//!   as a whole, never edited internally.
//! - Link ordinals count Link Nodes depth-first in document order,
//!   including links nested in lists, quotes and table cells.
//!
//! Serialization lives in `model::html`.

use crate::model::commands::SlashCommand;
use crate::model::note_link::{NavigationRequest, NoteLink, ViewMode};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Inline formatting marks, in canonical nesting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
}

/// Inline content of paragraphs and headings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text { text: String, marks: BTreeSet<Mark> },
    HardBreak,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            marks: BTreeSet::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: impl IntoIterator<Item = Mark>) -> Self {
        Self::Text {
            text: text.into(),
            marks: marks.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCell {
    pub header: bool,
    pub blocks: Vec<Block>,
}

/// Block-level node. Rendering dispatches on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph { content: Vec<Inline> },
    /// `level` is clamped to `1..=6`.
    Heading { level: u8, content: Vec<Inline> },
    BulletList { items: Vec<ListItem> },
    OrderedList { start: u32, items: Vec<ListItem> },
    Blockquote { blocks: Vec<Block> },
    CodeBlock { language: Option<String>, text: String },
    HorizontalRule,
    Table { rows: Vec<TableRow> },
    NoteLink(NoteLink),
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Inline::text(text)]
        };
        Self::Paragraph { content }
    }

    /// Inline content for paragraph-like blocks.
    pub fn inline_content(&self) -> Option<&[Inline]> {
        match self {
            Self::Paragraph { content } | Self::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    fn collect_text(&self, out: &mut Vec<String>) {
        match self {
            Self::Paragraph { content } | Self::Heading { content, .. } => {
                out.push(inline_text(content));
            }
            Self::BulletList { items } | Self::OrderedList { items, .. } => {
                for item in items {
                    collect_blocks_text(&item.blocks, out);
                }
            }
            Self::Blockquote { blocks } => collect_blocks_text(blocks, out),
            Self::CodeBlock { text, .. } => out.push(text.clone()),
            Self::Table { rows } => {
                for cell in rows.iter().flat_map(|row| &row.cells) {
                    collect_blocks_text(&cell.blocks, out);
                }
            }
            Self::HorizontalRule | Self::NoteLink(_) => {}
        }
    }
}

/// Errors raised by document edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("position {at} is out of range for a document of {len} blocks")]
    PositionOutOfRange { at: usize, len: usize },
    #[error("no note link with ordinal {0}")]
    LinkNotFound(usize),
    #[error("block {0} does not hold editable text")]
    NotATextBlock(usize),
}

/// What a slash command did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    /// The block was reshaped in place.
    Applied,
    /// The host must pick a target note, then insert it at `at`.
    PickNote { at: usize },
}

/// Rich-text body of one note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn insert_block(&mut self, at: usize, block: Block) -> Result<(), DocumentError> {
        self.check_insert_position(at)?;
        self.blocks.insert(at, block);
        Ok(())
    }

    pub fn remove_block(&mut self, at: usize) -> Result<Block, DocumentError> {
        if at >= self.blocks.len() {
            return Err(DocumentError::PositionOutOfRange {
                at,
                len: self.blocks.len(),
            });
        }
        Ok(self.blocks.remove(at))
    }

    /// Inserts a Link Node before block `at` and returns its ordinal.
    pub fn insert_note_link(&mut self, at: usize, link: NoteLink) -> Result<usize, DocumentError> {
        self.check_insert_position(at)?;
        self.blocks.insert(at, Block::NoteLink(link));
        Ok(count_links(&self.blocks[..at]))
    }

    /// Inserts a Link Node in place of the slash-command trigger typed in
    /// block `at`.
    ///
    /// A paragraph holding only the trigger is replaced. A paragraph with
    /// text before the trigger keeps that text and the link goes after it.
    /// Without a trigger this is a plain insertion at `at`.
    pub fn replace_trigger_with_link(
        &mut self,
        at: usize,
        link: NoteLink,
    ) -> Result<usize, DocumentError> {
        self.check_insert_position(at)?;
        let trigger = match self.blocks.get_mut(at) {
            Some(Block::Paragraph { content }) => strip_trigger(content),
            _ => TriggerStrip::Absent,
        };
        match trigger {
            TriggerStrip::WholeBlock => {
                self.blocks[at] = Block::NoteLink(link);
                Ok(count_links(&self.blocks[..at]))
            }
            TriggerStrip::Suffix => self.insert_note_link(at + 1, link),
            TriggerStrip::Absent => self.insert_note_link(at, link),
        }
    }

    /// Applies a block-shaping slash command to block `at`.
    pub fn apply_block_command(
        &mut self,
        at: usize,
        command: SlashCommand,
    ) -> Result<CommandEffect, DocumentError> {
        if command == SlashCommand::LinkToNote {
            self.check_insert_position(at)?;
            return Ok(CommandEffect::PickNote { at });
        }

        let len = self.blocks.len();
        let block = self
            .blocks
            .get_mut(at)
            .ok_or(DocumentError::PositionOutOfRange { at, len })?;
        let mut content = match block {
            Block::Paragraph { content } | Block::Heading { content, .. } => {
                std::mem::take(content)
            }
            _ => return Err(DocumentError::NotATextBlock(at)),
        };
        strip_trigger(&mut content);

        let reshaped = match command {
            SlashCommand::Text => Block::Paragraph { content },
            SlashCommand::Heading1 => Block::Heading { level: 1, content },
            SlashCommand::Heading2 => Block::Heading { level: 2, content },
            SlashCommand::BulletList => Block::BulletList {
                items: vec![ListItem {
                    blocks: vec![Block::Paragraph { content }],
                }],
            },
            SlashCommand::NumberedList => Block::OrderedList {
                start: 1,
                items: vec![ListItem {
                    blocks: vec![Block::Paragraph { content }],
                }],
            },
            SlashCommand::CodeBlock => Block::CodeBlock {
                language: None,
                text: inline_text(&content),
            },
            SlashCommand::Divider => {
                if is_blank(&content) {
                    Block::HorizontalRule
                } else {
                    *block = Block::Paragraph { content };
                    self.blocks.insert(at + 1, Block::HorizontalRule);
                    return Ok(CommandEffect::Applied);
                }
            }
            SlashCommand::LinkToNote => unreachable!("handled above"),
        };
        *block = reshaped;
        Ok(CommandEffect::Applied)
    }

    /// All Link Nodes in ordinal order.
    pub fn note_links(&self) -> Vec<&NoteLink> {
        let mut links = Vec::new();
        collect_links(&self.blocks, &mut links);
        links
    }

    pub fn note_link(&self, ordinal: usize) -> Option<&NoteLink> {
        self.note_links().into_iter().nth(ordinal)
    }

    pub fn note_link_mut(&mut self, ordinal: usize) -> Option<&mut NoteLink> {
        let mut remaining = ordinal;
        find_link_mut(&mut self.blocks, &mut remaining)
    }

    /// Flips the view mode of one Link Node and returns the new mode.
    pub fn toggle_link_view(&mut self, ordinal: usize) -> Result<ViewMode, DocumentError> {
        self.note_link_mut(ordinal)
            .map(NoteLink::toggle_view_mode)
            .ok_or(DocumentError::LinkNotFound(ordinal))
    }

    /// Navigation signal for activating a Link Node's body.
    pub fn activate_link(&self, ordinal: usize) -> Result<NavigationRequest, DocumentError> {
        self.note_link(ordinal)
            .map(NoteLink::navigation_request)
            .ok_or(DocumentError::LinkNotFound(ordinal))
    }

    /// Markup-free text with blocks joined by single spaces.
    ///
    /// Link Nodes contribute nothing.
    pub fn plain_text(&self) -> String {
        let mut pieces = Vec::new();
        collect_blocks_text(&self.blocks, &mut pieces);
        let joined = pieces.join(" ");
        WHITESPACE_RE.replace_all(&joined, " ").trim().to_string()
    }

    fn check_insert_position(&self, at: usize) -> Result<(), DocumentError> {
        if at > self.blocks.len() {
            return Err(DocumentError::PositionOutOfRange {
                at,
                len: self.blocks.len(),
            });
        }
        Ok(())
    }
}

enum TriggerStrip {
    WholeBlock,
    Suffix,
    Absent,
}

// The trigger is a `/` opening a word, followed by a whitespace-free query
// running to the end of the block.
fn strip_trigger(content: &mut Vec<Inline>) -> TriggerStrip {
    let Some(slash) = trigger_start(content) else {
        return TriggerStrip::Absent;
    };
    if let Some(Inline::Text { text, .. }) = content.last_mut() {
        text.truncate(slash);
        if text.is_empty() {
            content.pop();
        }
    }
    if is_blank(content) {
        content.clear();
        TriggerStrip::WholeBlock
    } else {
        TriggerStrip::Suffix
    }
}

fn trigger_start(content: &[Inline]) -> Option<usize> {
    let (Inline::Text { text, .. }, before) = content.split_last()? else {
        return None;
    };
    let slash = text.rfind('/')?;
    if text[slash + 1..].chars().any(char::is_whitespace) {
        return None;
    }
    let opens_word = match text[..slash].chars().next_back() {
        Some(prev) => prev.is_whitespace(),
        None => match before.last() {
            None | Some(Inline::HardBreak) => true,
            Some(Inline::Text { text, .. }) => text.ends_with(char::is_whitespace),
        },
    };
    opens_word.then_some(slash)
}

fn is_blank(content: &[Inline]) -> bool {
    content.iter().all(|inline| match inline {
        Inline::Text { text, .. } => text.trim().is_empty(),
        Inline::HardBreak => true,
    })
}

fn inline_text(content: &[Inline]) -> String {
    content
        .iter()
        .map(|inline| match inline {
            Inline::Text { text, .. } => text.as_str(),
            Inline::HardBreak => " ",
        })
        .collect()
}

fn collect_blocks_text(blocks: &[Block], out: &mut Vec<String>) {
    for block in blocks {
        block.collect_text(out);
    }
}

fn collect_links<'a>(blocks: &'a [Block], out: &mut Vec<&'a NoteLink>) {
    for block in blocks {
        match block {
            Block::NoteLink(link) => out.push(link),
            Block::BulletList { items } | Block::OrderedList { items, .. } => {
                for item in items {
                    collect_links(&item.blocks, out);
                }
            }
            Block::Blockquote { blocks } => collect_links(blocks, out),
            Block::Table { rows } => {
                for cell in rows.iter().flat_map(|row| &row.cells) {
                    collect_links(&cell.blocks, out);
                }
            }
            Block::Paragraph { .. }
            | Block::Heading { .. }
            | Block::CodeBlock { .. }
            | Block::HorizontalRule => {}
        }
    }
}

fn count_links(blocks: &[Block]) -> usize {
    let mut links = Vec::new();
    collect_links(blocks, &mut links);
    links.len()
}

fn find_link_mut<'a>(blocks: &'a mut [Block], remaining: &mut usize) -> Option<&'a mut NoteLink> {
    for block in blocks.iter_mut() {
        let found = match block {
            Block::NoteLink(link) => {
                if *remaining == 0 {
                    return Some(link);
                }
                *remaining -= 1;
                None
            }
            Block::BulletList { items } | Block::OrderedList { items, .. } => items
                .iter_mut()
                .find_map(|item| find_link_mut(&mut item.blocks, remaining)),
            Block::Blockquote { blocks } => find_link_mut(blocks, remaining),
            Block::Table { rows } => rows
                .iter_mut()
                .flat_map(|row| row.cells.iter_mut())
                .find_map(|cell| find_link_mut(&mut cell.blocks, remaining)),
            Block::Paragraph { .. }
            | Block::Heading { .. }
            | Block::CodeBlock { .. }
            | Block::HorizontalRule => None,
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{Block, CommandEffect, Document, DocumentError, Inline, ListItem, Mark};
    use crate::model::commands::SlashCommand;
    use crate::model::note_link::{NoteLink, ViewMode};

    fn link(title: &str) -> NoteLink {
        NoteLink::from_attributes([("title", title)])
    }

    #[test]
    fn ordinals_follow_document_order_including_nested_links() {
        let mut doc = Document::new(vec![
            Block::NoteLink(link("a")),
            Block::BulletList {
                items: vec![ListItem {
                    blocks: vec![Block::NoteLink(link("b"))],
                }],
            },
            Block::NoteLink(link("c")),
        ]);
        let titles: Vec<_> = doc.note_links().iter().map(|l| l.title.clone()).collect();
        assert_eq!(titles, ["a", "b", "c"]);

        assert_eq!(doc.toggle_link_view(1), Ok(ViewMode::Link));
        assert_eq!(doc.note_link(1).map(|l| l.view_mode), Some(ViewMode::Link));
        assert_eq!(doc.note_link(0).map(|l| l.view_mode), Some(ViewMode::Card));
        assert_eq!(doc.toggle_link_view(3), Err(DocumentError::LinkNotFound(3)));
    }

    #[test]
    fn insert_note_link_returns_ordinal_and_checks_bounds() {
        let mut doc = Document::new(vec![Block::paragraph("one"), Block::NoteLink(link("x"))]);
        assert_eq!(doc.insert_note_link(2, link("y")), Ok(1));
        assert_eq!(doc.insert_note_link(0, link("z")), Ok(0));
        assert_eq!(
            doc.insert_note_link(9, link("w")),
            Err(DocumentError::PositionOutOfRange { at: 9, len: 4 })
        );
    }

    #[test]
    fn trigger_only_paragraph_is_replaced_by_link() {
        let mut doc = Document::new(vec![Block::paragraph("intro"), Block::paragraph("/link")]);
        assert_eq!(doc.replace_trigger_with_link(1, link("t")), Ok(0));
        assert_eq!(doc.len(), 2);
        assert!(matches!(doc.blocks()[1], Block::NoteLink(_)));
    }

    #[test]
    fn trigger_after_text_keeps_text_and_appends_link() {
        let mut doc = Document::new(vec![Block::paragraph("see /li")]);
        doc.replace_trigger_with_link(0, link("t")).unwrap();
        assert_eq!(doc.blocks()[0], Block::paragraph("see "));
        assert!(matches!(doc.blocks()[1], Block::NoteLink(_)));
    }

    #[test]
    fn block_commands_reshape_trigger_paragraph() {
        let mut doc = Document::new(vec![Block::Paragraph {
            content: vec![Inline::marked("Title", [Mark::Bold]), Inline::text(" /h1")],
        }]);
        assert_eq!(
            doc.apply_block_command(0, SlashCommand::Heading1),
            Ok(CommandEffect::Applied)
        );
        assert_eq!(
            doc.blocks()[0],
            Block::Heading {
                level: 1,
                content: vec![Inline::marked("Title", [Mark::Bold]), Inline::text(" ")],
            }
        );

        let mut doc = Document::new(vec![Block::paragraph("/divider")]);
        doc.apply_block_command(0, SlashCommand::Divider).unwrap();
        assert_eq!(doc.blocks(), [Block::HorizontalRule]);

        assert_eq!(
            doc.apply_block_command(0, SlashCommand::Text),
            Err(DocumentError::NotATextBlock(0))
        );
        assert_eq!(
            doc.apply_block_command(1, SlashCommand::LinkToNote),
            Ok(CommandEffect::PickNote { at: 1 })
        );
    }

    #[test]
    fn slashes_inside_words_or_phrases_are_not_triggers() {
        let mut doc = Document::new(vec![Block::paragraph("A/B testing results")]);
        doc.apply_block_command(0, SlashCommand::Heading1).unwrap();
        assert_eq!(
            doc.blocks()[0],
            Block::Heading {
                level: 1,
                content: vec![Inline::text("A/B testing results")],
            }
        );

        let mut doc = Document::new(vec![Block::paragraph("read and/or write")]);
        assert_eq!(doc.replace_trigger_with_link(0, link("t")), Ok(0));
        assert_eq!(doc.blocks()[0], Block::NoteLink(link("t")));
        assert_eq!(doc.blocks()[1], Block::paragraph("read and/or write"));

        let mut doc = Document::new(vec![Block::paragraph("either and/or")]);
        doc.apply_block_command(0, SlashCommand::BulletList).unwrap();
        assert_eq!(doc.plain_text(), "either and/or");
    }

    #[test]
    fn plain_text_skips_links_and_collapses_whitespace() {
        let doc = Document::new(vec![
            Block::paragraph("Flour,"),
            Block::NoteLink(link("ignored")),
            Block::Paragraph {
                content: vec![Inline::text("  eggs"), Inline::HardBreak, Inline::text("milk ")],
            },
        ]);
        assert_eq!(doc.plain_text(), "Flour, eggs milk");
    }
}
