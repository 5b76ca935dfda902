// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Node types of the document tree and the plain-text projection they
//! define.
//!
//! The projection is the canonical coordinate space of the model: the
//! cursor, the autocomplete tokenizer and every length computed here are
//! character offsets into it. Blocks contribute their text joined by a
//! single `\n`; the projection is *not* trimmed — trimming belongs to the
//! plain-text serializer.

use matrix_mentions::{canonical_display_text, MentionKind};
use strum_macros::EnumIter;

/// An inline formatting attribute, in the fixed order used when nesting
/// HTML tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum InlineFormat {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    InlineCode,
    Spoiler,
}

/// The set of formatting attributes on a text run.
///
/// Nested formatting containers in source HTML are flattened into this
/// struct, so every serializer and parser matches it exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MarkSet {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike_through: bool,
    pub inline_code: bool,
    pub spoiler: bool,
}

impl MarkSet {
    pub fn is_empty(&self) -> bool {
        *self == MarkSet::default()
    }

    pub fn contains(&self, format: InlineFormat) -> bool {
        match format {
            InlineFormat::Bold => self.bold,
            InlineFormat::Italic => self.italic,
            InlineFormat::Underline => self.underline,
            InlineFormat::StrikeThrough => self.strike_through,
            InlineFormat::InlineCode => self.inline_code,
            InlineFormat::Spoiler => self.spoiler,
        }
    }

    pub fn insert(&mut self, format: InlineFormat) {
        match format {
            InlineFormat::Bold => self.bold = true,
            InlineFormat::Italic => self.italic = true,
            InlineFormat::Underline => self.underline = true,
            InlineFormat::StrikeThrough => self.strike_through = true,
            InlineFormat::InlineCode => self.inline_code = true,
            InlineFormat::Spoiler => self.spoiler = true,
        }
    }

    pub fn with(mut self, format: InlineFormat) -> Self {
        self.insert(format);
        self
    }
}

/// A single inline node within a paragraph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Text {
        text: String,
        marks: MarkSet,
    },
    /// An atomic reference to a user or room. `id` is always a valid
    /// identifier for `kind`; constructors enforce this.
    Mention {
        id: String,
        kind: MentionKind,
        display_name: Option<String>,
    },
    /// An atomic custom emoji, rendered as `:shortcode:` in plain text.
    Emoticon {
        shortcode: String,
        resource_uri: String,
    },
    LineBreak,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: MarkSet::default(),
        }
    }

    pub fn text_marked(text: impl Into<String>, marks: MarkSet) -> Self {
        Inline::Text {
            text: text.into(),
            marks,
        }
    }

    /// Build a mention, validating the identifier. Invalid identifiers
    /// yield `None` so callers can degrade to plain text.
    pub fn mention(
        id: impl Into<String>,
        display_name: Option<String>,
    ) -> Option<Self> {
        let id = id.into();
        let kind = matrix_mentions::kind_of_id(&id)?;
        Some(Inline::Mention {
            id,
            kind,
            display_name,
        })
    }

    pub fn emoticon(
        shortcode: impl Into<String>,
        resource_uri: impl Into<String>,
    ) -> Self {
        Inline::Emoticon {
            shortcode: shortcode.into(),
            resource_uri: resource_uri.into(),
        }
    }

    /// Append this node's plain-text contribution to `out`.
    pub(crate) fn push_plain_text(&self, out: &mut String) {
        match self {
            Inline::Text { text, .. } => out.push_str(text),
            Inline::Mention {
                id,
                kind,
                display_name,
            } => match display_name {
                Some(name) => out.push_str(name),
                None => out.push_str(&canonical_display_text(id, *kind)),
            },
            Inline::Emoticon { shortcode, .. } => {
                out.push(':');
                out.push_str(shortcode);
                out.push(':');
            }
            Inline::LineBreak => out.push('\n'),
        }
    }

    /// Length of the plain-text contribution, in characters.
    pub(crate) fn plain_len(&self) -> usize {
        let mut s = String::new();
        self.push_plain_text(&mut s);
        s.chars().count()
    }

    /// Whether the node is atomic for editing purposes: the cursor can sit
    /// before or after it but not inside.
    pub(crate) fn is_atomic(&self) -> bool {
        !matches!(self, Inline::Text { .. })
    }
}

/// A block-level node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    CodeBlock { text: String },
    Quote(Vec<Block>),
    List { ordered: bool, items: Vec<Block> },
}

impl Block {
    pub fn paragraph(children: Vec<Inline>) -> Self {
        Block::Paragraph(children)
    }

    pub fn paragraph_of(text: impl Into<String>) -> Self {
        Block::Paragraph(vec![Inline::text(text)])
    }

    pub fn code_block(text: impl Into<String>) -> Self {
        Block::CodeBlock { text: text.into() }
    }

    pub(crate) fn push_plain_text(&self, out: &mut String) {
        match self {
            Block::Paragraph(children) => {
                for child in children {
                    child.push_plain_text(out);
                }
            }
            Block::CodeBlock { text } => out.push_str(text),
            Block::Quote(children) => push_blocks_plain_text(children, out),
            Block::List { items, .. } => push_blocks_plain_text(items, out),
        }
    }

    pub(crate) fn plain_len(&self) -> usize {
        let mut s = String::new();
        self.push_plain_text(&mut s);
        s.chars().count()
    }
}

/// Append the projection of a block sequence: blocks joined by `\n`.
pub(crate) fn push_blocks_plain_text(blocks: &[Block], out: &mut String) {
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        block.push_plain_text(out);
    }
}

/// Projection length of a block sequence, in characters.
pub(crate) fn blocks_plain_len(blocks: &[Block]) -> usize {
    let mut s = String::new();
    push_blocks_plain_text(blocks, &mut s);
    s.chars().count()
}

/// The in-progress message: an ordered block tree plus the selection.
///
/// Selection offsets are character positions in the plain-text projection,
/// with `start <= position <= plain_len()`. A collapsed selection is the
/// cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub(crate) blocks: Vec<Block>,
    pub(crate) selection_start: usize,
    pub(crate) selection_end: usize,
}

impl Document {
    /// An empty document: one paragraph holding the empty placeholder run.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::Paragraph(vec![Inline::text("")])],
            selection_start: 0,
            selection_end: 0,
        }
    }

    /// Build a document from parsed blocks, cursor at the start.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut doc = Self {
            blocks,
            selection_start: 0,
            selection_end: 0,
        };
        doc.normalize();
        doc
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The untrimmed plain-text projection.
    pub fn plain_text_projection(&self) -> String {
        let mut out = String::new();
        push_blocks_plain_text(&self.blocks, &mut out);
        out
    }

    /// Projection length in characters.
    pub fn plain_len(&self) -> usize {
        blocks_plain_len(&self.blocks)
    }

    /// A document is blank when its projection trims to nothing.
    pub fn is_blank(&self) -> bool {
        self.plain_text_projection().trim().is_empty()
    }

    /// Current selection as (start, end) projection offsets.
    pub fn selection(&self) -> (usize, usize) {
        (self.selection_start, self.selection_end)
    }

    /// Selection start, ensuring start <= end.
    pub(crate) fn sel_start(&self) -> usize {
        self.selection_start.min(self.selection_end)
    }

    /// Selection end, ensuring start <= end.
    pub(crate) fn sel_end(&self) -> usize {
        self.selection_start.max(self.selection_end)
    }

    /// Restore structural invariants after a mutation: adjacent text runs
    /// with equal marks merge, empty runs are dropped, and an empty
    /// document keeps its single placeholder paragraph.
    pub(crate) fn normalize(&mut self) {
        normalize_blocks(&mut self.blocks);
        if self.blocks.is_empty() {
            self.blocks.push(Block::Paragraph(vec![Inline::text("")]));
        }
        let len = self.plain_len();
        self.selection_start = self.selection_start.min(len);
        self.selection_end = self.selection_end.min(len);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_blocks(blocks: &mut Vec<Block>) {
    for block in blocks.iter_mut() {
        match block {
            Block::Paragraph(children) => normalize_inlines(children),
            Block::CodeBlock { .. } => {}
            Block::Quote(children) => normalize_blocks(children),
            Block::List { items, .. } => normalize_blocks(items),
        }
    }
    // A quote or list with no remaining children collapses away.
    blocks.retain(|block| match block {
        Block::Quote(children) => !children.is_empty(),
        Block::List { items, .. } => !items.is_empty(),
        _ => true,
    });
}

fn normalize_inlines(children: &mut Vec<Inline>) {
    children.retain(|child| match child {
        Inline::Text { text, .. } => !text.is_empty(),
        _ => true,
    });
    let mut i = 0;
    while i + 1 < children.len() {
        let merge = match (&children[i], &children[i + 1]) {
            (
                Inline::Text { marks: a, .. },
                Inline::Text { marks: b, .. },
            ) => a == b,
            _ => false,
        };
        if merge {
            if let Inline::Text { text: tail, .. } = children.remove(i + 1) {
                if let Inline::Text { text, .. } = &mut children[i] {
                    text.push_str(&tail);
                }
            }
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> MarkSet {
        MarkSet::default().with(InlineFormat::Bold)
    }

    // ===================================================================
    // Plain-text projection
    // ===================================================================

    #[test]
    fn empty_document_projects_to_nothing() {
        let doc = Document::new();
        assert_eq!(doc.plain_text_projection(), "");
        assert!(doc.is_blank());
    }

    #[test]
    fn paragraphs_join_with_newline() {
        let doc = Document::from_blocks(vec![
            Block::paragraph_of("hello"),
            Block::paragraph_of("world"),
        ]);
        assert_eq!(doc.plain_text_projection(), "hello\nworld");
    }

    #[test]
    fn line_break_projects_to_newline() {
        let doc = Document::from_blocks(vec![Block::Paragraph(vec![
            Inline::text("a"),
            Inline::LineBreak,
            Inline::text("b"),
        ])]);
        assert_eq!(doc.plain_text_projection(), "a\nb");
    }

    #[test]
    fn mention_projects_display_name() {
        let mention =
            Inline::mention("@alice:example.org", Some("Alice".into()))
                .unwrap();
        let doc = Document::from_blocks(vec![Block::Paragraph(vec![
            Inline::text("hi "),
            mention,
        ])]);
        assert_eq!(doc.plain_text_projection(), "hi Alice");
    }

    #[test]
    fn mention_without_display_name_uses_localpart() {
        let mention = Inline::mention("@alice:example.org", None).unwrap();
        let doc = Document::from_blocks(vec![Block::Paragraph(vec![mention])]);
        assert_eq!(doc.plain_text_projection(), "alice");
    }

    #[test]
    fn emoticon_projects_shortcode() {
        let doc = Document::from_blocks(vec![Block::Paragraph(vec![
            Inline::emoticon("wave", "mxc://example.org/abc"),
        ])]);
        assert_eq!(doc.plain_text_projection(), ":wave:");
    }

    #[test]
    fn quote_and_list_children_join_with_newlines() {
        let doc = Document::from_blocks(vec![
            Block::Quote(vec![
                Block::paragraph_of("one"),
                Block::paragraph_of("two"),
            ]),
            Block::List {
                ordered: false,
                items: vec![
                    Block::paragraph_of("a"),
                    Block::paragraph_of("b"),
                ],
            },
        ]);
        assert_eq!(doc.plain_text_projection(), "one\ntwo\na\nb");
    }

    // ===================================================================
    // Mention validation
    // ===================================================================

    #[test]
    fn invalid_mention_id_is_rejected() {
        assert!(Inline::mention("alice", None).is_none());
        assert!(Inline::mention("@alice", None).is_none());
    }

    #[test]
    fn mention_kind_is_derived_from_id() {
        let m = Inline::mention("#general:example.org", None).unwrap();
        assert!(matches!(
            m,
            Inline::Mention {
                kind: MentionKind::RoomAlias,
                ..
            }
        ));
    }

    // ===================================================================
    // Normalization
    // ===================================================================

    #[test]
    fn adjacent_runs_with_same_marks_are_merged() {
        let doc = Document::from_blocks(vec![Block::Paragraph(vec![
            Inline::text_marked("foo", bold()),
            Inline::text_marked("bar", bold()),
        ])]);
        assert_eq!(
            doc.blocks(),
            &[Block::Paragraph(vec![Inline::text_marked("foobar", bold())])]
        );
    }

    #[test]
    fn adjacent_runs_with_different_marks_not_merged() {
        let doc = Document::from_blocks(vec![Block::Paragraph(vec![
            Inline::text_marked("foo", bold()),
            Inline::text("bar"),
        ])]);
        assert_eq!(
            doc.blocks()[0],
            Block::Paragraph(vec![
                Inline::text_marked("foo", bold()),
                Inline::text("bar"),
            ])
        );
    }

    #[test]
    fn empty_runs_are_dropped() {
        let doc = Document::from_blocks(vec![Block::Paragraph(vec![
            Inline::text(""),
            Inline::text("a"),
            Inline::text(""),
        ])]);
        assert_eq!(
            doc.blocks(),
            &[Block::Paragraph(vec![Inline::text("a")])]
        );
    }

    #[test]
    fn empty_block_list_restores_placeholder() {
        let doc = Document::from_blocks(vec![]);
        assert_eq!(doc.blocks().len(), 1);
        assert!(doc.is_blank());
    }

    #[test]
    fn childless_quote_collapses() {
        let doc = Document::from_blocks(vec![
            Block::Quote(vec![]),
            Block::paragraph_of("text"),
        ]);
        assert_eq!(doc.blocks(), &[Block::paragraph_of("text")]);
    }
}
