// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Conversion from a plain-text body into the document model.
//!
//! Each line becomes a paragraph. A lightweight inline-Markdown pass
//! reconstructs bold/italic/strikethrough/code spans, since those survive
//! a plain-text round trip as punctuation; anything block-shaped or
//! otherwise unexpected keeps the line literal. Mentions cannot survive
//! plain text and stay literal text.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::document::{Block, Document, Inline, InlineFormat, MarkSet};

/// Parse a plain-text body into a document. Total: never fails.
pub fn from_plain_text(text: &str) -> Document {
    let blocks = text
        .split('\n')
        .map(|line| Block::Paragraph(parse_inline_markdown(line)))
        .collect();
    Document::from_blocks(blocks)
}

/// Recognise inline Markdown spans in a single line. Returns the line as
/// one literal run when anything outside plain emphasis/code shows up.
fn parse_inline_markdown(line: &str) -> Vec<Inline> {
    if line.is_empty() {
        return Vec::new();
    }

    let mut inlines = Vec::new();
    let mut marks = MarkSet::default();
    let parser = Parser::new_ext(line, Options::ENABLE_STRIKETHROUGH);
    for event in parser {
        match event {
            Event::Start(Tag::Paragraph) | Event::End(TagEnd::Paragraph) => {}
            Event::Start(Tag::Emphasis) => marks.italic = true,
            Event::End(TagEnd::Emphasis) => marks.italic = false,
            Event::Start(Tag::Strong) => marks.bold = true,
            Event::End(TagEnd::Strong) => marks.bold = false,
            Event::Start(Tag::Strikethrough) => marks.strike_through = true,
            Event::End(TagEnd::Strikethrough) => {
                marks.strike_through = false
            }
            Event::Text(text) => {
                inlines.push(Inline::text_marked(text.as_ref(), marks))
            }
            Event::Code(code) => inlines.push(Inline::text_marked(
                code.as_ref(),
                marks.with(InlineFormat::InlineCode),
            )),
            _ => {
                // block syntax or anything exotic: keep the line as typed
                return vec![Inline::text(line)];
            }
        }
    }
    inlines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::to_plain_text;

    fn marks_of(inline: &Inline) -> MarkSet {
        match inline {
            Inline::Text { marks, .. } => *marks,
            _ => panic!("expected a text run"),
        }
    }

    #[test]
    fn plain_line_is_one_run() {
        let doc = from_plain_text("just words");
        assert_eq!(
            doc.blocks(),
            &[Block::paragraph_of("just words")]
        );
    }

    #[test]
    fn lines_become_paragraphs() {
        let doc = from_plain_text("one\ntwo");
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(to_plain_text(&doc), "one\ntwo");
    }

    #[test]
    fn bold_span_is_recognised() {
        let doc = from_plain_text("say **loudly** please");
        let Block::Paragraph(children) = &doc.blocks()[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(children.len(), 3);
        assert!(marks_of(&children[1]).bold);
        assert_eq!(to_plain_text(&doc), "say loudly please");
    }

    #[test]
    fn italic_and_code_spans_are_recognised() {
        let doc = from_plain_text("*em* and `code`");
        let Block::Paragraph(children) = &doc.blocks()[0] else {
            panic!("expected paragraph");
        };
        assert!(marks_of(&children[0]).italic);
        assert!(marks_of(children.last().unwrap()).inline_code);
    }

    #[test]
    fn strikethrough_span_is_recognised() {
        let doc = from_plain_text("~~gone~~");
        let Block::Paragraph(children) = &doc.blocks()[0] else {
            panic!("expected paragraph");
        };
        assert!(marks_of(&children[0]).strike_through);
    }

    #[test]
    fn block_syntax_stays_literal() {
        let doc = from_plain_text("- not a list item");
        assert_eq!(
            doc.blocks(),
            &[Block::paragraph_of("- not a list item")]
        );
    }

    #[test]
    fn mention_like_text_stays_literal() {
        let doc = from_plain_text("hi @alice:example.org");
        assert_eq!(
            doc.blocks(),
            &[Block::paragraph_of("hi @alice:example.org")]
        );
    }

    #[test]
    fn empty_line_is_empty_paragraph() {
        let doc = from_plain_text("a\n\nb");
        assert_eq!(doc.blocks().len(), 3);
        assert_eq!(to_plain_text(&doc), "a\n\nb");
    }

    #[test]
    fn empty_input_is_blank() {
        assert!(from_plain_text("").is_blank());
    }
}
