// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Conversion from stored custom HTML into the document model.
//!
//! The parse is total. Tags outside the supported subset are unwrapped to
//! their text content, never dropped and never fatal; mention anchors with
//! an identifier that fails validation demote to plain text runs; an input
//! that yields no usable tree at all falls back to one unformatted
//! paragraph holding the literal input.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::fragment::{FragmentDom, FragmentHandle, FragmentNode};
use crate::document::{Block, Document, Inline, InlineFormat, MarkSet};
use matrix_mentions::Mention;

/// Raised by [`try_from_html`] when the input produced no usable tree.
/// [`from_html`] catches this internally and falls back instead.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("could not parse html into a document: {reasons:?}")]
pub struct HtmlParseError {
    pub reasons: Vec<String>,
}

/// Parse custom HTML into a document. Total: never fails.
pub fn from_html(html: &str) -> Document {
    match try_from_html(html) {
        Ok(doc) => doc,
        Err(err) => {
            log::warn!("falling back to a literal paragraph: {err}");
            Document::from_blocks(vec![Block::paragraph_of(html)])
        }
    }
}

/// Parse custom HTML into a document, reporting structural failure.
///
/// Failure means the tree came out blank even though the input has
/// non-whitespace text content; anything else parses best-effort.
pub fn try_from_html(html: &str) -> Result<Document, HtmlParseError> {
    static META_TAG: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"<meta[^>]*>").expect("static regex"));
    let cleaned = META_TAG.replace_all(html, "");

    let dom = FragmentDom::parse(&cleaned);
    for notice in &dom.parse_errors {
        log::debug!("html parse notice: {notice}");
    }

    let mut collector = BlockCollector::default();
    walk(&dom, &dom.document_handle(), MarkSet::default(), &mut collector);
    let blocks = collector.finish();

    let doc = Document::from_blocks(blocks);
    if doc.is_blank() && has_visible_text(&dom) {
        return Err(HtmlParseError {
            reasons: dom.parse_errors.clone(),
        });
    }
    Ok(doc)
}

/// Whether the parsed tree contains any non-whitespace text at all.
fn has_visible_text(dom: &FragmentDom) -> bool {
    fn visit(dom: &FragmentDom, handle: &FragmentHandle) -> bool {
        match dom.get(handle) {
            FragmentNode::Text(content) => !content.trim().is_empty(),
            FragmentNode::Element(el) => {
                el.children.iter().any(|c| visit(dom, c))
            }
            FragmentNode::Document(children) => {
                children.iter().any(|c| visit(dom, c))
            }
            FragmentNode::Ignored => false,
        }
    }
    visit(dom, &dom.document_handle())
}

/// Accumulates blocks while inline content gathers into a pending
/// paragraph.
#[derive(Default)]
struct BlockCollector {
    blocks: Vec<Block>,
    inline: Vec<Inline>,
}

impl BlockCollector {
    fn push_inline(&mut self, inline: Inline) {
        self.inline.push(inline);
    }

    fn flush_paragraph(&mut self) {
        if !self.inline.is_empty() {
            self.blocks
                .push(Block::Paragraph(std::mem::take(&mut self.inline)));
        }
    }

    fn push_block(&mut self, block: Block) {
        self.flush_paragraph();
        self.blocks.push(block);
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_paragraph();
        self.blocks
    }
}

fn walk(
    dom: &FragmentDom,
    handle: &FragmentHandle,
    marks: MarkSet,
    collector: &mut BlockCollector,
) {
    match dom.get(handle) {
        FragmentNode::Document(children) => {
            for child in children {
                walk(dom, child, marks, collector);
            }
        }
        FragmentNode::Text(content) => {
            push_text(content, marks, collector);
        }
        FragmentNode::Element(el) => {
            walk_element(dom, handle, el.tag(), marks, collector)
        }
        FragmentNode::Ignored => {}
    }
}

fn push_text(content: &str, marks: MarkSet, collector: &mut BlockCollector) {
    // Newlines between tags are formatting whitespace, not content.
    if content.contains('\n') && content.trim().is_empty() {
        return;
    }
    let text = content.replace(['\n', '\t'], " ");
    collector.push_inline(Inline::text_marked(text, marks));
}

fn walk_element(
    dom: &FragmentDom,
    handle: &FragmentHandle,
    tag: &str,
    marks: MarkSet,
    collector: &mut BlockCollector,
) {
    let children = match dom.get(handle) {
        FragmentNode::Element(el) => &el.children,
        _ => return,
    };
    let element = match dom.get(handle) {
        FragmentNode::Element(el) => el,
        _ => return,
    };

    match tag {
        "strong" | "b" => {
            walk_children(dom, children, marks.with(InlineFormat::Bold), collector)
        }
        "em" | "i" => walk_children(
            dom,
            children,
            marks.with(InlineFormat::Italic),
            collector,
        ),
        "u" => walk_children(
            dom,
            children,
            marks.with(InlineFormat::Underline),
            collector,
        ),
        "del" | "s" | "strike" => walk_children(
            dom,
            children,
            marks.with(InlineFormat::StrikeThrough),
            collector,
        ),
        "code" => walk_children(
            dom,
            children,
            marks.with(InlineFormat::InlineCode),
            collector,
        ),
        "span" => {
            if element.get_attr("data-mx-spoiler").is_some() {
                walk_children(
                    dom,
                    children,
                    marks.with(InlineFormat::Spoiler),
                    collector,
                );
            } else {
                log::debug!("unwrapping plain <span>");
                walk_children(dom, children, marks, collector);
            }
        }
        "br" => collector.push_inline(Inline::LineBreak),
        "p" | "div" => {
            collector.flush_paragraph();
            let inner = collect_blocks(dom, children, marks);
            for block in inner {
                collector.push_block(block);
            }
            // an empty <p> is still a paragraph boundary
            if children.is_empty() {
                collector.push_block(Block::Paragraph(Vec::new()));
            }
        }
        "blockquote" => {
            let inner = collect_blocks(dom, children, marks);
            collector.push_block(Block::Quote(inner));
        }
        "pre" => {
            let mut text = String::new();
            collect_preformatted_text(dom, children, &mut text);
            collector.push_block(Block::CodeBlock { text });
        }
        "ul" | "ol" => {
            let mut items = Vec::new();
            for child in children {
                match dom.get(child) {
                    FragmentNode::Element(el) if el.tag() == "li" => {
                        let inner =
                            collect_blocks(dom, &el.children, marks);
                        if inner.is_empty() {
                            items.push(Block::Paragraph(Vec::new()));
                        } else {
                            // multi-block items flatten; item boundaries
                            // stay per block
                            items.extend(inner);
                        }
                    }
                    _ => {
                        log::debug!("non-<li> child inside a list");
                        items.extend(collect_blocks(
                            dom,
                            std::slice::from_ref(child),
                            marks,
                        ));
                    }
                }
            }
            collector.push_block(Block::List {
                ordered: tag == "ol",
                items,
            });
        }
        "a" => {
            let href = element.get_attr("href").unwrap_or_default();
            let anchor_text = collect_text(dom, children);
            match Mention::from_uri_with_display_text(href, &anchor_text) {
                Some(mention) if !anchor_text.is_empty() => {
                    collector.push_inline(Inline::Mention {
                        id: mention.mx_id().to_owned(),
                        kind: mention.kind(),
                        display_name: Some(
                            mention.display_text().to_owned(),
                        ),
                    });
                }
                _ => {
                    // plain links and invalid mention hrefs keep their text
                    log::debug!("demoting <a href={href:?}> to text");
                    walk_children(dom, children, marks, collector);
                }
            }
        }
        "img" => {
            let src = element.get_attr("src").unwrap_or_default();
            let alt = element.get_attr("alt").unwrap_or_default();
            let shortcode = alt.trim_matches(':');
            if !src.is_empty() && !shortcode.is_empty() {
                collector
                    .push_inline(Inline::emoticon(shortcode, src));
            } else if !alt.is_empty() {
                collector.push_inline(Inline::text_marked(alt, marks));
            } else {
                log::debug!("dropping <img> with no alt text");
            }
        }
        "mx-reply" => {
            // quoted-reply fallback is not part of the edited content
        }
        "html" | "body" => walk_children(dom, children, marks, collector),
        other => {
            log::debug!("unwrapping unsupported tag <{other}>");
            walk_children(dom, children, marks, collector);
        }
    }
}

fn walk_children(
    dom: &FragmentDom,
    children: &[FragmentHandle],
    marks: MarkSet,
    collector: &mut BlockCollector,
) {
    for child in children {
        walk(dom, child, marks, collector);
    }
}

/// Convert a child list in its own collector, yielding finished blocks.
fn collect_blocks(
    dom: &FragmentDom,
    children: &[FragmentHandle],
    marks: MarkSet,
) -> Vec<Block> {
    let mut collector = BlockCollector::default();
    walk_children(dom, children, marks, &mut collector);
    collector.finish()
}

/// All descendant text, markup stripped.
fn collect_text(dom: &FragmentDom, children: &[FragmentHandle]) -> String {
    let mut out = String::new();
    fn visit(dom: &FragmentDom, handle: &FragmentHandle, out: &mut String) {
        match dom.get(handle) {
            FragmentNode::Text(content) => out.push_str(content),
            FragmentNode::Element(el) => {
                for child in &el.children {
                    visit(dom, child, out);
                }
            }
            _ => {}
        }
    }
    for child in children {
        visit(dom, child, &mut out);
    }
    out
}

/// Text inside `<pre>`: newlines are content, `<br/>` becomes `\n`, an
/// inner `<code>` wrapper is transparent.
fn collect_preformatted_text(
    dom: &FragmentDom,
    children: &[FragmentHandle],
    out: &mut String,
) {
    for child in children {
        match dom.get(child) {
            FragmentNode::Text(content) => out.push_str(content),
            FragmentNode::Element(el) if el.tag() == "br" => {
                out.push('\n');
            }
            FragmentNode::Element(el) => {
                collect_preformatted_text(dom, &el.children, out);
            }
            _ => {}
        }
    }
}
