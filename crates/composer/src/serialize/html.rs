// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Rendering to the Matrix custom HTML subset.
//!
//! The output vocabulary is fixed: `pre`/`code`, `blockquote`, `ul`/`ol`/
//! `li`, `strong`, `em`, `u`, `del`, `code`, `span data-mx-spoiler`,
//! `a href` for mentions and `img src alt` for emoticons. Paragraphs are
//! not wrapped in `<p>`; consecutive paragraphs are joined by `<br/>` and
//! the trailing separator is trimmed, so an unformatted document renders
//! as its escaped plain text.
//!
//! Text is escaped for the five reserved HTML characters in every
//! text-bearing position, attribute values with attribute escaping.

use matrix_mentions::matrix_to_permalink;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use strum::IntoEnumIterator;

use crate::document::{Block, Document, Inline, InlineFormat, MarkSet};

/// Options controlling how the document renders to custom HTML.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputOptions {
    /// When false, marks render as Markdown punctuation (`**bold**`)
    /// instead of tags, so plain clients see something reasonable.
    pub allow_text_formatting: bool,
    /// When true, paragraph text written in Markdown block syntax (fenced
    /// code, `>` quotes, lists) is recognised and emitted as the
    /// corresponding tags.
    pub allow_block_markdown: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            allow_text_formatting: true,
            allow_block_markdown: false,
        }
    }
}

/// Render the document as Matrix custom HTML.
///
/// Pure and deterministic; never fails.
pub fn to_custom_html(doc: &Document, opts: &OutputOptions) -> String {
    render_blocks(doc.blocks(), opts)
}

fn render_blocks(blocks: &[Block], opts: &OutputOptions) -> String {
    let mut html = String::new();
    for block in blocks {
        push_block_html(&mut html, block, opts);
    }
    strip_trailing_br(&mut html);
    html
}

const BR: &str = "<br/>";

fn strip_trailing_br(html: &mut String) {
    if html.ends_with(BR) {
        html.truncate(html.len() - BR.len());
    }
}

fn push_block_html(html: &mut String, block: &Block, opts: &OutputOptions) {
    match block {
        Block::Paragraph(children) => {
            if opts.allow_block_markdown {
                if let Some(converted) = markdown_block_html(children) {
                    html.push_str(&converted);
                    return;
                }
            }
            for child in children {
                push_inline_html(html, child, opts);
            }
            html.push_str(BR);
        }
        Block::CodeBlock { text } => {
            html.push_str("<pre><code>");
            html.push_str(&html_escape::encode_safe(text));
            html.push_str("</code></pre>");
        }
        Block::Quote(children) => {
            html.push_str("<blockquote>");
            html.push_str(&render_blocks(children, opts));
            html.push_str("</blockquote>");
        }
        Block::List { ordered, items } => {
            html.push_str(if *ordered { "<ol>" } else { "<ul>" });
            for item in items {
                html.push_str("<li>");
                html.push_str(&render_blocks(std::slice::from_ref(item), opts));
                html.push_str("</li>");
            }
            html.push_str(if *ordered { "</ol>" } else { "</ul>" });
        }
    }
}

fn push_inline_html(html: &mut String, inline: &Inline, opts: &OutputOptions) {
    match inline {
        Inline::Text { text, marks } => {
            if opts.allow_text_formatting {
                for format in InlineFormat::iter() {
                    if marks.contains(format) {
                        html.push_str(tag_open(format));
                    }
                }
                html.push_str(&html_escape::encode_safe(text));
                for format in InlineFormat::iter().rev() {
                    if marks.contains(format) {
                        html.push_str(tag_close(format));
                    }
                }
            } else {
                for format in InlineFormat::iter() {
                    if marks.contains(format) {
                        html.push_str(md_punctuation(format));
                    }
                }
                html.push_str(&html_escape::encode_safe(text));
                for format in InlineFormat::iter().rev() {
                    if marks.contains(format) {
                        html.push_str(md_punctuation(format));
                    }
                }
            }
        }
        Inline::Mention {
            id,
            kind,
            display_name,
        } => {
            let uri = matrix_to_permalink(id);
            let display = match display_name {
                Some(name) => name.clone(),
                None => matrix_mentions::canonical_display_text(id, *kind),
            };
            html.push_str("<a href=\"");
            html.push_str(&html_escape::encode_double_quoted_attribute(&uri));
            html.push_str("\">");
            html.push_str(&html_escape::encode_safe(&display));
            html.push_str("</a>");
        }
        Inline::Emoticon {
            shortcode,
            resource_uri,
        } => {
            html.push_str("<img src=\"");
            html.push_str(&html_escape::encode_double_quoted_attribute(
                resource_uri,
            ));
            html.push_str("\" alt=\":");
            html.push_str(&html_escape::encode_double_quoted_attribute(
                shortcode,
            ));
            html.push_str(":\">");
        }
        Inline::LineBreak => html.push_str(BR),
    }
}

fn tag_open(format: InlineFormat) -> &'static str {
    match format {
        InlineFormat::Bold => "<strong>",
        InlineFormat::Italic => "<em>",
        InlineFormat::Underline => "<u>",
        InlineFormat::StrikeThrough => "<del>",
        InlineFormat::InlineCode => "<code>",
        InlineFormat::Spoiler => "<span data-mx-spoiler>",
    }
}

fn tag_close(format: InlineFormat) -> &'static str {
    match format {
        InlineFormat::Bold => "</strong>",
        InlineFormat::Italic => "</em>",
        InlineFormat::Underline => "</u>",
        InlineFormat::StrikeThrough => "</del>",
        InlineFormat::InlineCode => "</code>",
        InlineFormat::Spoiler => "</span>",
    }
}

/// Markdown punctuation used when tags are not allowed. Spoilers have no
/// Markdown form and degrade to plain text.
fn md_punctuation(format: InlineFormat) -> &'static str {
    match format {
        InlineFormat::Bold => "**",
        InlineFormat::Italic => "*",
        InlineFormat::Underline => "__",
        InlineFormat::StrikeThrough => "~~",
        InlineFormat::InlineCode => "`",
        InlineFormat::Spoiler => "",
    }
}

/// Try to render a paragraph written in Markdown block syntax.
///
/// Only attempted for unmarked all-text paragraphs whose first line looks
/// like block syntax, and only for constructs inside the whitelist; any
/// other event falls back to `None` and the paragraph renders literally.
fn markdown_block_html(children: &[Inline]) -> Option<String> {
    let text = plain_paragraph_text(children)?;
    if !looks_like_block_markdown(&text) {
        return None;
    }

    let mut out = String::new();
    let parser =
        Parser::new_ext(&text, Options::ENABLE_STRIKETHROUGH);
    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Paragraph => {}
                Tag::BlockQuote(_) => out.push_str("<blockquote>"),
                Tag::CodeBlock(_) => out.push_str("<pre><code>"),
                Tag::List(Some(_)) => out.push_str("<ol>"),
                Tag::List(None) => out.push_str("<ul>"),
                Tag::Item => out.push_str("<li>"),
                Tag::Emphasis => out.push_str("<em>"),
                Tag::Strong => out.push_str("<strong>"),
                Tag::Strikethrough => out.push_str("<del>"),
                _ => return None,
            },
            Event::End(tag) => match tag {
                TagEnd::Paragraph => out.push_str(BR),
                TagEnd::BlockQuote(_) => {
                    strip_trailing_br(&mut out);
                    out.push_str("</blockquote>");
                }
                TagEnd::CodeBlock => out.push_str("</code></pre>"),
                TagEnd::List(true) => out.push_str("</ol>"),
                TagEnd::List(false) => out.push_str("</ul>"),
                TagEnd::Item => {
                    strip_trailing_br(&mut out);
                    out.push_str("</li>");
                }
                TagEnd::Emphasis => out.push_str("</em>"),
                TagEnd::Strong => out.push_str("</strong>"),
                TagEnd::Strikethrough => out.push_str("</del>"),
                _ => return None,
            },
            Event::Text(text) => {
                out.push_str(&html_escape::encode_safe(text.as_ref()))
            }
            Event::Code(code) => {
                out.push_str("<code>");
                out.push_str(&html_escape::encode_safe(code.as_ref()));
                out.push_str("</code>");
            }
            Event::SoftBreak | Event::HardBreak => out.push_str(BR),
            _ => return None,
        }
    }
    strip_trailing_br(&mut out);
    Some(out)
}

/// The concatenated text of a paragraph that carries no marks or
/// structured inlines, with line breaks as `\n`. `None` otherwise.
fn plain_paragraph_text(children: &[Inline]) -> Option<String> {
    let mut out = String::new();
    for child in children {
        match child {
            Inline::Text { text, marks } if *marks == MarkSet::default() => {
                out.push_str(text)
            }
            Inline::LineBreak => out.push('\n'),
            _ => return None,
        }
    }
    Some(out)
}

fn looks_like_block_markdown(text: &str) -> bool {
    let first = text.lines().next().unwrap_or("");
    first.starts_with("```")
        || first.starts_with("> ")
        || first.starts_with("- ")
        || first.starts_with("* ")
        || first
            .split_once(". ")
            .is_some_and(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}
