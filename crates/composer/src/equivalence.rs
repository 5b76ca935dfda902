// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! No-op edit detection.
//!
//! Once a message has a `formatted_body`, that HTML is the source of truth
//! and comparison happens there, byte for byte (after trimming the quoted
//! reply fallback). A message that never had formatting must not be
//! considered changed just because the serializer always produces an HTML
//! rendering: it compares as plain text, provided the new content
//! introduces no markup.

use once_cell::sync::Lazy;
use regex::Regex;

/// Whether saving would replace the message with itself.
///
/// `prev_body`/`prev_html` come from the edited message (its
/// `m.new_content` when it was already edited); `new_plain`/`new_html` are
/// the fresh renderings of the composer document.
pub fn is_noop_edit(
    prev_body: &str,
    prev_html: Option<&str>,
    new_plain: &str,
    new_html: &str,
) -> bool {
    match prev_html {
        Some(prev_html) => {
            trim_reply_from_formatted_body(prev_html) == new_html
        }
        None => {
            prev_body == new_plain
                && custom_html_equals_plain_text(new_html, new_plain)
        }
    }
}

/// True iff `html` is exactly the escaped plain text with `\n` rendered as
/// `<br/>` — i.e. the serializer applied no formatting at all.
pub fn custom_html_equals_plain_text(html: &str, plain: &str) -> bool {
    let mut unformatted = String::with_capacity(plain.len());
    for (i, line) in plain.split('\n').enumerate() {
        if i > 0 {
            unformatted.push_str("<br/>");
        }
        unformatted.push_str(&html_escape::encode_safe(line));
    }
    html == unformatted
}

/// Strip one leading `<mx-reply>…</mx-reply>` block from a formatted body.
pub fn trim_reply_from_formatted_body(html: &str) -> &str {
    static REPLY_BLOCK: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^<mx-reply>[\s\S]*?</mx-reply>").expect("static regex")
    });
    match REPLY_BLOCK.find(html) {
        Some(found) => &html[found.end()..],
        None => html,
    }
}

/// Strip the `> `-quoted reply fallback (and its separating blank line)
/// from the start of a plain-text body.
pub fn trim_reply_from_body(body: &str) -> &str {
    if !body.starts_with("> ") {
        return body;
    }
    let mut rest = body;
    while let Some(stripped) = rest.strip_prefix("> ") {
        rest = match stripped.find('\n') {
            Some(nl) => &stripped[nl + 1..],
            None => "",
        };
    }
    rest.strip_prefix('\n').unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===================================================================
    // Decision table
    // ===================================================================

    #[test]
    fn unchanged_formatted_message_is_noop() {
        assert!(is_noop_edit(
            "hi",
            Some("<strong>hi</strong>"),
            "hi",
            "<strong>hi</strong>",
        ));
    }

    #[test]
    fn changed_formatting_is_not_noop() {
        assert!(!is_noop_edit(
            "hi",
            Some("<strong>hi</strong>"),
            "hi",
            "<em>hi</em>",
        ));
    }

    #[test]
    fn formatted_comparison_ignores_reply_fallback() {
        assert!(is_noop_edit(
            "> quoted\n\nhi",
            Some("<mx-reply><blockquote>quoted</blockquote></mx-reply><strong>hi</strong>"),
            "hi",
            "<strong>hi</strong>",
        ));
    }

    #[test]
    fn unformatted_message_compares_as_plain_text() {
        assert!(is_noop_edit("hi", None, "hi", "hi"));
    }

    #[test]
    fn adding_formatting_to_unformatted_message_is_a_change() {
        assert!(!is_noop_edit("hi", None, "hi", "<strong>hi</strong>"));
    }

    #[test]
    fn changing_plain_text_is_a_change() {
        assert!(!is_noop_edit("hi", None, "hey", "hey"));
        assert!(!is_noop_edit(
            "hi",
            Some("<strong>hi</strong>"),
            "hey",
            "<strong>hey</strong>",
        ));
    }

    // ===================================================================
    // custom_html_equals_plain_text
    // ===================================================================

    #[test]
    fn plain_rendering_matches_itself() {
        assert!(custom_html_equals_plain_text("hi", "hi"));
        assert!(custom_html_equals_plain_text("a<br/>b", "a\nb"));
        assert!(custom_html_equals_plain_text("a &amp; b", "a & b"));
    }

    #[test]
    fn markup_does_not_match_plain() {
        assert!(!custom_html_equals_plain_text("<em>hi</em>", "hi"));
    }

    // ===================================================================
    // Reply trimming
    // ===================================================================

    #[test]
    fn trims_leading_reply_block() {
        assert_eq!(
            trim_reply_from_formatted_body(
                "<mx-reply><blockquote>q</blockquote></mx-reply>rest"
            ),
            "rest"
        );
    }

    #[test]
    fn leaves_bodies_without_reply_untouched() {
        assert_eq!(trim_reply_from_formatted_body("just text"), "just text");
        assert_eq!(
            trim_reply_from_formatted_body("a<mx-reply>mid</mx-reply>b"),
            "a<mx-reply>mid</mx-reply>b"
        );
    }

    #[test]
    fn trims_plain_text_reply_fallback() {
        assert_eq!(
            trim_reply_from_body("> <@a:b.c> quoted\n> more\n\nreply"),
            "reply"
        );
        assert_eq!(trim_reply_from_body("no quote"), "no quote");
    }
}
