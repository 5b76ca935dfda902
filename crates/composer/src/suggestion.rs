// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Autocomplete trigger detection at the cursor.
//!
//! Stateless: every invocation looks only at the current document and
//! offset, so the caller simply re-runs it after each cursor-affecting
//! edit. A trigger prefix only counts at a word boundary, which keeps
//! email-like strings (`foo@bar`) from opening a mention popup.

use crate::document::Document;

/// Which trigger matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatternKey {
    /// `@` — user mention.
    At,
    /// `#` — room mention.
    Hash,
    /// `:` — emoticon shortcode.
    Colon,
}

/// A configured trigger prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trigger {
    pub prefix: char,
    pub key: PatternKey,
}

/// The built-in trigger table, in priority order.
pub const DEFAULT_TRIGGERS: [Trigger; 3] = [
    Trigger {
        prefix: '@',
        key: PatternKey::At,
    },
    Trigger {
        prefix: '#',
        key: PatternKey::Hash,
    },
    Trigger {
        prefix: ':',
        key: PatternKey::Colon,
    },
];

/// An active suggestion: the matched trigger, the partial query typed so
/// far, and the projection range the suggestion replaces (prefix
/// included).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionPattern {
    pub key: PatternKey,
    pub query: String,
    pub start: usize,
    pub end: usize,
}

/// Detect a trigger in the word the cursor sits in.
///
/// `cursor_offset` is a character offset into the plain-text projection;
/// it is clamped to the projection length.
pub fn detect_suggestion(
    doc: &Document,
    cursor_offset: usize,
    triggers: &[Trigger],
) -> Option<SuggestionPattern> {
    let projection = doc.plain_text_projection();
    let chars: Vec<char> = projection.chars().collect();
    let cursor = cursor_offset.min(chars.len());

    let mut word_start = cursor;
    while word_start > 0 && !is_boundary(chars[word_start - 1]) {
        word_start -= 1;
    }
    if word_start == cursor {
        return None;
    }

    let first = chars[word_start];
    let trigger = triggers.iter().find(|t| t.prefix == first)?;

    // The prefix itself must sit at a boundary; checked above because the
    // scan stopped at `word_start`, so the preceding char (if any) is one.
    let query: String = chars[word_start + 1..cursor].iter().collect();
    Some(SuggestionPattern {
        key: trigger.key,
        query,
        start: word_start,
        end: cursor,
    })
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace()
}
