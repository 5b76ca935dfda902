// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Plain-text rendering: the document's projection with trailing
//! whitespace removed.
//!
//! This is lossy by design. Marks are dropped, mentions render as their
//! display text and emoticons as `:shortcode:` literals; the result is the
//! `body` a client without HTML support will show.

use crate::document::Document;

/// Render the document as plain text.
///
/// Pure and deterministic; never fails.
pub fn to_plain_text(doc: &Document) -> String {
    let mut out = doc.plain_text_projection();
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out
}
