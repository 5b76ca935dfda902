// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Model code for the message-edit composer of a Matrix client.
//!
//! The composer core is a tree document model plus the conversions and
//! decisions that surround it when a previously sent message is edited:
//!
//! - [`Document`] — the in-progress message being composed.
//! - [`serialize`] — rendering to plain text and to the Matrix custom HTML
//!   subset.
//! - [`parse`] — reconstructing a [`Document`] from stored message content
//!   (HTML or plain text), totally: any input yields some document.
//! - [`equivalence`] — deciding whether an edit changes anything worth
//!   sending.
//! - [`mentions`] — deriving the `m.mentions` set from the document.
//! - [`suggestion`] — detecting an active autocomplete trigger at the
//!   cursor.
//! - [`edit_payload`] — assembling (or suppressing) the `m.replace` payload.
//!
//! Everything here is synchronous and pure; the visual editor, autocomplete
//! UI and network transport live outside this crate and drive it through
//! these APIs.

pub mod document;
pub mod edit_payload;
pub mod equivalence;
pub mod mentions;
pub mod parse;
pub mod serialize;
pub mod suggestion;

pub use document::{Block, Document, Inline, InlineFormat, MarkSet};
pub use edit_payload::{
    EditOutcome, EditPayload, EditPayloadBuilder, EditPayloadError,
    EditTarget, MessageContent,
};
pub use equivalence::{
    custom_html_equals_plain_text, is_noop_edit, trim_reply_from_body,
    trim_reply_from_formatted_body,
};
pub use matrix_mentions::MentionKind;
pub use mentions::{extract_mentions, MentionsState};
pub use parse::{from_html, from_plain_text};
pub use serialize::{to_custom_html, to_plain_text, OutputOptions};
pub use suggestion::{
    detect_suggestion, PatternKey, SuggestionPattern, Trigger,
    DEFAULT_TRIGGERS,
};
