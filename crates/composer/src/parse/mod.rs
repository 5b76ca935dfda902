// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Reconstruction of a [`crate::Document`] from stored message content.
//!
//! Both entry points are total: [`from_html`] unwraps anything outside the
//! supported tag subset to its text content and falls back to a single
//! unformatted paragraph on structural failure; [`from_plain_text`]
//! recognises inline Markdown spans and otherwise keeps the text literal.

mod fragment;
mod html;
mod plain;

pub use html::{from_html, try_from_html, HtmlParseError};
pub use plain::from_plain_text;
