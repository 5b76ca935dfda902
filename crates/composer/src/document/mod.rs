// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The composed-message document model.
//!
//! [`Document`] owns an ordered tree of [`Block`]s and a cursor/selection
//! expressed in characters of the plain-text projection. One composer
//! session owns exactly one document; all mutation goes through the
//! operation surface in [`ops`].

mod nodes;
mod ops;

pub use nodes::{Block, Document, Inline, InlineFormat, MarkSet};
