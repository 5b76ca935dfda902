// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Serialization of the document model to the two Matrix wire formats:
//! plain text (the `body` fallback) and the custom HTML subset
//! (`formatted_body`).

mod html;
mod plain;

pub use html::{to_custom_html, OutputOptions};
pub use plain::to_plain_text;
