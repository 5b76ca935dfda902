// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Derivation of the `m.mentions` set from the document.
//!
//! Only mentions sitting in top-level paragraphs count: content quoted
//! from another message (and anything else nested in quotes or lists)
//! carries that message's mentions, not this one's.

use std::collections::BTreeSet;

use matrix_mentions::MentionKind;

use crate::document::{Block, Document, Inline};

/// The intentional mentions of the composed message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MentionsState {
    pub user_ids: BTreeSet<String>,
    pub room: bool,
}

/// Walk the document and collect the mentions to declare.
///
/// Self-mentions are always excluded, duplicates collapse, and a room or
/// alias mention equal to `room_canonical_id` raises the room flag.
/// Identifiers that fail user-ID validation are skipped silently.
pub fn extract_mentions(
    doc: &Document,
    self_id: &str,
    room_canonical_id: &str,
) -> MentionsState {
    let mut state = MentionsState::default();
    for block in doc.blocks() {
        let Block::Paragraph(children) = block else {
            continue;
        };
        for child in children {
            let Inline::Mention { id, kind, .. } = child else {
                continue;
            };
            match kind {
                MentionKind::Room | MentionKind::RoomAlias => {
                    if id == room_canonical_id {
                        state.room = true;
                    }
                }
                MentionKind::User => {
                    if id != self_id && matrix_mentions::is_user_id(id) {
                        state.user_ids.insert(id.clone());
                    }
                }
            }
        }
    }
    state
}
