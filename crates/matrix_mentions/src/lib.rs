// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Utilities for Matrix mentions.
//!
//! A [`Mention`] is a validated reference to a user or room, carrying the
//! permalink it was parsed from (or built for), the Matrix identifier it
//! refers to and the text to display in its place. Identifiers are validated
//! with `ruma-common`; anything that fails validation is rejected here so
//! that callers can degrade it to plain text instead.

use ruma_common::matrix_uri::{MatrixId, MatrixToUri};
use ruma_common::{RoomAliasId, RoomId, UserId};

/// The kind of entity a mention refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MentionKind {
    User,
    Room,
    RoomAlias,
}

/// A validated mention of a user or room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mention {
    uri: String,
    mx_id: String,
    display_text: String,
    kind: MentionKind,
}

impl Mention {
    fn new(
        uri: String,
        mx_id: String,
        display_text: String,
        kind: MentionKind,
    ) -> Self {
        Self {
            uri,
            mx_id,
            display_text,
            kind,
        }
    }

    /// The permalink for this mention, e.g. `https://matrix.to/#/@alice:example.org`.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The Matrix identifier, e.g. `@alice:example.org` or `#room:example.org`.
    pub fn mx_id(&self) -> &str {
        &self.mx_id
    }

    /// The text to display in place of the mention.
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn kind(&self) -> MentionKind {
        self.kind
    }

    /// Parse a mention from a permalink, using the canonical display text
    /// for the identifier it contains.
    ///
    /// Returns `None` if the URI is not a valid user/room permalink.
    pub fn from_uri(uri: &str) -> Option<Mention> {
        Self::parse_uri(uri, None)
    }

    /// Parse a mention from a permalink, keeping the display text the
    /// source document carried (e.g. the anchor text of an `<a>` tag).
    pub fn from_uri_with_display_text(
        uri: &str,
        display_text: &str,
    ) -> Option<Mention> {
        Self::parse_uri(uri, Some(display_text))
    }

    /// Build a mention from a bare Matrix identifier, deriving the
    /// `matrix.to` permalink from it.
    ///
    /// Returns `None` if the identifier is not a valid user ID, room ID or
    /// room alias.
    pub fn from_mx_id(mx_id: &str, display_text: Option<&str>) -> Option<Mention> {
        let kind = kind_of_id(mx_id)?;
        let display = display_text
            .map(str::to_owned)
            .unwrap_or_else(|| canonical_display_text(mx_id, kind));
        Some(Mention::new(
            matrix_to_permalink(mx_id),
            mx_id.to_owned(),
            display,
            kind,
        ))
    }

    /// Whether a URI is a valid user or room permalink.
    pub fn is_valid_uri(uri: &str) -> bool {
        parse_matrix_id(uri).is_some()
    }

    fn parse_uri(uri: &str, display_text: Option<&str>) -> Option<Mention> {
        let (mx_id, kind) = parse_matrix_id(uri)?;
        let display = display_text
            .map(str::to_owned)
            .unwrap_or_else(|| canonical_display_text(&mx_id, kind));
        Some(Mention::new(uri.to_owned(), mx_id, display, kind))
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "custom-matrix-urls")] {
        /// Parse the Matrix identifier out of a `matrix.to` permalink or a
        /// `matrix:` scheme URI.
        fn matrix_id_of(uri: &str) -> Option<MatrixId> {
            if let Ok(parsed) = MatrixToUri::parse(uri) {
                return Some(parsed.id().clone());
            }
            let parsed = ruma_common::matrix_uri::MatrixUri::parse(uri).ok()?;
            Some(parsed.id().clone())
        }
    } else {
        /// Parse the Matrix identifier out of a `matrix.to` permalink.
        fn matrix_id_of(uri: &str) -> Option<MatrixId> {
            Some(MatrixToUri::parse(uri).ok()?.id().clone())
        }
    }
}

/// Extract and validate the Matrix identifier embedded in a permalink.
///
/// Event permalinks are not mentions and are rejected.
fn parse_matrix_id(uri: &str) -> Option<(String, MentionKind)> {
    match matrix_id_of(uri)? {
        MatrixId::User(user) => {
            Some((user.as_str().to_owned(), MentionKind::User))
        }
        MatrixId::Room(room) => {
            Some((room.as_str().to_owned(), MentionKind::Room))
        }
        MatrixId::RoomAlias(alias) => {
            Some((alias.as_str().to_owned(), MentionKind::RoomAlias))
        }
        _ => None,
    }
}

/// The canonical display form of an identifier: the localpart for users,
/// the identifier itself for rooms and aliases.
pub fn canonical_display_text(mx_id: &str, kind: MentionKind) -> String {
    match kind {
        MentionKind::User => UserId::parse(mx_id)
            .map(|user| user.localpart().to_owned())
            .unwrap_or_else(|_| mx_id.to_owned()),
        MentionKind::Room | MentionKind::RoomAlias => mx_id.to_owned(),
    }
}

/// Build a `matrix.to` permalink for a bare identifier.
pub fn matrix_to_permalink(mx_id: &str) -> String {
    format!("https://matrix.to/#/{mx_id}")
}

/// Determine the mention kind of a bare identifier, validating it.
pub fn kind_of_id(mx_id: &str) -> Option<MentionKind> {
    if is_user_id(mx_id) {
        Some(MentionKind::User)
    } else if is_room_id(mx_id) {
        Some(MentionKind::Room)
    } else if is_room_alias_id(mx_id) {
        Some(MentionKind::RoomAlias)
    } else {
        None
    }
}

pub fn is_user_id(id: &str) -> bool {
    UserId::parse(id).is_ok()
}

pub fn is_room_id(id: &str) -> bool {
    RoomId::parse(id).is_ok()
}

pub fn is_room_alias_id(id: &str) -> bool {
    RoomAliasId::parse(id).is_ok()
}
