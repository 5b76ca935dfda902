// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Construction of the `m.replace` edit payload.
//!
//! [`EditPayloadBuilder::build`] is the save path: it renders both wire
//! formats, suppresses empty and no-op edits as [`EditOutcome::Skipped`],
//! and otherwise assembles the full payload. Nothing is cached between
//! calls — the document may have changed, so every save decision is
//! recomputed from scratch. The only failure is structural: an edit
//! target without an event id cannot be referenced by `m.relates_to`.

use serde::Serialize;
use thiserror::Error;

use crate::document::Document;
use crate::equivalence::{custom_html_equals_plain_text, is_noop_edit};
use crate::mentions::{extract_mentions, MentionsState};
use crate::serialize::{to_custom_html, to_plain_text, OutputOptions};

pub const FORMAT_CUSTOM_HTML: &str = "org.matrix.custom.html";
pub const REL_TYPE_REPLACE: &str = "m.replace";

/// The message being edited: the baseline for equivalence comparison and
/// the reference for `m.relates_to`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditTarget {
    pub event_id: String,
    pub msgtype: String,
    pub body: String,
    pub formatted_body: Option<String>,
}

impl EditTarget {
    pub fn new(
        event_id: impl Into<String>,
        msgtype: impl Into<String>,
        body: impl Into<String>,
        formatted_body: Option<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            msgtype: msgtype.into(),
            body: body.into(),
            formatted_body,
        }
    }

    /// Build a target from raw event content. When the event was already
    /// edited, its `m.new_content` is the real baseline and takes
    /// precedence over the top-level fields.
    pub fn from_event_content(
        event_id: impl Into<String>,
        content: &serde_json::Value,
    ) -> Option<Self> {
        let content = content.get("m.new_content").unwrap_or(content);
        let msgtype = content.get("msgtype")?.as_str()?.to_owned();
        let body = content.get("body")?.as_str()?.to_owned();
        let formatted_body = content
            .get("formatted_body")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
        Some(Self {
            event_id: event_id.into(),
            msgtype,
            body,
            formatted_body,
        })
    }
}

/// `m.mentions` as it goes on the wire: both keys are omitted when they
/// carry nothing.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct MentionsContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<bool>,
}

impl From<&MentionsState> for MentionsContent {
    fn from(state: &MentionsState) -> Self {
        Self {
            user_ids: if state.user_ids.is_empty() {
                None
            } else {
                Some(state.user_ids.iter().cloned().collect())
            },
            room: state.room.then_some(true),
        }
    }
}

/// Message content as sent in `m.new_content` (and mirrored, with the
/// fallback-prefixed body, at the top level of the payload).
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct MessageContent {
    pub msgtype: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
    #[serde(rename = "m.mentions")]
    pub mentions: MentionsContent,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RelatesTo {
    pub rel_type: String,
    pub event_id: String,
}

impl RelatesTo {
    fn replace(event_id: &str) -> Self {
        Self {
            rel_type: REL_TYPE_REPLACE.to_owned(),
            event_id: event_id.to_owned(),
        }
    }
}

/// The complete edit event content.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct EditPayload {
    #[serde(flatten)]
    pub content: MessageContent,
    #[serde(rename = "m.new_content")]
    pub new_content: MessageContent,
    #[serde(rename = "m.relates_to")]
    pub relates_to: RelatesTo,
}

impl EditPayload {
    /// The payload as the JSON value handed to the transport layer.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .expect("payload serialization is infallible")
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EditPayloadError {
    /// The edit target carries no event id, so `m.relates_to` cannot be
    /// built. The document is untouched; the caller may retry.
    #[error("edit target has no event id")]
    MissingEventId,
}

/// Result of a save attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// The payload to send.
    Built(EditPayload),
    /// Nothing worth sending: the composer is blank or the content is
    /// unchanged. Not an error; the caller no-ops silently.
    Skipped,
    /// A structural precondition failed; surfaced to the user, with the
    /// document kept for retry.
    Failed(EditPayloadError),
}

/// Builds (or suppresses) the edit payload for one target message.
///
/// The builder holds no state derived from any document: `build` can run
/// any number of times against an evolving document and each call decides
/// afresh.
#[derive(Clone, Debug)]
pub struct EditPayloadBuilder<'a> {
    target: &'a EditTarget,
    self_id: &'a str,
    room_canonical_id: &'a str,
    markdown: bool,
}

impl<'a> EditPayloadBuilder<'a> {
    pub fn new(
        target: &'a EditTarget,
        self_id: &'a str,
        room_canonical_id: &'a str,
    ) -> Self {
        Self {
            target,
            self_id,
            room_canonical_id,
            markdown: false,
        }
    }

    /// Enable Markdown block recognition in the HTML rendering.
    pub fn markdown(mut self, enabled: bool) -> Self {
        self.markdown = enabled;
        self
    }

    pub fn build(&self, doc: &Document) -> EditOutcome {
        let plain = to_plain_text(doc);
        let html = to_custom_html(
            doc,
            &OutputOptions {
                allow_text_formatting: true,
                allow_block_markdown: self.markdown,
            },
        );

        if plain.trim().is_empty() {
            log::debug!("skipping edit: composer is blank");
            return EditOutcome::Skipped;
        }

        if is_noop_edit(
            &self.target.body,
            self.target.formatted_body.as_deref(),
            &plain,
            &html,
        ) {
            log::debug!("skipping edit: content unchanged");
            return EditOutcome::Skipped;
        }

        if self.target.event_id.is_empty() {
            return EditOutcome::Failed(EditPayloadError::MissingEventId);
        }

        let mentions: MentionsContent = (&extract_mentions(
            doc,
            self.self_id,
            self.room_canonical_id,
        ))
            .into();

        let formatted = !custom_html_equals_plain_text(&html, &plain);
        let new_content = MessageContent {
            msgtype: self.target.msgtype.clone(),
            body: plain.clone(),
            format: formatted.then(|| FORMAT_CUSTOM_HTML.to_owned()),
            formatted_body: formatted.then(|| html.clone()),
            mentions,
        };
        let content = MessageContent {
            body: format!("* {plain}"),
            ..new_content.clone()
        };

        EditOutcome::Built(EditPayload {
            content,
            new_content,
            relates_to: RelatesTo::replace(&self.target.event_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Inline};
    use serde_json::json;

    const SELF_ID: &str = "@me:example.org";
    const ROOM_ID: &str = "#general:example.org";

    fn target_plain(body: &str) -> EditTarget {
        EditTarget::new("$event:example.org", "m.text", body, None)
    }

    fn target_formatted(body: &str, html: &str) -> EditTarget {
        EditTarget::new(
            "$event:example.org",
            "m.text",
            body,
            Some(html.to_owned()),
        )
    }

    fn doc_with(text: &str) -> Document {
        let mut doc = Document::new();
        doc.insert_text(text);
        doc
    }

    fn build(target: &EditTarget, doc: &Document) -> EditOutcome {
        EditPayloadBuilder::new(target, SELF_ID, ROOM_ID).build(doc)
    }

    // ===================================================================
    // Skip and failure paths
    // ===================================================================

    #[test]
    fn blank_document_is_skipped() {
        let target = target_plain("hi");
        assert_eq!(build(&target, &Document::new()), EditOutcome::Skipped);
        assert_eq!(build(&target, &doc_with("   ")), EditOutcome::Skipped);
    }

    #[test]
    fn unchanged_plain_message_is_skipped() {
        let target = target_plain("hi");
        assert_eq!(build(&target, &doc_with("hi")), EditOutcome::Skipped);
    }

    #[test]
    fn unchanged_formatted_message_is_skipped() {
        let target = target_formatted("hi", "<strong>hi</strong>");
        let doc = Document::from_blocks(vec![crate::Block::Paragraph(vec![
            Inline::text_marked(
                "hi",
                crate::MarkSet::default().with(crate::InlineFormat::Bold),
            ),
        ])]);
        assert_eq!(build(&target, &doc), EditOutcome::Skipped);
    }

    #[test]
    fn missing_event_id_fails_structurally() {
        let target = EditTarget::new("", "m.text", "hi", None);
        assert_eq!(
            build(&target, &doc_with("hey")),
            EditOutcome::Failed(EditPayloadError::MissingEventId)
        );
    }

    #[test]
    fn blank_document_with_missing_event_id_still_skips() {
        let target = EditTarget::new("", "m.text", "hi", None);
        assert_eq!(build(&target, &Document::new()), EditOutcome::Skipped);
    }

    // ===================================================================
    // Built payloads
    // ===================================================================

    #[test]
    fn changed_text_builds_payload() {
        let target = target_plain("hi");
        let EditOutcome::Built(payload) = build(&target, &doc_with("hey"))
        else {
            panic!("expected Built");
        };
        assert_eq!(payload.content.body, "* hey");
        assert_eq!(payload.new_content.body, "hey");
        assert_eq!(payload.new_content.msgtype, "m.text");
        assert_eq!(payload.relates_to.rel_type, "m.replace");
        assert_eq!(payload.relates_to.event_id, "$event:example.org");
    }

    #[test]
    fn unformatted_content_omits_formatted_body() {
        let target = target_plain("hi");
        let EditOutcome::Built(payload) = build(&target, &doc_with("hey"))
        else {
            panic!("expected Built");
        };
        assert_eq!(payload.new_content.format, None);
        assert_eq!(payload.new_content.formatted_body, None);
    }

    #[test]
    fn formatted_content_carries_custom_html() {
        let target = target_plain("hi");
        let doc = Document::from_blocks(vec![crate::Block::Paragraph(vec![
            Inline::text_marked(
                "hey",
                crate::MarkSet::default().with(crate::InlineFormat::Bold),
            ),
        ])]);
        let EditOutcome::Built(payload) = build(&target, &doc) else {
            panic!("expected Built");
        };
        assert_eq!(
            payload.new_content.format.as_deref(),
            Some("org.matrix.custom.html")
        );
        assert_eq!(
            payload.new_content.formatted_body.as_deref(),
            Some("<strong>hey</strong>")
        );
    }

    #[test]
    fn mentions_populate_the_wire_field() {
        let target = target_plain("hi");
        let mut doc = doc_with("ping ");
        doc.insert_node(
            Inline::mention("@alice:example.org", Some("Alice".into()))
                .unwrap(),
        );
        let EditOutcome::Built(payload) = build(&target, &doc) else {
            panic!("expected Built");
        };
        assert_eq!(
            payload.new_content.mentions.user_ids,
            Some(vec!["@alice:example.org".to_owned()])
        );
        assert_eq!(payload.new_content.mentions.room, None);
    }

    #[test]
    fn payload_serializes_with_exact_field_names() {
        let target = target_plain("hi");
        let EditOutcome::Built(payload) = build(&target, &doc_with("hey"))
        else {
            panic!("expected Built");
        };
        assert_eq!(
            payload.to_json(),
            json!({
                "msgtype": "m.text",
                "body": "* hey",
                "m.mentions": {},
                "m.new_content": {
                    "msgtype": "m.text",
                    "body": "hey",
                    "m.mentions": {},
                },
                "m.relates_to": {
                    "rel_type": "m.replace",
                    "event_id": "$event:example.org",
                },
            })
        );
    }

    // ===================================================================
    // Recompute-on-every-save semantics
    // ===================================================================

    #[test]
    fn second_build_on_unchanged_document_skips_again() {
        let target = target_plain("same");
        let doc = doc_with("same");
        assert_eq!(build(&target, &doc), EditOutcome::Skipped);
        assert_eq!(build(&target, &doc), EditOutcome::Skipped);
    }

    #[test]
    fn build_follows_document_mutation() {
        let target = target_plain("hello");
        let mut doc = doc_with("hello");
        assert_eq!(build(&target, &doc), EditOutcome::Skipped);
        doc.insert_text("!");
        let EditOutcome::Built(payload) = build(&target, &doc) else {
            panic!("expected Built after mutation");
        };
        assert_eq!(payload.new_content.body, "hello!");
    }

    // ===================================================================
    // EditTarget::from_event_content
    // ===================================================================

    #[test]
    fn target_from_plain_event_content() {
        let content = json!({ "msgtype": "m.text", "body": "hi" });
        let target =
            EditTarget::from_event_content("$e:x.y", &content).unwrap();
        assert_eq!(target.body, "hi");
        assert_eq!(target.formatted_body, None);
    }

    #[test]
    fn target_prefers_new_content_of_edited_event() {
        let content = json!({
            "msgtype": "m.text",
            "body": "* edited",
            "m.new_content": {
                "msgtype": "m.text",
                "body": "edited",
                "formatted_body": "<em>edited</em>",
            },
        });
        let target =
            EditTarget::from_event_content("$e:x.y", &content).unwrap();
        assert_eq!(target.body, "edited");
        assert_eq!(
            target.formatted_body.as_deref(),
            Some("<em>edited</em>")
        );
    }

    #[test]
    fn target_from_malformed_content_is_none() {
        assert!(EditTarget::from_event_content("$e:x.y", &json!({})).is_none());
        assert!(EditTarget::from_event_content(
            "$e:x.y",
            &json!({ "msgtype": "m.text" })
        )
        .is_none());
    }
}
