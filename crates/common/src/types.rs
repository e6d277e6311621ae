//! Core message types shared between channel plugins and the agent pipeline.

use serde::{Deserialize, Serialize};

/// Kind of conversation an inbound message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// One-on-one conversation with the bot.
    #[serde(rename = "direct")]
    Dm,
    /// Multi-user channel or group.
    Group,
}

impl ChatType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dm => "direct",
            Self::Group => "group",
        }
    }
}

/// Canonical inbound envelope handed to the agent pipeline.
///
/// Built exactly once per inbound message and immutable afterwards;
/// ownership transfers to the pipeline on dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgContext {
    /// Channel (provider) identifier, e.g. "rocketchat".
    pub channel: String,
    pub account_id: String,
    pub chat_type: ChatType,

    /// Reply address. Equals the sender ID for DMs and the channel ID for
    /// group messages; `from` carries the same single-target value.
    pub from: String,
    pub to: String,

    /// Provider-side sender identity.
    pub peer_id: String,
    pub sender_name: Option<String>,

    /// Originating channel metadata.
    pub channel_id: String,
    pub channel_name: Option<String>,

    /// Normalized (trimmed) message body.
    pub body: String,
    /// Body exactly as the provider delivered it.
    pub raw_body: String,

    pub message_id: String,
    /// Provider timestamp of this message (ISO-8601 as received).
    pub timestamp: Option<String>,
    /// Unix-seconds timestamp of the previous message in this session, for
    /// conversational-continuity display (time-gap separators).
    pub prev_timestamp: Option<i64>,

    /// Session key threading consecutive messages into one conversation.
    pub session_key: String,

    /// The sender passed routing but the host pairing subsystem still has
    /// to confirm them (dmPolicy = pairing).
    pub pairing_gated: bool,

    /// Human-facing context label, e.g. `"Alice (u1)"` or `"dev - Alice"`.
    pub origin_label: String,

    /// Media fields; unused for text-only providers.
    pub media: Option<MediaRef>,
}

/// Reference to an inbound or outbound media object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub mime: Option<String>,
}

/// A reply produced by the agent pipeline, ready for channel delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub text: String,
    pub media: Option<MediaRef>,
    pub reply_to_id: Option<String>,
    pub silent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_type_serializes_to_wire_names() {
        assert_eq!(serde_json::to_string(&ChatType::Dm).unwrap(), "\"direct\"");
        assert_eq!(serde_json::to_string(&ChatType::Group).unwrap(), "\"group\"");
    }

    #[test]
    fn chat_type_as_str_matches_serde() {
        assert_eq!(ChatType::Dm.as_str(), "direct");
        assert_eq!(ChatType::Group.as_str(), "group");
    }
}
