//! Inbound payload normalization.

use {pontoon_common::types::ChatType, serde::Deserialize};

/// Raw Rocket.Chat outgoing-webhook payload, as POSTed to the bridge.
///
/// Every field is optional at this layer; the webhook handler rejects
/// payloads missing `user_id` or `text` before normalization runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutgoingWebhookPayload {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub bot: bool,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "siteUrl")]
    pub site_url: Option<String>,
}

/// Accept `true`/`false` as JSON booleans or as the strings form-encoded
/// bodies deliver (`"true"`, `"1"`, ...).
fn flexible_bool<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Str(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Bool(b)) => b,
        Some(Raw::Str(s)) => matches!(s.as_str(), "true" | "1" | "yes"),
        None => false,
    })
}

/// A validated inbound message, ready for policy evaluation and routing.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_type: ChatType,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub message_id: String,
    pub timestamp: Option<String>,
    pub sender_id: String,
    pub sender_name: String,
    /// Trimmed, non-empty message body.
    pub text: String,
    /// Body exactly as delivered.
    pub raw_text: String,
    pub message_type: &'static str,
    pub site_url: Option<String>,
}

/// Normalize a raw payload into an [`InboundMessage`].
///
/// Returns `None` when the payload carries no sender or no processable
/// text. Whitespace-only text is a deliberate no-op (no reply, no error),
/// not a failure.
#[must_use]
pub fn normalize(payload: &OutgoingWebhookPayload) -> Option<InboundMessage> {
    let sender_id = payload.user_id.as_deref()?.to_string();
    let raw_text = payload.text.as_deref()?.to_string();
    let text = raw_text.trim().to_string();
    if text.is_empty() {
        return None;
    }

    let channel_name = payload
        .channel_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToString::to_string);

    Some(InboundMessage {
        chat_type: classify(channel_name.as_deref()),
        channel_id: payload.channel_id.clone().unwrap_or_default(),
        channel_name,
        message_id: payload.message_id.clone().unwrap_or_default(),
        timestamp: payload.timestamp.clone(),
        sender_name: payload
            .user_name
            .clone()
            .unwrap_or_else(|| sender_id.clone()),
        sender_id,
        text,
        raw_text,
        message_type: "text",
        site_url: payload.site_url.clone(),
    })
}

/// A message is direct when it has no channel name or the name denotes a
/// DM channel (Rocket.Chat marks those with a leading `@`).
fn classify(channel_name: Option<&str>) -> ChatType {
    match channel_name {
        None => ChatType::Dm,
        Some(name) if name.starts_with('@') => ChatType::Dm,
        Some(_) => ChatType::Group,
    }
}
