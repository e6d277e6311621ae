//! Envelope assembly for the agent pipeline.

use {
    pontoon_common::types::{ChatType, MsgContext},
    pontoon_routing::ResolvedRoute,
};

use crate::{CHANNEL_TYPE, inbound::InboundMessage};

/// Assemble the canonical inbound envelope.
///
/// Replies always go back to the party the message came from, so `from`
/// and `to` carry the same single-target value: the sender for DMs, the
/// channel for group messages.
#[must_use]
pub fn build_envelope(
    account_id: &str,
    route: &ResolvedRoute,
    msg: &InboundMessage,
    pairing_gated: bool,
    prev_timestamp: Option<i64>,
) -> MsgContext {
    let target = match msg.chat_type {
        ChatType::Dm => msg.sender_id.clone(),
        ChatType::Group => msg.channel_id.clone(),
    };

    let origin_label = match msg.chat_type {
        ChatType::Dm => format!("{} ({})", msg.sender_name, msg.sender_id),
        ChatType::Group => format!(
            "{} - {}",
            msg.channel_name.as_deref().unwrap_or(&msg.channel_id),
            msg.sender_name
        ),
    };

    MsgContext {
        channel: CHANNEL_TYPE.to_string(),
        account_id: account_id.to_string(),
        chat_type: msg.chat_type,
        from: target.clone(),
        to: target,
        peer_id: msg.sender_id.clone(),
        sender_name: Some(msg.sender_name.clone()),
        channel_id: msg.channel_id.clone(),
        channel_name: msg.channel_name.clone(),
        body: msg.text.clone(),
        raw_body: msg.raw_text.clone(),
        message_id: msg.message_id.clone(),
        timestamp: msg.timestamp.clone(),
        prev_timestamp,
        session_key: route.session_key.to_string(),
        pairing_gated,
        origin_label,
        media: None,
    }
}
