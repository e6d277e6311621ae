//! The asynchronous inbound pipeline, run after the webhook is acknowledged.

use {
    tracing::{debug, error, warn},
};

use {
    pontoon_channels::{
        ChannelEvent,
        message_log::MessageLogEntry,
    },
    pontoon_common::types::ChatType,
    pontoon_sessions::{InboundRecord, record_inbound_detached},
};

use crate::{
    CHANNEL_TYPE,
    access::{self, AccessDecision},
    config::RocketChatAccountConfig,
    dispatch,
    envelope::build_envelope,
    error::{Error, Result},
    inbound::{InboundMessage, OutgoingWebhookPayload, normalize},
    outbound::OutboundPayload,
    state::WebhookState,
};

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Schedule the pipeline for an acknowledged webhook call.
///
/// Runs on a detached task: the HTTP response has already been sent, so
/// every failure past this point is logged and contained here — the
/// listener must never crash because one message went wrong.
pub fn spawn_process(state: WebhookState, account_id: String, payload: OutgoingWebhookPayload) {
    tokio::spawn(async move {
        if let Err(e) = process_inbound(&state, &account_id, payload).await {
            error!(account_id = %account_id, error = %e, "inbound pipeline failed");
        }
    });
}

/// Normalize → authorize → route → envelope → reply, for one message.
pub async fn process_inbound(
    state: &WebhookState,
    account_id: &str,
    payload: OutgoingWebhookPayload,
) -> Result<()> {
    if payload.bot {
        debug!(account_id, "ignoring bot message");
        return Ok(());
    }

    let Some(msg) = normalize(&payload) else {
        debug!(account_id, "ignoring message with no processable text");
        return Ok(());
    };

    let config = {
        let accounts = state.accounts.read().unwrap_or_else(|e| e.into_inner());
        match accounts.get(account_id) {
            Some(account) => account.config.clone(),
            None => {
                return Err(Error::Channel(pontoon_channels::Error::unknown_account(
                    account_id,
                )));
            },
        }
    };

    let decision = access::check_access(&config, &msg);
    log_inbound(state, account_id, &msg, decision.granted()).await;
    emit_inbound(state, account_id, &msg, decision.granted()).await;

    let pairing_gated = match decision {
        AccessDecision::Denied => {
            warn!(account_id, peer_id = %msg.sender_id, "sender denied by dm policy");
            send_denial_notice(state, account_id, &config, &msg).await;
            return Ok(());
        },
        AccessDecision::Granted { pairing_gated } => pairing_gated,
    };

    let (peer_kind, target) = match msg.chat_type {
        ChatType::Dm => ("user", msg.sender_id.clone()),
        ChatType::Group => ("channel", msg.channel_id.clone()),
    };
    let route = pontoon_routing::resolve_route(
        &state.routing,
        CHANNEL_TYPE,
        account_id,
        peer_kind,
        &target,
    );

    let prev_timestamp = match state.sessions.read_continuity_marker(&route.session_key).await {
        Ok(marker) => marker,
        Err(e) => {
            debug!(account_id, error = %e, "continuity marker unavailable");
            None
        },
    };

    let ctx = build_envelope(account_id, &route, &msg, pairing_gated, prev_timestamp);

    // Claim the active session unit for this target. Another message may
    // race us; whoever writes last owns the entry.
    state.targets.upsert(account_id, &ctx.to, &msg.message_id);
    if !state.targets.is_current(account_id, &ctx.to, &msg.message_id) {
        debug!(account_id, to = %ctx.to, "active target superseded by a newer message");
    }

    // Persist the inbound context off the reply path.
    {
        let record = InboundRecord {
            timestamp: unix_now(),
            sender_id: msg.sender_id.clone(),
            sender_name: Some(msg.sender_name.clone()),
            channel_id: msg.channel_id.clone(),
            body: msg.text.clone(),
        };
        let session_key = route.session_key.clone();
        let account = account_id.to_string();
        record_inbound_detached(
            state.sessions.clone(),
            route.session_key.clone(),
            record,
            move |e| {
                warn!(account_id = %account, session_key = %session_key, error = %e, "session record failed");
            },
        );
    }

    let reply_result = dispatch::run_reply(
        state.dispatcher.as_ref(),
        state.outbound.clone(),
        &config,
        ctx.clone(),
    )
    .await;

    // The conversation unit for this message is done; leave a newer one alone.
    state
        .targets
        .remove_if_current(account_id, &ctx.to, &msg.message_id);

    reply_result.map_err(|e| Error::message(e.to_string()))
}

/// Best-effort denial notice back to the sender, carrying their resolvable
/// ID so an operator can allow-list it. Never retried.
async fn send_denial_notice(
    state: &WebhookState,
    account_id: &str,
    config: &RocketChatAccountConfig,
    msg: &InboundMessage,
) {
    let notice = OutboundPayload::from_text(
        access::denial_notice(&msg.sender_id),
        &config.message_type,
    );
    let result = state
        .outbound
        .send_by_session(account_id, &msg.sender_id, notice, None)
        .await;
    if !result.ok {
        warn!(
            account_id,
            peer_id = %msg.sender_id,
            error = result.error.as_deref().unwrap_or("unknown"),
            "denial notice not delivered"
        );
    }
}

async fn log_inbound(
    state: &WebhookState,
    account_id: &str,
    msg: &InboundMessage,
    access_granted: bool,
) {
    let Some(log) = state.message_log.as_ref() else {
        return;
    };
    let entry = MessageLogEntry {
        id: 0,
        account_id: account_id.to_string(),
        channel_type: CHANNEL_TYPE.to_string(),
        peer_id: msg.sender_id.clone(),
        sender_name: Some(msg.sender_name.clone()),
        chat_id: msg.channel_id.clone(),
        chat_type: msg.chat_type.as_str().to_string(),
        body: msg.text.clone(),
        access_granted,
        created_at: unix_now(),
    };
    if let Err(e) = log.log(entry).await {
        warn!(account_id, error = %e, "failed to log inbound message");
    }
}

async fn emit_inbound(
    state: &WebhookState,
    account_id: &str,
    msg: &InboundMessage,
    access_granted: bool,
) {
    let Some(sink) = state.event_sink.as_ref() else {
        return;
    };
    sink.emit(ChannelEvent::InboundMessage {
        channel_type: CHANNEL_TYPE.to_string(),
        account_id: account_id.to_string(),
        peer_id: msg.sender_id.clone(),
        sender_name: Some(msg.sender_name.clone()),
        access_granted,
    })
    .await;
}
