use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    pontoon_common::types::{MsgContext, ReplyPayload},
};

// ── Channel events (pub/sub) ────────────────────────────────────────────────

/// Events emitted by channel plugins for real-time UI updates.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelEvent {
    InboundMessage {
        channel_type: String,
        account_id: String,
        peer_id: String,
        sender_name: Option<String>,
        access_granted: bool,
    },
    /// A channel account was automatically disabled due to a runtime error.
    AccountDisabled {
        channel_type: String,
        account_id: String,
        reason: String,
    },
}

/// Sink for channel events — the host provides the concrete implementation.
#[async_trait]
pub trait ChannelEventSink: Send + Sync {
    /// Broadcast a channel event. Best-effort; implementations must not fail.
    async fn emit(&self, event: ChannelEvent);
}

// ── Agent pipeline boundary ─────────────────────────────────────────────────

/// One chunk emitted by the host's buffered-block reply dispatcher.
///
/// `markdown` carries a rendered-markdown variant of the block when the
/// pipeline produced one; delivery prefers it over `text`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ReplyBlock {
    pub text: Option<String>,
    pub markdown: Option<String>,
}

impl ReplyBlock {
    /// Delivery text for this block: `markdown` if present, else `text`.
    /// Returns `None` for blocks with nothing deliverable.
    #[must_use]
    pub fn delivery_text(&self) -> Option<&str> {
        self.markdown
            .as_deref()
            .or(self.text.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Receives reply blocks one at a time, in emission order.
///
/// The host dispatcher awaits each `deliver` call before advancing to the
/// next block, so deliveries for a single inbound message are sequential.
/// An error from `deliver` is handed back to the host's own retry/abort
/// policy; sinks must not retry internally.
#[async_trait]
pub trait BlockSink: Send + Sync {
    async fn deliver(&self, block: ReplyBlock) -> Result<()>;
}

/// The host platform's agent pipeline: consumes one inbound envelope and
/// streams the reply through the supplied sink.
#[async_trait]
pub trait AgentDispatcher: Send + Sync {
    async fn dispatch(&self, ctx: MsgContext, sink: Arc<dyn BlockSink>) -> Result<()>;
}

// ── Plugin lifecycle ────────────────────────────────────────────────────────

/// Core channel plugin trait. Each messaging platform implements this.
#[async_trait]
pub trait ChannelPlugin: Send + Sync {
    /// Channel identifier (e.g. "rocketchat").
    fn id(&self) -> &str;

    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start an account connection.
    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> Result<()>;

    /// Stop an account connection.
    async fn stop_account(&mut self, account_id: &str) -> Result<()>;

    /// Get outbound adapter for sending messages.
    fn outbound(&self) -> Option<&dyn ChannelOutbound>;

    /// Get status adapter for health checks.
    fn status(&self) -> Option<&dyn ChannelStatus>;
}

/// Send messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, account_id: &str, to: &str, text: &str) -> Result<()>;
    async fn send_payload(&self, account_id: &str, to: &str, payload: &ReplyPayload)
    -> Result<()>;
}

/// Probe channel account health.
#[async_trait]
pub trait ChannelStatus: Send + Sync {
    async fn probe(&self, account_id: &str) -> Result<ChannelHealthSnapshot>;
}

/// Channel health snapshot.
#[derive(Debug, Clone)]
pub struct ChannelHealthSnapshot {
    pub connected: bool,
    pub account_id: String,
    pub details: Option<String>,
}
