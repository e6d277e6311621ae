//! Drives the host reply pipeline and forwards each block to the provider.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    tracing::{debug, warn},
};

use {
    pontoon_channels::plugin::{AgentDispatcher, BlockSink, ReplyBlock},
    pontoon_common::types::{ChatType, MsgContext},
};

use crate::{
    config::{MessageType, RocketChatAccountConfig},
    outbound::{OutboundPayload, RocketChatOutbound, SendMode},
};

/// Transient status text sent before the first reply block.
const THINKING_NOTICE: &str = "_Thinking..._";

/// Forwards reply blocks to the provider as the host dispatcher emits
/// them. The host awaits each delivery, so blocks for one inbound message
/// arrive in order.
pub struct BlockForwarder {
    outbound: Arc<RocketChatOutbound>,
    account_id: String,
    to: String,
    /// Original sender, mentioned in group replies only.
    at_user_id: Option<String>,
    formatting: MessageType,
}

#[async_trait]
impl BlockSink for BlockForwarder {
    async fn deliver(&self, block: ReplyBlock) -> Result<()> {
        // Empty blocks are dropped silently.
        let Some(text) = block.delivery_text() else {
            return Ok(());
        };

        let payload = OutboundPayload::from_text(text, &self.formatting);
        let result = self
            .outbound
            .send_message(&self.account_id, &self.to, payload, SendMode::Session {
                at_user_id: self.at_user_id.as_deref(),
            })
            .await;

        if result.ok {
            debug!(account_id = %self.account_id, to = %self.to, "reply block delivered");
            Ok(())
        } else {
            let reason = result.error.unwrap_or_else(|| "delivery failed".into());
            warn!(account_id = %self.account_id, to = %self.to, %reason, "reply block failed");
            // Re-raise so the host's retry/abort policy decides whether
            // streaming continues.
            Err(anyhow::anyhow!(reason))
        }
    }
}

/// Run the agent pipeline for one envelope and stream the reply back.
///
/// When the account has `showThinking` enabled, a single transient notice
/// goes out before the first block; its failure is swallowed.
pub async fn run_reply(
    dispatcher: &dyn AgentDispatcher,
    outbound: Arc<RocketChatOutbound>,
    config: &RocketChatAccountConfig,
    ctx: MsgContext,
) -> Result<()> {
    if config.show_thinking {
        let notice = OutboundPayload::from_text(THINKING_NOTICE, &config.message_type);
        let result = outbound
            .send_by_session(&ctx.account_id, &ctx.to, notice, None)
            .await;
        if !result.ok {
            debug!(
                account_id = %ctx.account_id,
                error = result.error.as_deref().unwrap_or("unknown"),
                "thinking notice not delivered"
            );
        }
    }

    let at_user_id = match ctx.chat_type {
        ChatType::Group => Some(ctx.peer_id.clone()),
        ChatType::Dm => None,
    };
    let sink = Arc::new(BlockForwarder {
        outbound,
        account_id: ctx.account_id.clone(),
        to: ctx.to.clone(),
        at_user_id,
        formatting: config.message_type.clone(),
    });

    dispatcher.dispatch(ctx, sink).await
}
