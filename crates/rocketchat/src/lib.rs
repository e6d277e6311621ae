//! Rocket.Chat channel plugin.
//!
//! Bridges Rocket.Chat outgoing webhooks into the agent pipeline and
//! streams replies back through the account's incoming-webhook endpoint.
//! The webhook handler acknowledges within the provider's response budget
//! and runs the actual pipeline (normalize → access check → route →
//! envelope → reply) on a detached task.

pub mod access;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod inbound;
pub mod outbound;
pub mod plugin;
pub mod state;
pub mod webhook;

pub use {
    error::{Error, Result},
    outbound::{DeliveryResult, OutboundPayload, RocketChatOutbound},
    plugin::RocketChatPlugin,
    state::WebhookState,
    webhook::router,
};

/// Channel identifier used in session keys, routing bindings, and logs.
pub const CHANNEL_TYPE: &str = "rocketchat";
