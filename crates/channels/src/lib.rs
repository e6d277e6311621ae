//! Channel plugin system.
//!
//! Each messaging provider implements the [`plugin::ChannelPlugin`] trait
//! plus sub-traits for outbound delivery and health probes. The
//! [`plugin::AgentDispatcher`] trait is the seam to the host platform's
//! buffered-block reply pipeline; [`gating`] holds the access policies
//! shared by every channel.

pub mod error;
pub mod gating;
pub mod message_log;
pub mod plugin;

pub use {
    error::{Error, Result},
    plugin::{
        AgentDispatcher, BlockSink, ChannelEvent, ChannelEventSink, ChannelHealthSnapshot,
        ChannelOutbound, ChannelPlugin, ChannelStatus, ReplyBlock,
    },
};
