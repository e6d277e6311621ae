//! Route inbound messages to agents and build session keys.
//!
//! Binding cascade (precedence):
//! 1. Peer binding (channel + account + peer ID)
//! 2. Account binding (channel + account)
//! 3. Channel binding (channel)
//! 4. Default agent

pub mod resolve;

pub use resolve::{ResolvedRoute, RoutingConfig, resolve_route};
