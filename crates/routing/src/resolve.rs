use std::collections::HashMap;

use {
    pontoon_sessions::SessionKey,
    serde::{Deserialize, Serialize},
};

/// Agent used when no binding matches and no default is configured.
const FALLBACK_AGENT: &str = "main";

/// Resolved route: which agent handles this message and the session keys
/// it threads into. Produced fresh per inbound message, immutable for that
/// message's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub agent_id: String,
    pub session_key: SessionKey,
    pub main_session_key: SessionKey,
}

/// Agent bindings, most specific first. Keys are lowercase composites:
/// `"{channel}:{account}:{peer}"`, `"{channel}:{account}"`, `"{channel}"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub peer_bindings: HashMap<String, String>,
    pub account_bindings: HashMap<String, String>,
    pub channel_bindings: HashMap<String, String>,
    pub default_agent: Option<String>,
}

/// Resolve which agent handles a message, following the binding cascade.
///
/// Deterministic given the same inputs and configuration.
#[must_use]
pub fn resolve_route(
    config: &RoutingConfig,
    channel: &str,
    account_id: &str,
    peer_kind: &str,
    peer_id: &str,
) -> ResolvedRoute {
    let channel_key = channel.to_lowercase();
    let account_key = format!("{channel_key}:{}", account_id.to_lowercase());
    let peer_key = format!("{account_key}:{}", peer_id.to_lowercase());

    let agent_id = config
        .peer_bindings
        .get(&peer_key)
        .or_else(|| config.account_bindings.get(&account_key))
        .or_else(|| config.channel_bindings.get(&channel_key))
        .or(config.default_agent.as_ref())
        .map_or(FALLBACK_AGENT, String::as_str)
        .to_string();

    ResolvedRoute {
        session_key: SessionKey::for_peer(&agent_id, channel, account_id, peer_kind, peer_id),
        main_session_key: SessionKey::main(&agent_id),
        agent_id,
    }
}
