use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    dashmap::DashMap,
    pontoon_channels::{AgentDispatcher, ChannelEventSink, message_log::MessageLog},
    pontoon_routing::RoutingConfig,
    pontoon_sessions::SessionStore,
    tokio_util::sync::CancellationToken,
};

use crate::{config::RocketChatAccountConfig, outbound::RocketChatOutbound};

/// Shared account state map.
pub type AccountStateMap = Arc<RwLock<HashMap<String, AccountState>>>;

/// Per-account runtime state.
pub struct AccountState {
    pub account_id: String,
    pub config: RocketChatAccountConfig,
    pub http: reqwest::Client,
    pub cancel: CancellationToken,
}

/// Everything the webhook ingress needs to run the inbound pipeline.
///
/// Cheap to clone; constructed by the plugin and handed to [`crate::router`].
#[derive(Clone)]
pub struct WebhookState {
    pub accounts: AccountStateMap,
    pub outbound: Arc<RocketChatOutbound>,
    pub dispatcher: Arc<dyn AgentDispatcher>,
    pub sessions: Arc<dyn SessionStore>,
    pub routing: Arc<RoutingConfig>,
    pub targets: Arc<ActiveTargetStore>,
    pub message_log: Option<Arc<dyn MessageLog>>,
    pub event_sink: Option<Arc<dyn ChannelEventSink>>,
}

/// Tracks the active card/session unit per conversation target so a second
/// message to the same target reuses it instead of opening a duplicate.
///
/// Keyed by `(account_id, conversation_id)`. Writes are atomic per entry
/// with last-writer-wins semantics; a caller that raced another writer
/// detects supersession by reading back its own write.
#[derive(Default)]
pub struct ActiveTargetStore {
    map: DashMap<(String, String), String>,
}

impl ActiveTargetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically create or replace the entry for a target.
    pub fn upsert(&self, account_id: &str, conversation_id: &str, unit_id: &str) {
        self.map.insert(
            (account_id.to_string(), conversation_id.to_string()),
            unit_id.to_string(),
        );
    }

    #[must_use]
    pub fn get(&self, account_id: &str, conversation_id: &str) -> Option<String> {
        self.map
            .get(&(account_id.to_string(), conversation_id.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Whether `unit_id` is still the active unit for this target.
    #[must_use]
    pub fn is_current(&self, account_id: &str, conversation_id: &str, unit_id: &str) -> bool {
        self.get(account_id, conversation_id).as_deref() == Some(unit_id)
    }

    /// Remove the entry regardless of who owns it.
    pub fn remove(&self, account_id: &str, conversation_id: &str) {
        self.map
            .remove(&(account_id.to_string(), conversation_id.to_string()));
    }

    /// Remove the entry only if `unit_id` still owns it. Returns whether a
    /// removal happened; a superseded caller leaves the newer entry alone.
    pub fn remove_if_current(
        &self,
        account_id: &str,
        conversation_id: &str,
        unit_id: &str,
    ) -> bool {
        self.map
            .remove_if(
                &(account_id.to_string(), conversation_id.to_string()),
                |_, current| current == unit_id,
            )
            .is_some()
    }
}
