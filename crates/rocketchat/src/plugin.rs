use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    anyhow::Result,
    async_trait::async_trait,
    secrecy::ExposeSecret,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use {
    pontoon_channels::{
        AgentDispatcher, ChannelEventSink,
        message_log::MessageLog,
        plugin::{ChannelHealthSnapshot, ChannelOutbound, ChannelPlugin, ChannelStatus},
    },
    pontoon_routing::RoutingConfig,
    pontoon_sessions::SessionStore,
};

use crate::{
    config::RocketChatAccountConfig,
    outbound::RocketChatOutbound,
    state::{AccountState, AccountStateMap, ActiveTargetStore, WebhookState},
};

/// Rocket.Chat channel plugin.
pub struct RocketChatPlugin {
    accounts: AccountStateMap,
    outbound: Arc<RocketChatOutbound>,
    targets: Arc<ActiveTargetStore>,
    dispatcher: Arc<dyn AgentDispatcher>,
    sessions: Arc<dyn SessionStore>,
    routing: Arc<RoutingConfig>,
    message_log: Option<Arc<dyn MessageLog>>,
    event_sink: Option<Arc<dyn ChannelEventSink>>,
}

impl RocketChatPlugin {
    /// Build a plugin wired to the host's agent pipeline and session store.
    pub fn new(dispatcher: Arc<dyn AgentDispatcher>, sessions: Arc<dyn SessionStore>) -> Self {
        let accounts: AccountStateMap = Arc::new(RwLock::new(HashMap::new()));
        let outbound = Arc::new(RocketChatOutbound {
            accounts: Arc::clone(&accounts),
        });
        Self {
            accounts,
            outbound,
            targets: Arc::new(ActiveTargetStore::new()),
            dispatcher,
            sessions,
            routing: Arc::new(RoutingConfig::default()),
            message_log: None,
            event_sink: None,
        }
    }

    #[must_use]
    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = Arc::new(routing);
        self
    }

    #[must_use]
    pub fn with_message_log(mut self, log: Arc<dyn MessageLog>) -> Self {
        self.message_log = Some(log);
        self
    }

    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn ChannelEventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// State handed to [`crate::router`] when the host registers the
    /// webhook routes.
    #[must_use]
    pub fn webhook_state(&self) -> WebhookState {
        WebhookState {
            accounts: Arc::clone(&self.accounts),
            outbound: Arc::clone(&self.outbound),
            dispatcher: Arc::clone(&self.dispatcher),
            sessions: Arc::clone(&self.sessions),
            routing: Arc::clone(&self.routing),
            targets: Arc::clone(&self.targets),
            message_log: self.message_log.clone(),
            event_sink: self.event_sink.clone(),
        }
    }

    /// Get a shared reference to the outbound sender (for use outside the
    /// plugin, e.g. CLI-triggered proactive sends).
    #[must_use]
    pub fn shared_outbound(&self) -> Arc<dyn ChannelOutbound> {
        Arc::clone(&self.outbound) as Arc<dyn ChannelOutbound>
    }

    /// List all active account IDs.
    #[must_use]
    pub fn account_ids(&self) -> Vec<String> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts.keys().cloned().collect()
    }

    #[must_use]
    pub fn has_account(&self, account_id: &str) -> bool {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts.contains_key(account_id)
    }

    /// Get the config for a specific account (serialized to JSON).
    #[must_use]
    pub fn account_config(&self, account_id: &str) -> Option<serde_json::Value> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts
            .get(account_id)
            .and_then(|s| serde_json::to_value(&s.config).ok())
    }

    /// Update the in-memory config for an account without tearing down the
    /// webhook route. Use for allow-list changes that must apply to the
    /// next inbound message immediately.
    pub fn update_account_config(&self, account_id: &str, config: serde_json::Value) -> Result<()> {
        let parsed: RocketChatAccountConfig = serde_json::from_value(config)?;
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        if let Some(state) = accounts.get_mut(account_id) {
            state.config = parsed;
            Ok(())
        } else {
            Err(anyhow::anyhow!("account not found: {account_id}"))
        }
    }

    /// Currently-active card/session unit for a conversation target.
    #[must_use]
    pub fn active_target(&self, account_id: &str, conversation_id: &str) -> Option<String> {
        self.targets.get(account_id, conversation_id)
    }

    /// Drop the active-unit entry for a conversation target.
    pub fn clear_active_target(&self, account_id: &str, conversation_id: &str) {
        self.targets.remove(account_id, conversation_id);
    }
}

#[async_trait]
impl ChannelPlugin for RocketChatPlugin {
    fn id(&self) -> &str {
        "rocketchat"
    }

    fn name(&self) -> &str {
        "Rocket.Chat"
    }

    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> Result<()> {
        let parsed: RocketChatAccountConfig = serde_json::from_value(config)?;

        if !parsed.enabled {
            return Err(anyhow::anyhow!("account is disabled: {account_id}"));
        }
        if parsed.webhook_url.is_empty() {
            return Err(anyhow::anyhow!("rocketchat webhook URL is required"));
        }
        if parsed.auth_token.expose_secret().is_empty() {
            return Err(anyhow::anyhow!("rocketchat auth token is required"));
        }

        info!(account_id, "starting rocketchat account");
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        accounts.insert(account_id.to_string(), AccountState {
            account_id: account_id.to_string(),
            config: parsed,
            http: reqwest::Client::new(),
            cancel: CancellationToken::new(),
        });
        Ok(())
    }

    async fn stop_account(&mut self, account_id: &str) -> Result<()> {
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        if let Some(state) = accounts.remove(account_id) {
            info!(account_id, "stopping rocketchat account");
            // Tears down route acceptance only; in-flight pipeline tasks
            // run to completion.
            state.cancel.cancel();
        } else {
            warn!(account_id, "rocketchat account not found");
        }
        Ok(())
    }

    fn outbound(&self) -> Option<&dyn ChannelOutbound> {
        Some(self.outbound.as_ref())
    }

    fn status(&self) -> Option<&dyn ChannelStatus> {
        Some(self)
    }
}

#[async_trait]
impl ChannelStatus for RocketChatPlugin {
    async fn probe(&self, account_id: &str) -> Result<ChannelHealthSnapshot> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        if let Some(state) = accounts.get(account_id) {
            Ok(ChannelHealthSnapshot {
                connected: true,
                account_id: state.account_id.clone(),
                details: Some(format!("webhook target: {}", state.config.webhook_url)),
            })
        } else {
            Ok(ChannelHealthSnapshot {
                connected: false,
                account_id: account_id.to_string(),
                details: Some("account not started".into()),
            })
        }
    }
}
