use {
    pontoon_channels::gating::{DmPolicy, GroupPolicy},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Outbound text formatting for an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Deliver replies as plain text.
    Text,
    /// Deliver replies with markdown when the text looks like markdown.
    #[default]
    Markdown,
}

/// Configuration for a single Rocket.Chat account.
///
/// Field names follow the provider's camelCase config surface.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RocketChatAccountConfig {
    /// Whether this account accepts inbound traffic.
    pub enabled: bool,

    /// Incoming-webhook URL used for every outbound send. The inbound
    /// request URL is not a reusable send target in Rocket.Chat's
    /// outgoing-webhook protocol.
    pub webhook_url: String,

    /// Shared token the outgoing webhook sends in its payload.
    #[serde(serialize_with = "serialize_secret")]
    pub auth_token: Secret<String>,

    /// DM access policy.
    pub dm_policy: DmPolicy,

    /// Group access policy, consumed by the host's mention-gating.
    pub group_policy: GroupPolicy,

    /// Sender allow-list for `dmPolicy = allowlist`.
    pub allow_from: Vec<String>,

    /// Outbound formatting mode.
    pub message_type: MessageType,

    /// Send a transient status message before the first reply block.
    pub show_thinking: bool,

    /// Verbose logging for this account.
    pub debug: bool,
}

impl std::fmt::Debug for RocketChatAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocketChatAccountConfig")
            .field("enabled", &self.enabled)
            .field("webhook_url", &self.webhook_url)
            .field("auth_token", &"[REDACTED]")
            .field("dm_policy", &self.dm_policy)
            .field("group_policy", &self.group_policy)
            .field("allow_from", &self.allow_from)
            .field("message_type", &self.message_type)
            .field("show_thinking", &self.show_thinking)
            .field("debug", &self.debug)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for RocketChatAccountConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: String::new(),
            auth_token: Secret::new(String::new()),
            dm_policy: DmPolicy::default(),
            group_policy: GroupPolicy::default(),
            allow_from: Vec::new(),
            message_type: MessageType::default(),
            show_thinking: true,
            debug: false,
        }
    }
}
