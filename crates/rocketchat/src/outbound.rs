//! Outbound delivery to Rocket.Chat incoming webhooks.

use {
    anyhow::Result,
    async_trait::async_trait,
    serde::Serialize,
    tracing::{debug, warn},
};

use {
    pontoon_channels::plugin::ChannelOutbound,
    pontoon_common::types::ReplyPayload,
};

use crate::{config::MessageType, state::AccountStateMap};

/// Characters that open a markdown block when they lead the text.
const MARKDOWN_LEADERS: [char; 4] = ['#', '*', '>', '-'];

/// Heuristic markdown sniff: leading block marker, inline formatting
/// characters, or a multi-line body.
#[must_use]
pub fn looks_like_markdown(text: &str) -> bool {
    if text
        .chars()
        .next()
        .is_some_and(|c| MARKDOWN_LEADERS.contains(&c))
    {
        return true;
    }
    text.contains('\n')
        || text
            .chars()
            .any(|c| matches!(c, '*' | '_' | '`' | '#' | '[' | ']'))
}

/// Decide the formatting for one outbound text: an explicit request wins,
/// a text-only account never uses markdown, and markdown accounts sniff
/// the text so plain sentences stay plain.
#[must_use]
pub fn resolve_markdown(requested: Option<bool>, formatting: &MessageType, text: &str) -> bool {
    match (requested, formatting) {
        (Some(flag), _) => flag,
        (None, MessageType::Text) => false,
        (None, MessageType::Markdown) => looks_like_markdown(text),
    }
}

/// A Rocket.Chat message attachment.
#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Wire payload for one outbound send. Constructed per call, never
/// persisted.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundPayload {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Formatting decision for this payload; not part of the wire format.
    #[serde(skip)]
    pub use_markdown: bool,
}

impl OutboundPayload {
    /// Build a text payload, auto-detecting markdown per account settings.
    #[must_use]
    pub fn from_text(text: impl Into<String>, formatting: &MessageType) -> Self {
        let text = text.into();
        let use_markdown = resolve_markdown(None, formatting, &text);
        Self {
            text,
            attachments: None,
            use_markdown,
        }
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self
    }
}

/// Result of one delivery attempt. Send operations never raise across the
/// module boundary; provider failures are folded in here.
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub ok: bool,
    pub error: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl DeliveryResult {
    #[must_use]
    pub fn success(data: Option<serde_json::Value>) -> Self {
        Self {
            ok: true,
            error: None,
            data,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            data: None,
        }
    }
}

/// How an outbound message is addressed.
#[derive(Debug, Clone, Copy)]
pub enum SendMode<'a> {
    /// Reply within an active webhook session. `at_user_id` requests an
    /// `@sender` mention suffix and is set for group replies only.
    Session { at_user_id: Option<&'a str> },
    /// Agent-initiated push with no reply context.
    Proactive,
}

/// Outbound message sender for Rocket.Chat.
///
/// Every send goes to the account's configured incoming-webhook URL; the
/// provider's protocol has no per-request send target and no
/// authorization header.
pub struct RocketChatOutbound {
    pub(crate) accounts: AccountStateMap,
}

impl RocketChatOutbound {
    fn account_snapshot(
        &self,
        account_id: &str,
    ) -> Option<(crate::config::RocketChatAccountConfig, reqwest::Client)> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts
            .get(account_id)
            .map(|s| (s.config.clone(), s.http.clone()))
    }

    /// Unified entry point: session path when a reply context exists, else
    /// the proactive path. Always returns a [`DeliveryResult`].
    pub async fn send_message(
        &self,
        account_id: &str,
        to: &str,
        payload: OutboundPayload,
        mode: SendMode<'_>,
    ) -> DeliveryResult {
        match mode {
            SendMode::Session { at_user_id } => {
                self.send_by_session(account_id, to, payload, at_user_id)
                    .await
            },
            SendMode::Proactive => self.send_proactive(account_id, to, payload).await,
        }
    }

    /// Reply to an in-flight webhook conversation.
    pub async fn send_by_session(
        &self,
        account_id: &str,
        to: &str,
        mut payload: OutboundPayload,
        at_user_id: Option<&str>,
    ) -> DeliveryResult {
        if let Some(user) = at_user_id {
            payload.text = decorate_mention(&payload.text, user);
        }
        self.post(account_id, to, &payload).await
    }

    /// Push a message with no active reply context.
    pub async fn send_proactive(
        &self,
        account_id: &str,
        to: &str,
        payload: OutboundPayload,
    ) -> DeliveryResult {
        self.post(account_id, to, &payload).await
    }

    async fn post(&self, account_id: &str, to: &str, payload: &OutboundPayload) -> DeliveryResult {
        let Some((config, http)) = self.account_snapshot(account_id) else {
            return DeliveryResult::failure(format!("unknown account: {account_id}"));
        };
        if config.webhook_url.is_empty() {
            return DeliveryResult::failure("no webhook URL configured");
        }

        let response = match http.post(&config.webhook_url).json(payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(account_id, chat_id = to, error = %e, "rocketchat send failed");
                return DeliveryResult::failure(e.to_string());
            },
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(account_id, chat_id = to, %status, "rocketchat send rejected");
            return DeliveryResult::failure(format!("webhook returned {status}: {body}"));
        }

        debug!(account_id, chat_id = to, markdown = payload.use_markdown, "reply sent");
        DeliveryResult::success(serde_json::from_str(&body).ok())
    }
}

/// Append the `@sender` mention Rocket.Chat resolves in group channels.
fn decorate_mention(text: &str, at_user_id: &str) -> String {
    format!("{text} @{at_user_id}")
}

#[async_trait]
impl ChannelOutbound for RocketChatOutbound {
    async fn send_text(&self, account_id: &str, to: &str, text: &str) -> Result<()> {
        let formatting = self
            .account_snapshot(account_id)
            .map(|(config, _)| config.message_type)
            .unwrap_or_default();
        let payload = OutboundPayload::from_text(text, &formatting);
        let result = self
            .send_message(account_id, to, payload, SendMode::Proactive)
            .await;
        if result.ok {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                result
                    .error
                    .unwrap_or_else(|| "delivery failed".to_string())
            ))
        }
    }

    async fn send_payload(
        &self,
        account_id: &str,
        to: &str,
        payload: &ReplyPayload,
    ) -> Result<()> {
        let formatting = self
            .account_snapshot(account_id)
            .map(|(config, _)| config.message_type)
            .unwrap_or_default();
        let mut outbound = OutboundPayload::from_text(payload.text.clone(), &formatting);
        if let Some(media) = payload.media.as_ref() {
            outbound = outbound.with_attachments(vec![Attachment {
                title: String::new(),
                title_link: None,
                text: String::new(),
                image_url: Some(media.url.clone()),
                color: None,
            }]);
        }
        let result = self
            .send_message(account_id, to, outbound, SendMode::Proactive)
            .await;
        if result.ok {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                result
                    .error
                    .unwrap_or_else(|| "delivery failed".to_string())
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{config::RocketChatAccountConfig, state::AccountState},
        rstest::rstest,
        secrecy::Secret,
        std::{
            collections::HashMap,
            sync::{Arc, RwLock},
        },
        tokio_util::sync::CancellationToken,
    };

    #[rstest]
    #[case("hello", false)]
    #[case("plain sentence with no frills.", false)]
    #[case("# hello\nworld", true)]
    #[case("- item", true)]
    #[case("> quoted", true)]
    #[case("*emphasis*", true)]
    #[case("snake_case token", true)]
    #[case("two\nlines", true)]
    #[case("a [link](x)", true)]
    #[case("inline `code`", true)]
    fn markdown_sniffing(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(looks_like_markdown(text), expected);
    }

    #[test]
    fn text_accounts_never_use_markdown() {
        assert!(!resolve_markdown(None, &MessageType::Text, "# heading"));
    }

    #[test]
    fn explicit_request_overrides_detection() {
        assert!(resolve_markdown(Some(true), &MessageType::Markdown, "hello"));
        assert!(!resolve_markdown(
            Some(false),
            &MessageType::Markdown,
            "# heading"
        ));
    }

    #[test]
    fn payload_auto_detection() {
        assert!(!OutboundPayload::from_text("hello", &MessageType::Markdown).use_markdown);
        assert!(OutboundPayload::from_text("# hello\nworld", &MessageType::Markdown).use_markdown);
    }

    #[test]
    fn wire_payload_has_no_local_fields() {
        let payload = OutboundPayload::from_text("# hi", &MessageType::Markdown);
        let wire = serde_json::to_value(&payload).unwrap();
        assert_eq!(wire, serde_json::json!({"text": "# hi"}));
    }

    #[test]
    fn attachments_serialize_with_optional_fields_elided() {
        let payload = OutboundPayload::from_text("see below", &MessageType::Markdown)
            .with_attachments(vec![Attachment {
                title: "Build".into(),
                title_link: Some("https://ci.example.com/1".into()),
                text: "passed".into(),
                image_url: None,
                color: Some("#36a64f".into()),
            }]);
        let wire = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            wire["attachments"][0],
            serde_json::json!({
                "title": "Build",
                "title_link": "https://ci.example.com/1",
                "text": "passed",
                "color": "#36a64f",
            })
        );
    }

    #[test]
    fn mention_suffix() {
        assert_eq!(decorate_mention("done", "u1"), "done @u1");
    }

    fn accounts_with(webhook_url: &str) -> AccountStateMap {
        let config = RocketChatAccountConfig {
            webhook_url: webhook_url.to_string(),
            auth_token: Secret::new("T".into()),
            ..Default::default()
        };
        let map: AccountStateMap = Arc::new(RwLock::new(HashMap::new()));
        map.write().unwrap().insert("acct".to_string(), AccountState {
            account_id: "acct".to_string(),
            config,
            http: reqwest::Client::new(),
            cancel: CancellationToken::new(),
        });
        map
    }

    #[tokio::test]
    async fn proactive_send_posts_json_without_auth_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/out")
            .match_header("authorization", mockito::Matcher::Missing)
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        let outbound = RocketChatOutbound {
            accounts: accounts_with(&format!("{}/hooks/out", server.url())),
        };
        let payload = OutboundPayload::from_text("hello", &MessageType::Markdown);
        let result = outbound
            .send_message("acct", "u1", payload, SendMode::Proactive)
            .await;

        assert!(result.ok, "{:?}", result.error);
        assert_eq!(result.data, Some(serde_json::json!({"success": true})));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn session_send_decorates_group_mention() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/out")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"text": "done @u1"}),
            ))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let outbound = RocketChatOutbound {
            accounts: accounts_with(&format!("{}/hooks/out", server.url())),
        };
        let payload = OutboundPayload::from_text("done", &MessageType::Markdown);
        let result = outbound
            .send_message("acct", "c1", payload, SendMode::Session {
                at_user_id: Some("u1"),
            })
            .await;

        assert!(result.ok);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn provider_rejection_becomes_failure_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hooks/out")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let outbound = RocketChatOutbound {
            accounts: accounts_with(&format!("{}/hooks/out", server.url())),
        };
        let payload = OutboundPayload::from_text("hello", &MessageType::Markdown);
        let result = outbound
            .send_message("acct", "u1", payload, SendMode::Proactive)
            .await;

        assert!(!result.ok);
        assert!(result.error.as_deref().unwrap_or("").contains("500"));
    }

    #[tokio::test]
    async fn unknown_account_is_a_failure_not_a_panic() {
        let outbound = RocketChatOutbound {
            accounts: Arc::new(RwLock::new(HashMap::new())),
        };
        let payload = OutboundPayload::from_text("hello", &MessageType::Markdown);
        let result = outbound
            .send_message("ghost", "u1", payload, SendMode::Proactive)
            .await;
        assert!(!result.ok);
        assert!(result.error.as_deref().unwrap_or("").contains("ghost"));
    }

    #[tokio::test]
    async fn send_message_is_idempotent_across_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/out")
            .with_status(200)
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;

        let outbound = RocketChatOutbound {
            accounts: accounts_with(&format!("{}/hooks/out", server.url())),
        };
        for _ in 0..2 {
            let payload = OutboundPayload::from_text("same", &MessageType::Markdown);
            let result = outbound
                .send_message("acct", "u1", payload, SendMode::Proactive)
                .await;
            assert!(result.ok);
        }
        mock.assert_async().await;
    }
}
