//! Per-message access control.

use {
    pontoon_channels::gating::{self, DmAccess},
    pontoon_common::types::ChatType,
};

use crate::{CHANNEL_TYPE, config::RocketChatAccountConfig, inbound::InboundMessage};

/// Outcome of the access check for one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Process the message. `pairing_gated` is carried onto the envelope
    /// so the host pairing subsystem can finish the check downstream.
    Granted { pairing_gated: bool },
    /// Drop the message and send the sender one denial notice.
    Denied,
}

impl AccessDecision {
    #[must_use]
    pub fn granted(self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Evaluate the account policy for an inbound message.
///
/// Group messages are never filtered through the DM policy; the group
/// policy value travels on the account config for the host's
/// mention-gating and does not reject anything here.
#[must_use]
pub fn check_access(config: &RocketChatAccountConfig, msg: &InboundMessage) -> AccessDecision {
    match msg.chat_type {
        ChatType::Group => AccessDecision::Granted {
            pairing_gated: false,
        },
        ChatType::Dm => match gating::evaluate_dm(
            &config.dm_policy,
            &config.allow_from,
            CHANNEL_TYPE,
            &msg.sender_id,
        ) {
            DmAccess::Granted => AccessDecision::Granted {
                pairing_gated: false,
            },
            DmAccess::PairingGated => AccessDecision::Granted {
                pairing_gated: true,
            },
            DmAccess::Denied => AccessDecision::Denied,
        },
    }
}

/// One-shot notice sent to a denied DM sender. Contains the sender's
/// resolvable identifier so an operator can allow-list it.
#[must_use]
pub fn denial_notice(sender_id: &str) -> String {
    format!(
        "You are not authorized to use this bot. \
         Ask an operator to add `{sender_id}` to the allow list."
    )
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        pontoon_channels::gating::DmPolicy,
        pontoon_common::types::ChatType,
        crate::inbound::{OutgoingWebhookPayload, normalize},
    };

    fn dm_message(sender: &str) -> InboundMessage {
        normalize(&OutgoingWebhookPayload {
            user_id: Some(sender.into()),
            text: Some("hi".into()),
            ..Default::default()
        })
        .unwrap()
    }

    fn group_message(sender: &str) -> InboundMessage {
        normalize(&OutgoingWebhookPayload {
            user_id: Some(sender.into()),
            channel_name: Some("dev".into()),
            text: Some("hi".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn open_dm_grants() {
        let config = RocketChatAccountConfig::default();
        assert_eq!(
            check_access(&config, &dm_message("u1")),
            AccessDecision::Granted {
                pairing_gated: false
            }
        );
    }

    #[test]
    fn pairing_dm_grants_with_flag() {
        let config = RocketChatAccountConfig {
            dm_policy: DmPolicy::Pairing,
            ..Default::default()
        };
        assert_eq!(
            check_access(&config, &dm_message("u1")),
            AccessDecision::Granted { pairing_gated: true }
        );
    }

    #[test]
    fn allowlist_dm_denies_unknown_sender() {
        let config = RocketChatAccountConfig {
            dm_policy: DmPolicy::Allowlist,
            allow_from: vec!["u2".into()],
            ..Default::default()
        };
        assert_eq!(check_access(&config, &dm_message("u1")), AccessDecision::Denied);
        assert!(check_access(&config, &dm_message("u2")).granted());
    }

    #[test]
    fn group_messages_bypass_dm_policy() {
        let config = RocketChatAccountConfig {
            dm_policy: DmPolicy::Allowlist,
            allow_from: vec!["someone-else".into()],
            ..Default::default()
        };
        let msg = group_message("u1");
        assert_eq!(msg.chat_type, ChatType::Group);
        assert!(check_access(&config, &msg).granted());
    }

    #[test]
    fn denial_notice_contains_sender_id() {
        assert!(denial_notice("u1").contains("u1"));
    }
}
