//! Sender access policies shared by every channel plugin.
//!
//! Allow-lists are matched case-insensitively. Operators may paste
//! identifiers copied from provider UIs, so entries carrying a
//! `provider:` prefix (e.g. `rocketchat:u1`) are normalized by stripping
//! exactly one leading prefix. A single `*` entry opens the list to
//! everyone; an empty list means no restriction was configured.

use serde::{Deserialize, Serialize};

/// Normalize an allow-list entry for comparison: trim, lowercase, and
/// strip one leading `{provider}:` prefix if present.
#[must_use]
pub fn normalize_entry(entry: &str, provider: &str) -> String {
    let lowered = entry.trim().to_lowercase();
    let prefix = format!("{}:", provider.to_lowercase());
    match lowered.strip_prefix(&prefix) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => lowered,
    }
}

/// Check whether a sender is permitted by an allow-list.
///
/// An empty list means no explicit restriction (open); a `*` entry allows
/// any sender, including an empty one.
#[must_use]
pub fn is_allowed(sender_id: &str, allowlist: &[String], provider: &str) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    if allowlist.iter().any(|entry| entry.trim() == "*") {
        return true;
    }
    let sender = sender_id.trim().to_lowercase();
    allowlist
        .iter()
        .any(|entry| normalize_entry(entry, provider) == sender)
}

/// DM access policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DmPolicy {
    /// Anyone can DM the bot.
    #[default]
    Open,
    /// The host pairing subsystem confirms each sender.
    Pairing,
    /// Only senders on the allow-list.
    Allowlist,
}

/// Group access policy. The value itself is consumed by the host's
/// mention-gating; channels only carry it on the envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupPolicy {
    /// Bot responds in all groups.
    #[default]
    Open,
    /// Only groups/senders on the allow-list.
    Allowlist,
}

/// Outcome of evaluating a DM sender against the account policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmAccess {
    /// Sender may interact.
    Granted,
    /// Sender may be routed, but the host pairing check still gates the
    /// conversation downstream.
    PairingGated,
    /// Sender is rejected; the caller owes them one denial notice.
    Denied,
}

/// Pure policy evaluation for direct messages.
#[must_use]
pub fn evaluate_dm(
    policy: &DmPolicy,
    allowlist: &[String],
    provider: &str,
    sender_id: &str,
) -> DmAccess {
    match policy {
        DmPolicy::Open => DmAccess::Granted,
        DmPolicy::Pairing => DmAccess::PairingGated,
        DmPolicy::Allowlist => {
            if is_allowed(sender_id, allowlist, provider) {
                DmAccess::Granted
            } else {
                DmAccess::Denied
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    const PROVIDER: &str = "rocketchat";

    #[test]
    fn empty_allowlist_is_open() {
        assert!(is_allowed("anyone", &[], PROVIDER));
    }

    #[test]
    fn wildcard_allows_everyone_including_empty_sender() {
        let list = vec!["*".to_string()];
        assert!(is_allowed("alice", &list, PROVIDER));
        assert!(is_allowed("", &list, PROVIDER));
        let mixed = vec!["bob".to_string(), " * ".to_string()];
        assert!(is_allowed("eve", &mixed, PROVIDER));
    }

    #[rstest]
    #[case("rocketchat:u1", "u1")]
    #[case("RocketChat:U1", "u1")]
    #[case("ROCKETCHAT:Alice", "alice")]
    #[case("alice", "alice")]
    #[case("  Bob  ", "bob")]
    fn normalize_strips_one_prefix_and_lowercases(#[case] entry: &str, #[case] expected: &str) {
        assert_eq!(normalize_entry(entry, PROVIDER), expected);
    }

    #[test]
    fn normalize_strips_only_the_first_prefix() {
        assert_eq!(
            normalize_entry("rocketchat:rocketchat:u1", PROVIDER),
            "rocketchat:u1"
        );
    }

    #[test]
    fn matching_is_case_insensitive_on_both_sides() {
        let list = vec!["Alice".to_string(), "rocketchat:BOB".to_string()];
        assert!(is_allowed("ALICE", &list, PROVIDER));
        assert!(is_allowed("bob", &list, PROVIDER));
        assert!(!is_allowed("charlie", &list, PROVIDER));
    }

    #[test]
    fn open_policy_grants_all() {
        assert_eq!(
            evaluate_dm(&DmPolicy::Open, &["x".into()], PROVIDER, "anyone"),
            DmAccess::Granted
        );
    }

    #[test]
    fn pairing_policy_defers_to_host() {
        assert_eq!(
            evaluate_dm(&DmPolicy::Pairing, &[], PROVIDER, "anyone"),
            DmAccess::PairingGated
        );
    }

    #[test]
    fn allowlist_with_empty_list_falls_back_to_open() {
        assert_eq!(
            evaluate_dm(&DmPolicy::Allowlist, &[], PROVIDER, "anyone"),
            DmAccess::Granted
        );
    }

    #[test]
    fn allowlist_denies_unknown_sender() {
        let list = vec!["u2".to_string()];
        assert_eq!(
            evaluate_dm(&DmPolicy::Allowlist, &list, PROVIDER, "u1"),
            DmAccess::Denied
        );
        assert_eq!(
            evaluate_dm(&DmPolicy::Allowlist, &list, PROVIDER, "u2"),
            DmAccess::Granted
        );
    }

    #[test]
    fn policies_deserialize_from_lowercase() {
        assert_eq!(
            serde_json::from_str::<DmPolicy>("\"pairing\"").unwrap(),
            DmPolicy::Pairing
        );
        assert_eq!(
            serde_json::from_str::<GroupPolicy>("\"allowlist\"").unwrap(),
            GroupPolicy::Allowlist
        );
    }
}
