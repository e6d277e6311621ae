use serde::{Deserialize, Serialize};

/// Stable identifier threading consecutive messages into one conversation.
///
/// Peer-scoped keys look like `agent:main:rocketchat:acct:user:u1`; every
/// agent additionally has a single main key (`agent:main:main`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Key for a peer-scoped conversation.
    #[must_use]
    pub fn for_peer(
        agent_id: &str,
        channel: &str,
        account_id: &str,
        peer_kind: &str,
        peer_id: &str,
    ) -> Self {
        Self(
            format!("agent:{agent_id}:{channel}:{account_id}:{peer_kind}:{peer_id}").to_lowercase(),
        )
    }

    /// The agent's main session key.
    #[must_use]
    pub fn main(agent_id: &str) -> Self {
        Self(format!("agent:{agent_id}:main").to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_key_format() {
        let key = SessionKey::for_peer("main", "rocketchat", "acct1", "user", "U1");
        assert_eq!(key.as_str(), "agent:main:rocketchat:acct1:user:u1");
    }

    #[test]
    fn main_key_format() {
        assert_eq!(SessionKey::main("Main").as_str(), "agent:main:main");
    }

    #[test]
    fn same_inputs_same_key() {
        let a = SessionKey::for_peer("main", "rocketchat", "a", "user", "u1");
        let b = SessionKey::for_peer("main", "rocketchat", "a", "user", "u1");
        assert_eq!(a, b);
    }
}
