//! Session storage and continuity tracking.
//!
//! Sessions are threaded by a stable [`SessionKey`]; inbound context is
//! persisted as JSONL (one record per line) with file locking for
//! concurrent access. The [`store::SessionStore`] trait is the boundary to
//! the host's own storage when pontoon runs embedded.

pub mod key;
pub mod store;

pub use {
    key::SessionKey,
    store::{InboundRecord, JsonlSessionStore, SessionStore, record_inbound_detached},
};
