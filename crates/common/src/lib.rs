//! Shared message types used across all pontoon crates.

pub mod types;

pub use types::{ChatType, MediaRef, MsgContext, ReplyPayload};
