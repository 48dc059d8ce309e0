//! Moderation state and enforcement for Chat Warden
//!
//! This module owns everything the bot persists (known chats, silence
//! flags, mutes, bans) and the per-event state machine that applies
//! moderation rules to inbound messages and membership changes.

mod engine;
mod error;
mod store;

pub use engine::{EnforcementEngine, InboundMessage, MembershipChange, MembershipEvent};
pub use error::{StoreError, StoreResult};
pub use store::{ModerationStore, MuteExpiry};
