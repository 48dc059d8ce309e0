//! VK Bots API transport
//!
//! Everything that talks HTTP lives here: the [`VkClient`] wrapper around
//! the method API (which is also the crate's [`Directory`] implementation),
//! the wire types those calls deserialize into, and the [`LongPoller`] that
//! turns the group long poll stream into engine events.
//!
//! [`Directory`]: crate::directory::Directory

mod client;
mod longpoll;
mod types;

pub use client::VkClient;
pub use longpoll::{InboundEvent, LongPoller};
pub use types::{
    ApiEnvelope, ApiError, ConversationMember, ConversationMembers, LongPollResponse,
    LongPollSession, Update, WireMessage,
};
