//! Identifier newtypes for the VK platform
//!
//! Peer ids are transport routing addresses: ids at or above
//! [`CHAT_PEER_BASE`] address group conversations, everything below is a
//! direct dialog. Chat ids are the stable conversation numbers used by the
//! chat-level API methods and by the moderation store.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Offset VK adds to a conversation id to form its peer id.
pub const CHAT_PEER_BASE: i64 = 2_000_000_000;

/// Routing address of a conversation or direct dialog.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, From, Into, Serialize, Deserialize,
)]
pub struct PeerId(pub i64);

/// Stable numeric id of a group conversation.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into, Serialize,
    Deserialize,
)]
pub struct ChatId(pub i64);

/// Numeric id of a user account.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into, Serialize,
    Deserialize,
)]
pub struct UserId(pub i64);

/// Numeric id of a message within a peer.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, From, Into, Serialize, Deserialize,
)]
pub struct MessageId(pub i64);

impl PeerId {
    /// The conversation behind this peer, or `None` for a direct dialog.
    #[must_use]
    pub fn chat_id(self) -> Option<ChatId> {
        if self.0 >= CHAT_PEER_BASE {
            Some(ChatId(self.0 - CHAT_PEER_BASE))
        } else {
            None
        }
    }
}

impl ChatId {
    /// Peer id addressing this conversation.
    #[must_use]
    pub fn peer_id(self) -> PeerId {
        PeerId(self.0 + CHAT_PEER_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_peer_round_trip() {
        let chat = ChatId(5);
        assert_eq!(chat.peer_id(), PeerId(2_000_000_005));
        assert_eq!(chat.peer_id().chat_id(), Some(chat));
    }

    #[test]
    fn test_direct_dialog_has_no_chat() {
        assert_eq!(PeerId(123_456).chat_id(), None);
        // The base itself is the first conversation address
        assert_eq!(PeerId(CHAT_PEER_BASE).chat_id(), Some(ChatId(0)));
        assert_eq!(PeerId(CHAT_PEER_BASE - 1).chat_id(), None);
    }

    #[test]
    fn test_display_is_bare_number() {
        assert_eq!(UserId(42).to_string(), "42");
        assert_eq!(PeerId(2_000_000_005).to_string(), "2000000005");
    }
}
