//! Remote platform capabilities consumed by the enforcement engine
//!
//! The engine never talks to the platform directly; everything it needs from
//! the outside world is captured by the [`Directory`] trait so enforcement
//! logic can be exercised against a mock.

use async_trait::async_trait;
use thiserror::Error;

use crate::ids::{ChatId, MessageId, PeerId, UserId};

/// Errors surfaced by a directory implementation
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Network-level failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The platform rejected the call
    #[error("api error {code}: {message}")]
    Api { code: i64, message: String },

    /// The platform answered with something unexpected
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Remote operations the moderation engine relies on.
///
/// Every method returns a `Result`; the caller decides per call site whether
/// a failure aborts, degrades, or is swallowed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Directory: Send + Sync {
    /// Post a text message to a peer.
    async fn send_message(&self, peer: PeerId, text: &str) -> DirectoryResult<()>;

    /// Delete messages in a peer, for all participants.
    async fn delete_messages(&self, peer: PeerId, message_ids: Vec<MessageId>)
        -> DirectoryResult<()>;

    /// Remove a member from a group chat.
    async fn remove_chat_user(&self, chat: ChatId, user: UserId) -> DirectoryResult<()>;

    /// Whether the user is an admin or the owner of the chat.
    async fn is_chat_admin(&self, chat: ChatId, user: UserId) -> DirectoryResult<bool>;

    /// Resolve a screen name to a user id; `None` if it does not name a user.
    async fn resolve_screen_name(&self, name: &str) -> DirectoryResult<Option<UserId>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DirectoryError::Api {
            code: 15,
            message: "Access denied".to_string(),
        };
        assert_eq!(error.to_string(), "api error 15: Access denied");

        let error = DirectoryError::Malformed("missing response field".to_string());
        assert_eq!(
            error.to_string(),
            "malformed response: missing response field"
        );
    }
}
