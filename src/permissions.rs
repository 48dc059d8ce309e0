//! Moderation permission checks

use tracing::warn;

use crate::ERROR_TARGET;
use crate::directory::Directory;
use crate::ids::{ChatId, UserId};

/// Whether the actor is the configured bot owner.
///
/// Decided locally, never against the platform, so the owner keeps control
/// even when the remote API is unreachable.
#[must_use]
pub fn is_owner(actor: UserId, owner: UserId) -> bool {
    actor == owner
}

/// Whether the actor may invoke moderation verbs in the given chat.
///
/// The owner always may. Anyone else needs a chat context and a confirmed
/// admin flag from the directory; a missing chat (direct dialog) or a failed
/// lookup denies.
pub async fn can_moderate(
    directory: &dyn Directory,
    owner: UserId,
    actor: UserId,
    chat: Option<ChatId>,
) -> bool {
    if is_owner(actor, owner) {
        return true;
    }
    let Some(chat) = chat else {
        return false;
    };
    match directory.is_chat_admin(chat, actor).await {
        Ok(is_admin) => is_admin,
        Err(err) => {
            warn!(
                target: ERROR_TARGET,
                chat_id = %chat,
                user_id = %actor,
                error = %err,
                "Admin lookup failed, denying moderation"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryError, MockDirectory};

    const OWNER: UserId = UserId(100);

    #[tokio::test]
    async fn test_owner_bypasses_directory() {
        // No expectations set: any directory call would panic
        let directory = MockDirectory::new();
        assert!(can_moderate(&directory, OWNER, OWNER, Some(ChatId(5))).await);
        assert!(can_moderate(&directory, OWNER, OWNER, None).await);
    }

    #[tokio::test]
    async fn test_non_owner_needs_chat_context() {
        let directory = MockDirectory::new();
        assert!(!can_moderate(&directory, OWNER, UserId(7), None).await);
    }

    #[tokio::test]
    async fn test_chat_admin_may_moderate() {
        let mut directory = MockDirectory::new();
        directory
            .expect_is_chat_admin()
            .returning(|_, _| Ok(true));
        assert!(can_moderate(&directory, OWNER, UserId(7), Some(ChatId(5))).await);
    }

    #[tokio::test]
    async fn test_plain_member_may_not_moderate() {
        let mut directory = MockDirectory::new();
        directory
            .expect_is_chat_admin()
            .returning(|_, _| Ok(false));
        assert!(!can_moderate(&directory, OWNER, UserId(7), Some(ChatId(5))).await);
    }

    #[tokio::test]
    async fn test_lookup_failure_denies() {
        let mut directory = MockDirectory::new();
        directory.expect_is_chat_admin().returning(|_, _| {
            Err(DirectoryError::Malformed("no members".to_string()))
        });
        assert!(!can_moderate(&directory, OWNER, UserId(7), Some(ChatId(5))).await);
    }
}
