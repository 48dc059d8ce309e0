//! Thin typed wrapper over the VK method API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ERROR_TARGET;
use crate::directory::{Directory, DirectoryResult};
use crate::ids::{ChatId, MessageId, PeerId, UserId};
use crate::vk::types::{ApiEnvelope, ConversationMembers, LongPollResponse, LongPollSession};

const API_BASE: &str = "https://api.vk.com/method";
const API_VERSION: &str = "5.199";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Seconds the long poll server holds a request open before answering.
const LONG_POLL_WAIT: &str = "25";
/// Client-side cap on one poll cycle; must exceed the server-side wait.
const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated VK API client.
///
/// Carries a group access token and implements [`Directory`] on top of the
/// `messages.*` and `utils.*` method families.
pub struct VkClient {
    http: Client,
    token: String,
}

impl VkClient {
    /// Build a client around the given group access token.
    pub fn new(token: impl Into<String>) -> DirectoryResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            token: token.into(),
        })
    }

    /// Call one API method and unwrap the response envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> DirectoryResult<T> {
        let url = format!("{API_BASE}/{method}");
        let mut form = params.to_vec();
        form.push(("access_token", self.token.clone()));
        form.push(("v", API_VERSION.to_string()));
        let envelope: ApiEnvelope<T> = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await?
            .json()
            .await?;
        envelope.into_result()
    }

    /// Fetch fresh long poll connection details for the group.
    pub async fn long_poll_server(&self, group_id: i64) -> DirectoryResult<LongPollSession> {
        self.call(
            "groups.getLongPollServer",
            &[("group_id", group_id.to_string())],
        )
        .await
    }

    /// Run one long poll cycle against an established session.
    ///
    /// Long poll responses come from the poll server directly and are not
    /// wrapped in the usual envelope.
    pub async fn long_poll_check(
        &self,
        session: &LongPollSession,
    ) -> DirectoryResult<LongPollResponse> {
        let response = self
            .http
            .get(&session.server)
            .query(&[
                ("act", "a_check"),
                ("key", session.key.as_str()),
                ("ts", session.ts.as_str()),
                ("wait", LONG_POLL_WAIT),
            ])
            .timeout(LONG_POLL_TIMEOUT)
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl Directory for VkClient {
    async fn send_message(&self, peer: PeerId, text: &str) -> DirectoryResult<()> {
        let random_id: i32 = rand::random();
        self.call::<Value>(
            "messages.send",
            &[
                ("peer_id", peer.to_string()),
                ("random_id", random_id.to_string()),
                ("message", text.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn delete_messages(
        &self,
        peer: PeerId,
        message_ids: Vec<MessageId>,
    ) -> DirectoryResult<()> {
        if message_ids.is_empty() {
            return Ok(());
        }
        let csv = message_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let batch = self
            .call::<Value>(
                "messages.delete",
                &[
                    ("peer_id", peer.to_string()),
                    ("message_ids", csv),
                    ("delete_for_all", "1".to_string()),
                ],
            )
            .await;
        let Err(batch_err) = batch else {
            return Ok(());
        };

        // Batch deletion fails wholesale if any id is undeletable, so retry
        // one by one and settle for whatever goes through.
        warn!(
            target: ERROR_TARGET,
            peer_id = %peer,
            error = %batch_err,
            "Batch message deletion failed, retrying individually"
        );
        let mut any_deleted = false;
        for id in &message_ids {
            match self
                .call::<Value>(
                    "messages.delete",
                    &[
                        ("peer_id", peer.to_string()),
                        ("message_ids", id.to_string()),
                        ("delete_for_all", "1".to_string()),
                    ],
                )
                .await
            {
                Ok(_) => any_deleted = true,
                Err(err) => warn!(
                    target: ERROR_TARGET,
                    peer_id = %peer,
                    message_id = %id,
                    error = %err,
                    "Message deletion failed"
                ),
            }
        }
        if any_deleted { Ok(()) } else { Err(batch_err) }
    }

    async fn remove_chat_user(&self, chat: ChatId, user: UserId) -> DirectoryResult<()> {
        let direct = self
            .call::<Value>(
                "messages.removeConversationUser",
                &[
                    ("peer_id", chat.peer_id().to_string()),
                    ("member_id", user.to_string()),
                ],
            )
            .await;
        match direct {
            Ok(_) => Ok(()),
            Err(err) => {
                // Older chats only accept the legacy removal method
                debug!(
                    target: ERROR_TARGET,
                    chat_id = %chat,
                    user_id = %user,
                    error = %err,
                    "Direct removal failed, trying legacy method"
                );
                self.call::<Value>(
                    "messages.removeChatUser",
                    &[
                        ("chat_id", chat.to_string()),
                        ("member_id", user.to_string()),
                    ],
                )
                .await
                .map(|_| ())
            }
        }
    }

    async fn is_chat_admin(&self, chat: ChatId, user: UserId) -> DirectoryResult<bool> {
        let members: ConversationMembers = self
            .call(
                "messages.getConversationMembers",
                &[("peer_id", chat.peer_id().to_string())],
            )
            .await?;
        Ok(members
            .items
            .iter()
            .any(|member| member.member_id == user.0 && (member.is_admin || member.is_owner)))
    }

    async fn resolve_screen_name(&self, name: &str) -> DirectoryResult<Option<UserId>> {
        let trimmed = name.trim_start_matches('@');
        if trimmed.is_empty() {
            return Ok(None);
        }
        // Unknown names come back as an empty array rather than an object,
        // so this stays a Value until the shape is known.
        let resolved: Value = self
            .call(
                "utils.resolveScreenName",
                &[("screen_name", trimmed.to_string())],
            )
            .await?;
        let user = resolved.as_object().and_then(|object| {
            if object.get("object_type").and_then(Value::as_str) != Some("user") {
                return None;
            }
            object.get("object_id").and_then(Value::as_i64)
        });
        Ok(user.map(UserId))
    }
}
