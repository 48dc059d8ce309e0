//! Serde types for the VK method API and group long poll wire formats.

use serde::Deserialize;

use crate::directory::{DirectoryError, DirectoryResult};
use crate::ids::{MessageId, PeerId, UserId};

/// Standard envelope around every method API response.
///
/// VK returns either `{"response": ...}` or `{"error": {...}}`, never a
/// plain payload.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub response: Option<T>,
    pub error: Option<ApiError>,
}

/// The `error` object of a failed method call.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub error_code: i64,
    pub error_msg: String,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the envelope into the payload or a typed API error.
    pub fn into_result(self) -> DirectoryResult<T> {
        if let Some(error) = self.error {
            return Err(DirectoryError::Api {
                code: error.error_code,
                message: error.error_msg,
            });
        }
        self.response
            .ok_or_else(|| DirectoryError::Malformed("envelope carries no payload".to_string()))
    }
}

/// Connection details from `groups.getLongPollServer`.
///
/// `ts` is a cursor the poll loop advances after every response; VK sends
/// it as a string and expects it back verbatim.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LongPollSession {
    pub key: String,
    pub server: String,
    pub ts: String,
}

/// One long poll cycle: either updates plus the next cursor, or a
/// `failed` code asking the client to resync.
#[derive(Debug, Deserialize)]
pub struct LongPollResponse {
    pub ts: Option<String>,
    #[serde(default)]
    pub updates: Vec<Update>,
    pub failed: Option<i64>,
}

/// A single raw long poll update.
///
/// The payload shape depends on `kind`, so it stays a [`serde_json::Value`]
/// until the update type is known.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(rename = "type")]
    pub kind: String,
    pub object: serde_json::Value,
}

/// Payload of a `message_new` update.
#[derive(Debug, Deserialize)]
pub struct MessageNewObject {
    pub message: WireMessage,
}

/// A message as it appears on the wire.
///
/// Community messages often come with `id: 0`; callers treat that the same
/// as an absent id.
#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub id: Option<MessageId>,
    pub peer_id: PeerId,
    pub from_id: UserId,
    #[serde(default)]
    pub text: String,
    pub action: Option<ServiceAction>,
}

/// Service action attached to a chat event message, such as a member
/// being invited or kicked.
#[derive(Debug, Deserialize)]
pub struct ServiceAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub member_id: Option<i64>,
}

/// Response of `messages.getConversationMembers`.
#[derive(Debug, Deserialize)]
pub struct ConversationMembers {
    pub items: Vec<ConversationMember>,
}

/// One member row; `is_admin`/`is_owner` are simply absent for plain
/// members.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConversationMember {
    pub member_id: i64,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_owner: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_with_payload_unwraps() {
        let envelope: ApiEnvelope<i64> =
            serde_json::from_value(json!({"response": 41})).unwrap();
        assert_eq!(envelope.into_result().unwrap(), 41);
    }

    #[test]
    fn test_envelope_with_error_becomes_api_error() {
        let envelope: ApiEnvelope<i64> = serde_json::from_value(json!({
            "error": {"error_code": 15, "error_msg": "Access denied"}
        }))
        .unwrap();
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.to_string(), "api error 15: Access denied");
    }

    #[test]
    fn test_empty_envelope_is_malformed() {
        let envelope: ApiEnvelope<i64> = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            envelope.into_result(),
            Err(DirectoryError::Malformed(_))
        ));
    }

    #[test]
    fn test_long_poll_response_with_updates() {
        let response: LongPollResponse = serde_json::from_value(json!({
            "ts": "1830",
            "updates": [
                {"type": "message_new", "object": {"message": {"id": 7, "peer_id": 2000000001i64, "from_id": 42, "text": "hi"}}}
            ]
        }))
        .unwrap();
        assert_eq!(response.ts.as_deref(), Some("1830"));
        assert_eq!(response.updates.len(), 1);
        assert_eq!(response.updates[0].kind, "message_new");
        assert_eq!(response.failed, None);
    }

    #[test]
    fn test_long_poll_failure_has_no_updates() {
        let response: LongPollResponse =
            serde_json::from_value(json!({"failed": 2})).unwrap();
        assert_eq!(response.failed, Some(2));
        assert!(response.updates.is_empty());
    }

    #[test]
    fn test_wire_message_with_service_action() {
        let message: WireMessage = serde_json::from_value(json!({
            "id": 0,
            "peer_id": 2000000005i64,
            "from_id": 7,
            "action": {"type": "chat_kick_user", "member_id": 42}
        }))
        .unwrap();
        assert_eq!(message.id, Some(MessageId(0)));
        assert_eq!(message.peer_id, PeerId(2_000_000_005));
        assert_eq!(message.text, "");
        let action = message.action.unwrap();
        assert_eq!(action.kind, "chat_kick_user");
        assert_eq!(action.member_id, Some(42));
    }

    #[test]
    fn test_plain_member_has_no_flags() {
        let members: ConversationMembers = serde_json::from_value(json!({
            "items": [
                {"member_id": 42},
                {"member_id": 7, "is_admin": true},
                {"member_id": 9, "is_owner": true}
            ]
        }))
        .unwrap();
        assert!(!members.items[0].is_admin && !members.items[0].is_owner);
        assert!(members.items[1].is_admin);
        assert!(members.items[2].is_owner);
    }

    #[test]
    fn test_long_poll_session_round_trips_ts_as_string() {
        let session: LongPollSession = serde_json::from_value(json!({
            "key": "abc123",
            "server": "https://lp.vk.com/whp/123",
            "ts": "10"
        }))
        .unwrap();
        assert_eq!(session.ts, "10");
    }
}
