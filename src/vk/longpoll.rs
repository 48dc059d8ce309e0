//! Group long poll loop.
//!
//! Holds one long poll session at a time, advances its cursor, translates
//! raw updates into engine events and hands each one to a task of its own.
//! The loop never exits; every failure mode ends in a reconnect.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::enforcement::{
    EnforcementEngine, InboundMessage, MembershipChange, MembershipEvent,
};
use crate::ids::UserId;
use crate::vk::client::VkClient;
use crate::vk::types::{MessageNewObject, Update};
use crate::{ERROR_TARGET, EVENT_TARGET};

/// Delay before retrying a failed session handshake.
const SESSION_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Delay before reconnecting after a failed poll cycle.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

/// A long poll update translated into engine input.
#[derive(Debug)]
pub enum InboundEvent {
    Message(InboundMessage),
    Membership(MembershipEvent),
}

/// Drives the group long poll stream.
pub struct LongPoller {
    client: Arc<VkClient>,
    group_id: i64,
}

impl LongPoller {
    #[must_use]
    pub fn new(client: Arc<VkClient>, group_id: i64) -> Self {
        Self { client, group_id }
    }

    /// Poll forever, dispatching each translated event to the engine on
    /// its own task so a slow command cannot stall the stream.
    pub async fn run(&self, engine: Arc<EnforcementEngine>) {
        loop {
            let mut session = match self.client.long_poll_server(self.group_id).await {
                Ok(session) => session,
                Err(err) => {
                    warn!(
                        target: ERROR_TARGET,
                        error = %err,
                        "Long poll session request failed, retrying"
                    );
                    tokio::time::sleep(SESSION_RETRY_DELAY).await;
                    continue;
                }
            };
            info!(
                target: EVENT_TARGET,
                server = %session.server,
                "Long poll session established"
            );

            loop {
                let response = match self.client.long_poll_check(&session).await {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(
                            target: ERROR_TARGET,
                            error = %err,
                            "Long poll cycle failed, reconnecting"
                        );
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        break;
                    }
                };

                if let Some(failed) = response.failed {
                    // Code 1 means the cursor fell behind and a fresh one is
                    // attached; any other code invalidates the session.
                    if failed == 1 {
                        if let Some(ts) = response.ts {
                            session.ts = ts;
                        }
                        continue;
                    }
                    debug!(target: EVENT_TARGET, failed, "Long poll session expired");
                    break;
                }
                if let Some(ts) = response.ts {
                    session.ts = ts;
                }

                for update in response.updates {
                    if let Some(event) = translate(update) {
                        let engine = Arc::clone(&engine);
                        tokio::spawn(async move {
                            dispatch(&engine, event).await;
                        });
                    }
                }
            }
        }
    }
}

async fn dispatch(engine: &EnforcementEngine, event: InboundEvent) {
    match event {
        InboundEvent::Message(message) => engine.handle_message(message).await,
        InboundEvent::Membership(event) => engine.handle_membership_event(event).await,
    }
}

/// Turn one raw update into engine input, or nothing if the update is not
/// moderation material.
///
/// A `chat_kick_user` service action covers both voluntary leaves (the
/// member removed themselves) and kicks; either way it becomes a
/// [`MembershipEvent`]. Negative member ids are community bots and are
/// ignored. Every other `message_new` flows through as a plain message.
fn translate(update: Update) -> Option<InboundEvent> {
    if update.kind != "message_new" {
        return None;
    }
    let object: MessageNewObject = serde_json::from_value(update.object).ok()?;
    let message = object.message;

    if let Some(action) = &message.action {
        if action.kind == "chat_kick_user" {
            let member = action.member_id?;
            if member <= 0 {
                return None;
            }
            let user = UserId(member);
            let change = if user == message.from_id {
                MembershipChange::Left
            } else {
                MembershipChange::Kicked
            };
            return Some(InboundEvent::Membership(MembershipEvent {
                peer: message.peer_id,
                change,
                user,
                actor: Some(message.from_id).filter(|actor| *actor != user),
            }));
        }
    }

    Some(InboundEvent::Message(InboundMessage {
        peer: message.peer_id,
        from: message.from_id,
        text: message.text,
        message_id: message.id.filter(|id| id.0 != 0),
    }))
}
