//! Per-event enforcement state machine
//!
//! One [`EnforcementEngine`] call handles one inbound event end to end:
//! registering the chat, sweeping expired mutes, suppressing muted senders,
//! then parsing and executing a moderation command if there is one. The
//! engine holds no state of its own; everything durable lives in the
//! [`ModerationStore`] and everything remote goes through the
//! [`Directory`] seam.
//!
//! Nothing in here returns an error to the caller. Remote and store
//! failures are funneled through one best-effort helper so a single bad
//! call never stops the event, and a single bad event never stops the bot.

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::commands::{self, Target, Verb};
use crate::directory::Directory;
use crate::enforcement::{ModerationStore, MuteExpiry};
use crate::ids::{ChatId, MessageId, PeerId, UserId};
use crate::permissions;
use crate::{COMMAND_TARGET, ERROR_TARGET, EVENT_TARGET};

/// An inbound chat message as seen by the engine.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub peer: PeerId,
    pub from: UserId,
    pub text: String,
    pub message_id: Option<MessageId>,
}

/// How a member came to leave a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// The member left on their own
    Left,
    /// The member was removed by someone else
    Kicked,
}

/// A member leaving or being removed from a chat.
#[derive(Debug, Clone)]
pub struct MembershipEvent {
    pub peer: PeerId,
    pub change: MembershipChange,
    pub user: UserId,
    /// Who performed the removal, when known
    pub actor: Option<UserId>,
}

/// The moderation decision engine.
///
/// Stateless across calls; clones share the same store and directory.
#[derive(Clone)]
pub struct EnforcementEngine {
    store: ModerationStore,
    directory: Arc<dyn Directory>,
    owner_id: UserId,
}

impl EnforcementEngine {
    /// Create an engine over the given store and directory.
    #[must_use]
    pub fn new(store: ModerationStore, directory: Arc<dyn Directory>, owner_id: UserId) -> Self {
        Self {
            store,
            directory,
            owner_id,
        }
    }

    /// Process one inbound message.
    ///
    /// Steps, in order: derive the chat from the peer, register the chat,
    /// sweep expired mutes everywhere, suppress the message if the sender
    /// is muted, then parse and run a moderation command if the text is
    /// one. Failures along the way are logged and the rest of the steps
    /// continue; this method never fails.
    pub async fn handle_message(&self, message: InboundMessage) {
        let chat = message.peer.chat_id();

        if let Some(chat) = chat {
            best_effort("register chat", self.store.register_chat(chat).await);
        }

        self.sweep_expired_mutes().await;

        // Sender mute status is evaluated after the sweep, so a mute that
        // just lapsed no longer suppresses its own lift announcement.
        if let Some(chat) = chat {
            let expiry = best_effort(
                "read sender mute",
                self.store.mute_expiry(chat, message.from).await,
            )
            .flatten();
            if let Some(expiry) = expiry {
                if expiry.active_at(Utc::now()) {
                    self.suppress_muted(&message, expiry).await;
                    return;
                }
            }
        }

        let Some(command) = commands::parse(&message.text) else {
            return;
        };

        info!(
            target: COMMAND_TARGET,
            command = %command.verb,
            peer_id = %message.peer,
            user_id = %message.from,
            "Moderation command received"
        );

        if !permissions::can_moderate(self.directory.as_ref(), self.owner_id, message.from, chat)
            .await
        {
            self.notify(
                message.peer,
                "This command is available only to the bot owner and chat admins.",
            )
            .await;
            return;
        }

        match command.verb {
            Verb::Kick => self.cmd_kick(message.peer, chat, &command.arg).await,
            Verb::Ban => self.cmd_ban(message.peer, &command.arg, message.from).await,
            Verb::Mute => self.cmd_mute(message.peer, chat, &command.arg).await,
            Verb::Unmute => self.cmd_unmute(message.peer, chat, &command.arg).await,
        }
    }

    /// Process a member leaving or being removed from a chat.
    ///
    /// Either way the user is removed from every other known chat, so
    /// leaving one chat means leaving the whole network.
    pub async fn handle_membership_event(&self, event: MembershipEvent) {
        info!(
            target: EVENT_TARGET,
            peer_id = %event.peer,
            user_id = %event.user,
            change = ?event.change,
            "Membership change observed"
        );
        self.autokick_across_chats(event.user, event.peer.chat_id())
            .await;
    }

    /// Delete expired mute rows everywhere and announce each lift.
    ///
    /// Runs on every message, so expiry needs no timer: any traffic
    /// anywhere retires lapsed mutes in all chats.
    async fn sweep_expired_mutes(&self) {
        let Some(expired) = best_effort(
            "list expired mutes",
            self.store.expired_mutes(Utc::now()).await,
        ) else {
            return;
        };
        for (chat, user) in expired {
            if best_effort(
                "clear expired mute",
                self.store.unset_muted(chat, user).await,
            )
            .is_none()
            {
                continue;
            }
            info!(target: EVENT_TARGET, chat_id = %chat, user_id = %user, "Mute expired");
            self.notify(
                chat.peer_id(),
                &format!("✅ Mute for user id{user} has been lifted (time expired)."),
            )
            .await;
        }
    }

    /// Delete a muted sender's message and announce why.
    async fn suppress_muted(&self, message: &InboundMessage, expiry: MuteExpiry) {
        info!(
            target: EVENT_TARGET,
            peer_id = %message.peer,
            user_id = %message.from,
            "Suppressing message from muted user"
        );
        if let Some(message_id) = message.message_id {
            best_effort(
                "delete muted message",
                self.directory
                    .delete_messages(message.peer, vec![message_id])
                    .await,
            );
        }
        self.notify(
            message.peer,
            &format!(
                "⛔ Message from id{} was removed (muted until {}).",
                message.from,
                expiry_label(expiry)
            ),
        )
        .await;
    }

    async fn cmd_kick(&self, peer: PeerId, chat: Option<ChatId>, arg: &str) {
        let Some(chat) = chat else {
            self.notify(peer, "The /kick command only works in group chats.")
                .await;
            return;
        };
        let Some(target) = self.resolve_target(arg).await else {
            self.notify(peer, "Could not identify the user. Specify @name or an id.")
                .await;
            return;
        };
        if permissions::is_owner(target, self.owner_id) {
            self.notify(peer, "You cannot kick the bot owner.").await;
            return;
        }
        // Unknown admin status counts as not admin; only the permission
        // gate fails closed.
        if best_effort(
            "check target admin status",
            self.directory.is_chat_admin(chat, target).await,
        )
        .unwrap_or(false)
        {
            self.notify(peer, "You cannot kick a chat admin.").await;
            return;
        }
        match self.directory.remove_chat_user(chat, target).await {
            Ok(()) => {
                info!(target: EVENT_TARGET, chat_id = %chat, user_id = %target, "User kicked");
                self.notify(peer, &format!("User id{target} was kicked from the chat."))
                    .await;
                self.autokick_across_chats(target, Some(chat)).await;
            }
            Err(err) => {
                warn!(
                    target: ERROR_TARGET,
                    chat_id = %chat,
                    user_id = %target,
                    error = %err,
                    "Kick failed"
                );
                self.notify(peer, "Failed to kick the user (the bot may lack permissions).")
                    .await;
            }
        }
    }

    async fn cmd_ban(&self, peer: PeerId, arg: &str, issuer: UserId) {
        let Some(target) = self.resolve_target(arg).await else {
            self.notify(peer, "Could not identify the user. Specify @name or an id.")
                .await;
            return;
        };
        if permissions::is_owner(target, self.owner_id) {
            self.notify(peer, "You cannot ban the bot owner.").await;
            return;
        }
        // Even if the write fails the sweep below still enforces the ban
        // live; it just will not survive a restart.
        best_effort(
            "persist ban",
            self.store
                .add_banned(target, &format!("banned_by:{issuer}"))
                .await,
        );
        let Some(chats) = best_effort("list chats", self.store.chats().await) else {
            return;
        };

        let mut attempted = 0_usize;
        let mut removed = 0_usize;
        for chat in chats {
            if best_effort(
                "check target admin status",
                self.directory.is_chat_admin(chat, target).await,
            )
            .unwrap_or(false)
            {
                continue;
            }
            attempted += 1;
            match self.directory.remove_chat_user(chat, target).await {
                Ok(()) => {
                    removed += 1;
                    self.notify(
                        chat.peer_id(),
                        &format!("🚷 User id{target} was removed from the chat network (banned)."),
                    )
                    .await;
                }
                Err(err) => {
                    warn!(
                        target: ERROR_TARGET,
                        chat_id = %chat,
                        user_id = %target,
                        error = %err,
                        "Ban removal failed, continuing"
                    );
                }
            }
        }

        info!(
            target: EVENT_TARGET,
            user_id = %target,
            removed,
            attempted,
            "Ban executed"
        );
        self.notify(
            peer,
            &format!("User id{target} is now banned and was removed from {removed} of {attempted} chats."),
        )
        .await;
    }

    async fn cmd_mute(&self, peer: PeerId, chat: Option<ChatId>, arg: &str) {
        let Some(chat) = chat else {
            self.notify(peer, "The /muta command only works in group chats.")
                .await;
            return;
        };
        let (target_token, minutes) = commands::mute_args(arg);
        let target = match target_token {
            Some(token) => self.resolve_target(token).await,
            None => None,
        };
        let Some(target) = target else {
            self.notify(peer, "Could not identify the user. Specify @name or an id.")
                .await;
            return;
        };
        if permissions::is_owner(target, self.owner_id) {
            self.notify(peer, "You cannot mute the bot owner.").await;
            return;
        }
        if best_effort(
            "check target admin status",
            self.directory.is_chat_admin(chat, target).await,
        )
        .unwrap_or(false)
        {
            self.notify(peer, "You cannot mute a chat admin.").await;
            return;
        }

        // Durations the calendar cannot represent fall back to indefinite.
        let expiry = if minutes > 0 {
            Duration::try_minutes(minutes)
                .and_then(|span| Utc::now().checked_add_signed(span))
                .map_or(MuteExpiry::Indefinite, MuteExpiry::At)
        } else {
            MuteExpiry::Indefinite
        };
        if best_effort(
            "persist mute",
            self.store.set_muted(chat, target, expiry).await,
        )
        .is_none()
        {
            return;
        }
        info!(
            target: EVENT_TARGET,
            chat_id = %chat,
            user_id = %target,
            minutes,
            "User muted"
        );
        self.notify(
            peer,
            &format!(
                "🔇 User id{target} is muted in this chat (until {}).",
                expiry_label(expiry)
            ),
        )
        .await;
    }

    async fn cmd_unmute(&self, peer: PeerId, chat: Option<ChatId>, arg: &str) {
        let Some(chat) = chat else {
            self.notify(peer, "The /unmuta command only works in group chats.")
                .await;
            return;
        };
        let Some(target) = self.resolve_target(arg).await else {
            self.notify(peer, "Could not identify the user.").await;
            return;
        };
        if best_effort("clear mute", self.store.unset_muted(chat, target).await).is_none() {
            return;
        }
        info!(target: EVENT_TARGET, chat_id = %chat, user_id = %target, "User unmuted");
        self.notify(peer, &format!("✅ User id{target} is unmuted."))
            .await;
    }

    /// Remove a user from every known chat except the origin.
    ///
    /// Silent by design: no notices, no counts, individual failures only
    /// logged. The verbose counterpart is the ban sweep.
    async fn autokick_across_chats(&self, user: UserId, origin: Option<ChatId>) {
        let Some(chats) = best_effort("list chats", self.store.chats().await) else {
            return;
        };
        for chat in chats {
            if origin == Some(chat) {
                continue;
            }
            if let Err(err) = self.directory.remove_chat_user(chat, user).await {
                debug!(
                    target: EVENT_TARGET,
                    chat_id = %chat,
                    user_id = %user,
                    error = %err,
                    "Autokick removal failed, continuing"
                );
            }
        }
    }

    /// Turn a command argument into a user id, resolving screen names
    /// through the directory. Zero and unresolvable references are no
    /// target.
    async fn resolve_target(&self, arg: &str) -> Option<UserId> {
        let resolved = match commands::extract_target(arg)? {
            Target::Id(id) => Some(id),
            Target::ScreenName(name) => best_effort(
                "resolve screen name",
                self.directory.resolve_screen_name(&name).await,
            )
            .flatten(),
        };
        resolved.filter(|user| user.0 != 0)
    }

    async fn notify(&self, peer: PeerId, text: &str) {
        best_effort("send notice", self.directory.send_message(peer, text).await);
    }
}

fn expiry_label(expiry: MuteExpiry) -> String {
    match expiry {
        MuteExpiry::Indefinite => "unlimited".to_string(),
        MuteExpiry::At(until) => until.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Log a failure and carry on. The single place where the engine's
/// swallow-and-continue policy lives.
fn best_effort<T, E: fmt::Display>(operation: &'static str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                target: ERROR_TARGET,
                operation,
                error = %err,
                "Continuing after failure"
            );
            None
        }
    }
}
