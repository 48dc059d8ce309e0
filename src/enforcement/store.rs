//! Durable moderation state
//!
//! Everything the bot persists lives in one SQLite database: the chats it
//! has seen, per-chat silence flags, per-chat-per-user mutes and global
//! bans. A single connection behind a mutex serializes all access; each
//! operation is one short committed statement, and no remote call ever
//! happens while the lock is held.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;

use crate::enforcement::StoreResult;
use crate::ids::{ChatId, UserId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chat_settings (
    chat_id INTEGER PRIMARY KEY,
    silence INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS muted_users (
    chat_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    until_ts INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (chat_id, user_id)
);
CREATE TABLE IF NOT EXISTS banned_users (
    user_id INTEGER PRIMARY KEY,
    reason TEXT
);
CREATE TABLE IF NOT EXISTS known_chats (
    chat_id INTEGER PRIMARY KEY
);
";

/// Expiry of a mute.
///
/// The schema keeps 0 as the indefinite sentinel; this enum keeps that
/// sentinel out of the rest of the code. Whether a user is muted at all is
/// a matter of row presence, never of the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteExpiry {
    /// Muted until explicitly lifted
    Indefinite,
    /// Muted until the given instant
    At(DateTime<Utc>),
}

impl MuteExpiry {
    /// Whether a mute with this expiry is still in force at `now`.
    #[must_use]
    pub fn active_at(self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Indefinite => true,
            Self::At(until) => now < until,
        }
    }

    fn to_ts(self) -> i64 {
        match self {
            Self::Indefinite => 0,
            Self::At(until) => until.timestamp(),
        }
    }

    fn from_ts(ts: i64) -> Self {
        if ts == 0 {
            Self::Indefinite
        } else {
            DateTime::from_timestamp(ts, 0).map_or(Self::Indefinite, Self::At)
        }
    }
}

/// Store for all persisted moderation state
#[derive(Clone)]
pub struct ModerationStore {
    conn: Arc<Mutex<Connection>>,
}

impl ModerationStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the parent directory cannot be created or
    /// the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the database cannot be opened.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Record that the bot has seen this chat. Idempotent.
    pub async fn register_chat(&self, chat: ChatId) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO known_chats (chat_id) VALUES (?1)",
            params![chat.0],
        )?;
        Ok(())
    }

    /// All chats the bot has ever seen, in ascending order.
    pub async fn chats(&self) -> StoreResult<Vec<ChatId>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT chat_id FROM known_chats ORDER BY chat_id")?;
        let chats = stmt
            .query_map([], |row| row.get(0))?
            .map(|row| row.map(ChatId))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chats)
    }

    /// Set the per-chat silence flag.
    pub async fn set_silence(&self, chat: ChatId, enabled: bool) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO chat_settings (chat_id, silence) VALUES (?1, ?2)
             ON CONFLICT(chat_id) DO UPDATE SET silence = excluded.silence",
            params![chat.0, i64::from(enabled)],
        )?;
        Ok(())
    }

    /// Read the per-chat silence flag; unknown chats are not silenced.
    pub async fn silence(&self, chat: ChatId) -> StoreResult<bool> {
        let conn = self.conn.lock().await;
        let silence = conn
            .query_row(
                "SELECT silence FROM chat_settings WHERE chat_id = ?1",
                params![chat.0],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(silence.is_some_and(|flag| flag != 0))
    }

    /// Mute a user in a chat, overwriting any previous expiry.
    pub async fn set_muted(
        &self,
        chat: ChatId,
        user: UserId,
        expiry: MuteExpiry,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO muted_users (chat_id, user_id, until_ts) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id, user_id) DO UPDATE SET until_ts = excluded.until_ts",
            params![chat.0, user.0, expiry.to_ts()],
        )?;
        Ok(())
    }

    /// Remove a mute. A no-op when the user is not muted.
    pub async fn unset_muted(&self, chat: ChatId, user: UserId) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM muted_users WHERE chat_id = ?1 AND user_id = ?2",
            params![chat.0, user.0],
        )?;
        Ok(())
    }

    /// The expiry of a user's mute in a chat, or `None` if not muted.
    pub async fn mute_expiry(&self, chat: ChatId, user: UserId) -> StoreResult<Option<MuteExpiry>> {
        let conn = self.conn.lock().await;
        let until = conn
            .query_row(
                "SELECT until_ts FROM muted_users WHERE chat_id = ?1 AND user_id = ?2",
                params![chat.0, user.0],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(until.map(MuteExpiry::from_ts))
    }

    /// Whether a user's mute is in force at `now`.
    ///
    /// An expired-but-unswept row reads as not muted; the row itself stays
    /// until a sweep or an explicit unmute deletes it.
    pub async fn is_muted(
        &self,
        chat: ChatId,
        user: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let expiry = self.mute_expiry(chat, user).await?;
        Ok(expiry.is_some_and(|expiry| expiry.active_at(now)))
    }

    /// All mute rows with a finite expiry in the past.
    pub async fn expired_mutes(&self, now: DateTime<Utc>) -> StoreResult<Vec<(ChatId, UserId)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT chat_id, user_id FROM muted_users WHERE until_ts > 0 AND until_ts < ?1",
        )?;
        let expired = stmt
            .query_map(params![now.timestamp()], |row| {
                Ok((ChatId(row.get(0)?), UserId(row.get(1)?)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(expired)
    }

    /// Ban a user globally. A second ban overwrites the reason.
    pub async fn add_banned(&self, user: UserId, reason: &str) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO banned_users (user_id, reason) VALUES (?1, ?2)",
            params![user.0, reason],
        )?;
        Ok(())
    }

    /// Whether a user is banned.
    pub async fn is_banned(&self, user: UserId) -> StoreResult<bool> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT user_id FROM banned_users WHERE user_id = ?1",
                params![user.0],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(row.is_some())
    }

    /// The recorded reason for a user's ban, if any.
    pub async fn ban_reason(&self, user: UserId) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().await;
        let reason = conn
            .query_row(
                "SELECT reason FROM banned_users WHERE user_id = ?1",
                params![user.0],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(reason.flatten())
    }
}
