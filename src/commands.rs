//! Moderation command language
//!
//! Commands are slash-prefixed chat messages (`/kick`, `/ban`, `/muta`,
//! `/unmuta`). Parsing never fails: text that is not a recognized command is
//! simply not a command. Target extraction understands the mention syntaxes
//! VK clients produce: `[id123|Name]` brackets, bare `id123` tokens,
//! profile URLs and `@handle` screen names.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::ids::UserId;

/// Prefix that marks a message as a command.
pub const COMMAND_PREFIX: char = '/';

/// Matches [id123|name], id123, vk.com/id123, @screen_name
static TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[id(\d+)\|[^\]]+\]|id(\d+)|https?://vk\.com/id(\d+)|@([A-Za-z0-9_.]+)")
        .expect("Invalid target mention pattern")
});

/// A recognized moderation verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Remove the target from the current chat
    Kick,
    /// Block the target everywhere the bot is present
    Ban,
    /// Suppress the target's messages in the current chat
    Mute,
    /// Lift a mute in the current chat
    Unmute,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kick => write!(f, "kick"),
            Self::Ban => write!(f, "ban"),
            Self::Mute => write!(f, "muta"),
            Self::Unmute => write!(f, "unmuta"),
        }
    }
}

/// A parsed command: the verb plus its raw argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    pub arg: String,
}

/// A user reference extracted from command text, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// An explicit numeric user id
    Id(UserId),
    /// A screen name that needs a remote lookup
    ScreenName(String),
}

/// Parse message text into a command.
///
/// Returns `None` for anything that is not a recognized command: text
/// without the prefix, a bare prefix, or an unknown verb. The verb token is
/// matched case-insensitively; the argument is the remainder after the first
/// whitespace run, verbatim.
#[must_use]
pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim();
    let rest = text.strip_prefix(COMMAND_PREFIX)?;
    let (token, arg) = match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim_start()),
        None => (rest, ""),
    };
    let verb = match token.to_lowercase().as_str() {
        "kick" => Verb::Kick,
        "ban" => Verb::Ban,
        "muta" => Verb::Mute,
        "unmuta" => Verb::Unmute,
        _ => return None,
    };
    Some(Command {
        verb,
        arg: arg.to_string(),
    })
}

/// Extract a user reference from free-form argument text.
///
/// Tries the mention pattern first (bracket mention, bare id token, profile
/// URL, `@handle`), then falls back to treating the whole trimmed argument
/// as an `@handle` or a plain numeric id. `None` means no target, which is
/// an ordinary outcome rather than an error.
#[must_use]
pub fn extract_target(arg: &str) -> Option<Target> {
    let arg = arg.trim();
    if arg.is_empty() {
        return None;
    }
    if let Some(caps) = TARGET_RE.captures(arg) {
        for group in 1..=3 {
            if let Some(found) = caps.get(group) {
                return found.as_str().parse().ok().map(UserId).map(Target::Id);
            }
        }
        if let Some(handle) = caps.get(4) {
            return Some(Target::ScreenName(handle.as_str().to_string()));
        }
    }
    if let Some(handle) = arg.strip_prefix('@') {
        return Some(Target::ScreenName(handle.to_string()));
    }
    arg.parse().ok().map(UserId).map(Target::Id)
}

/// Split a mute argument into its target token and a duration in minutes.
///
/// Minutes default to 0, meaning indefinite; a non-numeric minutes token is
/// also treated as 0.
#[must_use]
pub fn mute_args(arg: &str) -> (Option<&str>, i64) {
    let mut parts = arg.split_whitespace();
    let target = parts.next();
    let minutes = parts
        .next()
        .and_then(|token| token.parse::<i64>().ok())
        .unwrap_or(0);
    (target, minutes)
}
