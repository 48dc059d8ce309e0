//! Runtime configuration loaded from the environment

use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::ids::UserId;

/// Errors raised while reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `VK_TOKEN` nor the legacy `TOKEN` variable is set
    #[error("VK_TOKEN environment variable is required")]
    MissingToken,

    /// `OWNER_ID` is set but does not parse as an integer
    #[error("OWNER_ID must be an integer, got {0:?}")]
    InvalidOwnerId(String),
}

/// Runtime configuration for the bot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Community access token used for every API call
    pub token: String,
    /// User allowed to moderate everywhere, bypassing admin checks
    pub owner_id: UserId,
    /// Location of the SQLite database file
    pub database_path: PathBuf,
    /// Community id for the long poll session
    pub group_id: i64,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// `VK_TOKEN` (or `TOKEN`) is required. `OWNER_ID` defaults to 0, which
    /// matches no real user; a non-numeric value is an error. `GROUP_ID`
    /// (or `GROUP`) tolerates garbage and falls back to 0 so a misconfigured
    /// id fails at long poll setup rather than at startup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a missing token or malformed `OWNER_ID`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup("VK_TOKEN")
            .or_else(|| lookup("TOKEN"))
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let owner_raw = lookup("OWNER_ID").unwrap_or_else(|| "0".to_string());
        let owner_id = owner_raw
            .trim()
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| ConfigError::InvalidOwnerId(owner_raw.clone()))?;

        let database_path = lookup("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/bot.db"));

        let group_id = lookup("GROUP_ID")
            .or_else(|| lookup("GROUP"))
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(0);

        Ok(Self {
            token,
            owner_id,
            database_path,
            group_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars = env(pairs);
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_token_is_required() {
        let err = load(&[("OWNER_ID", "100")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn test_legacy_token_variable_is_accepted() {
        let config = load(&[("TOKEN", "abc")]).unwrap();
        assert_eq!(config.token, "abc");
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("VK_TOKEN", "abc")]).unwrap();
        assert_eq!(config.owner_id, UserId(0));
        assert_eq!(config.database_path, PathBuf::from("data/bot.db"));
        assert_eq!(config.group_id, 0);
    }

    #[test]
    fn test_invalid_owner_id_is_an_error() {
        let err = load(&[("VK_TOKEN", "abc"), ("OWNER_ID", "bob")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOwnerId(_)));
    }

    #[test]
    fn test_invalid_group_id_falls_back_to_zero() {
        let config = load(&[("VK_TOKEN", "abc"), ("GROUP_ID", "not-a-number")]).unwrap();
        assert_eq!(config.group_id, 0);
    }

    #[test]
    fn test_full_configuration() {
        let config = load(&[
            ("VK_TOKEN", "abc"),
            ("OWNER_ID", "100"),
            ("DATABASE_PATH", "/tmp/warden.db"),
            ("GROUP", "219"),
        ])
        .unwrap();
        assert_eq!(config.owner_id, UserId(100));
        assert_eq!(config.database_path, PathBuf::from("/tmp/warden.db"));
        assert_eq!(config.group_id, 219);
    }
}
