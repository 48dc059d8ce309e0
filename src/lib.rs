pub mod commands;
pub mod config;
pub mod directory;
pub mod enforcement;
pub mod ids;
pub mod logging;
pub mod permissions;
pub mod vk;

// Customize these constants for your bot
pub const BOT_NAME: &str = "chat_warden";
pub const COMMAND_TARGET: &str = "chat_warden::command";
pub const ERROR_TARGET: &str = "chat_warden::error";
pub const EVENT_TARGET: &str = "chat_warden::event";
pub const CONSOLE_TARGET: &str = "chat_warden";

pub use config::Config;
pub use enforcement::{EnforcementEngine, ModerationStore};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
