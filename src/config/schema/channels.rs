use serde::{Deserialize, Serialize};

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Chats the bot enforces retention in. Empty = the bot stays inert.
    #[serde(default)]
    pub allowed_chats: Vec<i64>,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.into()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_chats: Vec::new(),
            poll_timeout_secs: default_poll_timeout_secs(),
            api_base: default_api_base(),
        }
    }
}
