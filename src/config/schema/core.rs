use super::{RetentionConfig, TelegramConfig};
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = ".topic-janitor";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            log_level: default_log_level(),
            telegram: TelegramConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

/// `~/.topic-janitor/config.toml`, falling back to the working directory.
pub fn default_config_path() -> PathBuf {
    let home = UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
    home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

impl Config {
    /// Load `~/.topic-janitor/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_at(&home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn load_or_init_at(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.to_path_buf();
            config
        } else {
            if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            let config = Self {
                config_path: config_path.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            tracing::info!(path = %config_path.display(), "wrote default config");
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        // Bot token: TOPIC_JANITOR_BOT_TOKEN or BOT_TOKEN
        if let Ok(token) =
            std::env::var("TOPIC_JANITOR_BOT_TOKEN").or_else(|_| std::env::var("BOT_TOKEN"))
        {
            if !token.is_empty() {
                self.telegram.bot_token = token;
            }
        }

        // Log level: TOPIC_JANITOR_LOG
        if let Ok(level) = std::env::var("TOPIC_JANITOR_LOG") {
            if !level.is_empty() {
                self.log_level = level;
            }
        }

        // Snapshot location: TOPIC_JANITOR_STATE_FILE
        if let Ok(state_file) = std::env::var("TOPIC_JANITOR_STATE_FILE") {
            if !state_file.is_empty() {
                self.retention.state_file = state_file;
            }
        }
    }

    /// Check what the daemon needs before it starts. A missing token is fatal;
    /// an empty chat allow-list is valid but inert, so it only warns.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "log_level must be one of {LOG_LEVELS:?}, got {:?}",
                self.log_level
            )));
        }

        if self.retention.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "retention.sweep_interval_secs must be at least 1".into(),
            ));
        }

        if self.retention.sweep_batch_limit == 0 {
            return Err(ConfigError::Validation(
                "retention.sweep_batch_limit must be at least 1".into(),
            ));
        }

        if self.telegram.allowed_chats.is_empty() {
            tracing::warn!(
                "telegram.allowed_chats is empty; the bot will not enforce retention anywhere"
            );
        }

        Ok(())
    }

    /// Directory holding config.toml; relative state paths resolve here.
    pub fn config_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
    }

    pub fn state_file_path(&self) -> PathBuf {
        let state_file = Path::new(&self.retention.state_file);
        if state_file.is_absolute() {
            state_file.to_path_buf()
        } else {
            self.config_dir().join(state_file)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
