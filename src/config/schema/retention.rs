use serde::{Deserialize, Serialize};

/// What to do with forwarded and auto-forwarded messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardedPolicy {
    /// Subject to the topic policy like any other message.
    #[default]
    Track,
    /// Never scheduled or windowed.
    Ignore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Snapshot file; relative paths resolve against the config directory.
    #[serde(default = "default_state_file")]
    pub state_file: String,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_sweep_batch_limit")]
    pub sweep_batch_limit: usize,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub forwarded: ForwardedPolicy,
}

fn default_state_file() -> String {
    "retention_state.json".into()
}

fn default_sweep_interval_secs() -> u64 {
    5
}

fn default_sweep_batch_limit() -> usize {
    50
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_batch_limit: default_sweep_batch_limit(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            forwarded: ForwardedPolicy::default(),
        }
    }
}
