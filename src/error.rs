use std::path::PathBuf;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `topic-janitor`.
///
/// Startup failures, one variant per subsystem that can refuse to start.
/// Gateway failures never abort the daemon and stay as [`GatewayError`] or a
/// `DeleteOutcome`; the daemon and CLI glue wrap these in `anyhow` context.
#[derive(Debug, Error)]
pub enum JanitorError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Snapshot persistence ────────────────────────────────────────────
    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("telegram bot token is not configured")]
    MissingToken,

    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Snapshot errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid snapshot {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

// ─── Gateway errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{method} request failed: {message}")]
    Request { method: String, message: String },

    #[error("{method} rejected ({status}): {description}")]
    Rejected {
        method: String,
        status: u16,
        description: String,
    },

    #[error("{method} returned an unexpected payload: {message}")]
    Payload { method: String, message: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, JanitorError>;
