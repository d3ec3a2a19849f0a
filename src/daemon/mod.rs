use crate::config::Config;
use crate::retention::{
    RetentionEngine, RetentionState, SnapshotStore, SweepSettings, run_sweep_loop,
};
use crate::transport::messaging::MessagingGateway;
use crate::transport::telegram::TelegramGateway;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub mod events;

pub use events::{EventDisposition, EventRouter, run_event_consumer};

const EVENT_QUEUE_CAPACITY: usize = 256;

/// Validate the config and load the snapshot the daemon resumes from.
/// A missing token or an unreadable snapshot refuses startup.
pub fn prepare(config: &Config) -> crate::Result<(SnapshotStore, RetentionState)> {
    config.validate()?;
    let snapshots = SnapshotStore::new(config.state_file_path());
    let state = snapshots.load()?;
    Ok((snapshots, state))
}

pub async fn run(config: Arc<Config>) -> Result<()> {
    let (snapshots, state) = prepare(&config).context("refusing to start")?;
    tracing::info!(
        path = %snapshots.path().display(),
        policies = state.policies.len(),
        scheduled = state.schedule.len(),
        windowed = state.windows.tracked_count(),
        "retention state loaded"
    );

    let telegram = Arc::new(TelegramGateway::new(&config.telegram));
    let gateway: Arc<dyn MessagingGateway> = telegram.clone();
    let engine = Arc::new(RetentionEngine::new(state, snapshots, gateway));
    let router = Arc::new(EventRouter::new(
        Arc::clone(&engine),
        config.telegram.allowed_chats.clone(),
        config.retention.forwarded,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

    let listener_shutdown = shutdown_rx.clone();
    let handles: Vec<JoinHandle<()>> = vec![
        tokio::spawn(async move {
            if let Err(error) = telegram.listen(event_tx, listener_shutdown).await {
                tracing::error!("telegram listener exited: {error:#}");
            }
        }),
        tokio::spawn(run_event_consumer(router, event_rx, shutdown_rx.clone())),
        tokio::spawn(run_sweep_loop(
            Arc::clone(&engine),
            SweepSettings::from_config(&config.retention),
            shutdown_rx,
        )),
    ];

    tracing::info!(
        gateway = engine.gateway().name(),
        chats = config.telegram.allowed_chats.len(),
        "topic-janitor running; press Ctrl+C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    shutdown(
        handles,
        Duration::from_secs(config.retention.shutdown_grace_secs),
        &engine,
    )
    .await;
    Ok(())
}

/// Wait up to `grace` for the components to notice the shutdown flag, abort
/// whatever is still running, then write the final snapshot.
pub async fn shutdown(handles: Vec<JoinHandle<()>>, grace: Duration, engine: &RetentionEngine) {
    let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
    let drained = tokio::time::timeout(grace, async {
        for handle in handles {
            let _ = handle.await;
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            grace_secs = grace.as_secs(),
            "components did not stop within the grace period; aborting"
        );
        for abort in aborts {
            abort.abort();
        }
    }

    match engine.flush().await {
        Ok(()) => tracing::info!("final retention snapshot written"),
        Err(error) => tracing::warn!(%error, "final retention snapshot failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JanitorError;
    use crate::error::{ConfigError, SnapshotError};
    use tempfile::TempDir;

    fn config_in(tmp: &TempDir) -> Config {
        let mut config = Config {
            config_path: tmp.path().join("config.toml"),
            ..Config::default()
        };
        config.telegram.bot_token = "123:ABC".into();
        config.telegram.allowed_chats = vec![-100];
        config
    }

    #[test]
    fn prepare_starts_empty_without_snapshot() {
        let tmp = TempDir::new().unwrap();
        let (snapshots, state) = prepare(&config_in(&tmp)).unwrap();
        assert!(state.is_empty());
        assert_eq!(snapshots.path(), tmp.path().join("retention_state.json"));
    }

    #[test]
    fn prepare_refuses_missing_token() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_in(&tmp);
        config.telegram.bot_token.clear();
        assert!(matches!(
            prepare(&config),
            Err(JanitorError::Config(ConfigError::MissingToken))
        ));
    }

    #[test]
    fn prepare_refuses_malformed_snapshot() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("retention_state.json"), "{ not json").unwrap();
        assert!(matches!(
            prepare(&config_in(&tmp)),
            Err(JanitorError::Snapshot(SnapshotError::Malformed { .. }))
        ));
    }
}
