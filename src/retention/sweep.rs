use super::engine::{RetentionEngine, log_delete_outcome};
use super::types::MessageRef;
use crate::config::RetentionConfig;
use crate::transport::messaging::DeleteOutcome;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

const MIN_SWEEP_INTERVAL_SECS: u64 = 1;

/// Cadence and per-tick work bound of the sweep loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSettings {
    pub interval: Duration,
    pub batch_limit: usize,
}

impl SweepSettings {
    pub fn from_config(config: &RetentionConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.sweep_interval_secs.max(MIN_SWEEP_INTERVAL_SECS)),
            batch_limit: config.sweep_batch_limit.max(1),
        }
    }
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self::from_config(&RetentionConfig::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub deleted: usize,
    pub already_gone: usize,
    pub forbidden: usize,
    pub failed: usize,
    /// Due entries that were unscheduled (e.g. pinned) before their turn came.
    pub skipped: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: &DeleteOutcome) {
        self.attempted += 1;
        match outcome {
            DeleteOutcome::Deleted => self.deleted += 1,
            DeleteOutcome::NotFound => self.already_gone += 1,
            DeleteOutcome::Forbidden => self.forbidden += 1,
            DeleteOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// One sweep tick: delete up to `batch_limit` due messages, then drop their
/// bookkeeping in a single persisted batch.
pub async fn sweep_once(
    engine: &RetentionEngine,
    now: DateTime<Utc>,
    batch_limit: usize,
) -> SweepReport {
    let due = engine.sweep_due(now, batch_limit).await;
    let mut report = SweepReport::default();
    if due.is_empty() {
        return report;
    }

    let mut concluded: Vec<MessageRef> = Vec::with_capacity(due.len());
    for entry in due {
        // A pin may have landed between reading the batch and reaching this entry.
        if !engine.is_scheduled(&entry.message).await {
            report.skipped += 1;
            continue;
        }

        let outcome = engine
            .gateway()
            .delete_message(entry.message.chat_id, entry.message.message_id)
            .await;
        log_delete_outcome(&entry.message, &outcome, "expired");
        report.record(&outcome);
        concluded.push(entry.message);
    }

    engine.complete_deletions(&concluded).await;

    if report.attempted > 0 {
        tracing::info!(
            attempted = report.attempted,
            deleted = report.deleted,
            already_gone = report.already_gone,
            forbidden = report.forbidden,
            failed = report.failed,
            "sweep batch processed"
        );
    }
    report
}

/// Periodic sweep. Exits when the shutdown signal fires; a tick already in
/// progress runs to completion first.
pub async fn run_sweep_loop(
    engine: Arc<RetentionEngine>,
    settings: SweepSettings,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    tracing::info!(
        interval_secs = settings.interval.as_secs(),
        batch_limit = settings.batch_limit,
        "sweep loop started"
    );

    let mut interval = tokio::time::interval(settings.interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                sweep_once(&engine, Utc::now(), settings.batch_limit).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() { break; }
            }
        }
    }

    tracing::info!("sweep loop stopped");
}
