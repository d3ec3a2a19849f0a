use super::snapshot::SnapshotStore;
use super::state::RetentionState;
use super::types::{MessageRef, RetentionPolicy, ScheduledDeletion, TopicKey};
use crate::error::SnapshotError;
use crate::transport::messaging::{DeleteOutcome, MessagingGateway};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A message removed from a full window and the gateway's answer to its deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionReport {
    pub message: MessageRef,
    pub outcome: DeleteOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyChange {
    pub policy: RetentionPolicy,
    /// Pending deletions dropped because the time rule was switched off.
    pub cancelled: usize,
    pub evictions: Vec<EvictionReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrivalOutcome {
    pub scheduled_for: Option<DateTime<Utc>>,
    pub evictions: Vec<EvictionReport>,
}

/// Single owner of the retention state.
///
/// Every mutation runs under one guard and writes the snapshot before the
/// guard is released, so snapshots land in mutation order. Gateway calls
/// happen after the guard is dropped.
pub struct RetentionEngine {
    state: Mutex<RetentionState>,
    snapshots: SnapshotStore,
    gateway: Arc<dyn MessagingGateway>,
}

impl RetentionEngine {
    pub fn new(
        state: RetentionState,
        snapshots: SnapshotStore,
        gateway: Arc<dyn MessagingGateway>,
    ) -> Self {
        Self {
            state: Mutex::new(state),
            snapshots,
            gateway,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn MessagingGateway> {
        &self.gateway
    }

    pub async fn policy(&self, key: TopicKey) -> RetentionPolicy {
        self.state.lock().await.policies.get(key)
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> RetentionState {
        self.state.lock().await.clone()
    }

    pub async fn is_scheduled(&self, message: &MessageRef) -> bool {
        self.state.lock().await.schedule.get(message).is_some()
    }

    /// Update a topic policy. Shrinking the count cap evicts (and deletes) the
    /// oldest excess messages; switching the time rule off drops the topic's
    /// pending deletions.
    pub async fn apply_policy_command(
        &self,
        key: TopicKey,
        minutes: Option<u32>,
        max_messages: Option<u32>,
    ) -> PolicyChange {
        let (policy, cancelled, evicted) = {
            let mut state = self.state.lock().await;
            let policy = state.policies.set(key, minutes, max_messages);

            let cancelled = if policy.has_time_limit() {
                0
            } else {
                state.schedule.cancel_topic(key)
            };

            let evicted = state.windows.enforce_cap(key, cap(policy));
            for message in &evicted {
                state.schedule.cancel(message);
            }

            self.persist(&state);
            (policy, cancelled, evicted)
        };

        tracing::info!(
            topic = %key,
            minutes = policy.minutes,
            max_messages = policy.max_messages,
            cancelled,
            evicted = evicted.len(),
            "retention policy updated"
        );

        let evictions = self.delete_evicted(evicted).await;
        PolicyChange {
            policy,
            cancelled,
            evictions,
        }
    }

    /// Register a freshly arrived message under its topic's policy.
    pub async fn on_message_arrived(
        &self,
        message: MessageRef,
        arrived_at: DateTime<Utc>,
    ) -> ArrivalOutcome {
        let key = message.topic();
        let (scheduled_for, evicted) = {
            let mut state = self.state.lock().await;
            let policy = state.policies.get(key);
            if policy.is_disabled() {
                return ArrivalOutcome::default();
            }

            let scheduled_for = policy.has_time_limit().then(|| {
                let due_at = arrived_at + Duration::minutes(i64::from(policy.minutes));
                state.schedule.schedule_at(message, due_at);
                due_at
            });

            let evicted = state.windows.track(key, message, cap(policy));
            for evicted_message in &evicted {
                state.schedule.cancel(evicted_message);
            }

            self.persist(&state);
            (scheduled_for, evicted)
        };

        tracing::debug!(
            chat_id = message.chat_id,
            message_id = message.message_id,
            thread_id = message.thread_id,
            scheduled = scheduled_for.is_some(),
            evicted = evicted.len(),
            "message tracked"
        );

        let evictions = self.delete_evicted(evicted).await;
        ArrivalOutcome {
            scheduled_for,
            evictions,
        }
    }

    /// A pinned message must never be auto-deleted. Returns whether anything
    /// was being tracked for it.
    pub async fn on_message_pinned(&self, message: MessageRef) -> bool {
        let mut state = self.state.lock().await;
        let unscheduled = state.schedule.cancel(&message);
        let unwindowed = state.windows.remove(message.topic(), &message)
            || state.windows.remove_everywhere(&message);
        let changed = unscheduled || unwindowed;
        if changed {
            self.persist(&state);
            tracing::info!(
                chat_id = message.chat_id,
                message_id = message.message_id,
                "pinned message exempted from retention"
            );
        }
        changed
    }

    /// Due deletions, earliest first, without touching the state.
    pub async fn sweep_due(&self, now: DateTime<Utc>, batch_limit: usize) -> Vec<ScheduledDeletion> {
        self.state.lock().await.schedule.due(now, batch_limit)
    }

    /// Drop bookkeeping for messages whose delete attempt concluded, whatever
    /// the outcome. Persists once for the whole batch.
    pub async fn complete_deletions(&self, messages: &[MessageRef]) {
        if messages.is_empty() {
            return;
        }

        let mut state = self.state.lock().await;
        for message in messages {
            state.schedule.cancel(message);
            state.windows.remove_everywhere(message);
        }
        self.persist(&state);
    }

    pub async fn complete_deletion(&self, message: &MessageRef) {
        self.complete_deletions(std::slice::from_ref(message)).await;
    }

    /// Write the current state, reporting failure to the caller.
    pub async fn flush(&self) -> Result<(), SnapshotError> {
        let state = self.state.lock().await;
        self.snapshots.save(&state)
    }

    fn persist(&self, state: &RetentionState) {
        if let Err(error) = self.snapshots.save(state) {
            tracing::warn!(%error, "failed to persist retention snapshot; keeping in-memory state");
        }
    }

    async fn delete_evicted(&self, evicted: Vec<MessageRef>) -> Vec<EvictionReport> {
        let mut reports = Vec::with_capacity(evicted.len());
        for message in evicted {
            let outcome = self
                .gateway
                .delete_message(message.chat_id, message.message_id)
                .await;
            log_delete_outcome(&message, &outcome, "eviction");
            reports.push(EvictionReport { message, outcome });
        }
        reports
    }
}

fn cap(policy: RetentionPolicy) -> usize {
    usize::try_from(policy.max_messages).unwrap_or(usize::MAX)
}

pub(crate) fn log_delete_outcome(message: &MessageRef, outcome: &DeleteOutcome, reason: &str) {
    match outcome {
        DeleteOutcome::Deleted => tracing::debug!(
            chat_id = message.chat_id,
            message_id = message.message_id,
            reason,
            "message deleted"
        ),
        DeleteOutcome::NotFound => tracing::debug!(
            chat_id = message.chat_id,
            message_id = message.message_id,
            reason,
            "message already gone"
        ),
        DeleteOutcome::Forbidden => tracing::warn!(
            chat_id = message.chat_id,
            message_id = message.message_id,
            reason,
            "not allowed to delete message"
        ),
        DeleteOutcome::Failed(error) => tracing::warn!(
            chat_id = message.chat_id,
            message_id = message.message_id,
            reason,
            %error,
            "message deletion failed"
        ),
    }
}
