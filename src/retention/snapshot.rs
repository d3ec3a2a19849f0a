//! Durable snapshot of the full retention state.
//!
//! The whole state is one JSON document. Saves go to a sibling temp file
//! that is renamed over the target, so readers see either the old or the
//! new document and never a torn write.

use super::state::RetentionState;
use super::types::{MessageIdentity, MessageRef, RetentionPolicy, TopicKey};
use crate::error::SnapshotError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    #[serde(default)]
    policies: Vec<PolicyRecord>,
    #[serde(default)]
    scheduled: Vec<ScheduledRecord>,
    #[serde(default)]
    windows: Vec<WindowRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolicyRecord {
    chat_id: i64,
    #[serde(default)]
    thread_id: i64,
    #[serde(default)]
    minutes: u32,
    #[serde(default)]
    max_messages: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScheduledRecord {
    chat_id: i64,
    message_id: i64,
    #[serde(default)]
    thread_id: i64,
    due_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WindowRecord {
    chat_id: i64,
    #[serde(default)]
    thread_id: i64,
    message_ids: Vec<i64>,
}

/// Loads and atomically saves [`RetentionState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. A missing file yields an empty state; an existing
    /// file that cannot be parsed or violates state invariants is an error.
    pub fn load(&self) -> Result<RetentionState, SnapshotError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no retention snapshot yet, starting empty");
                return Ok(RetentionState::new());
            }
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let document: SnapshotDocument =
            serde_json::from_str(&raw).map_err(|source| SnapshotError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        document_into_state(document).map_err(|reason| SnapshotError::Invalid {
            path: self.path.clone(),
            reason,
        })
    }

    /// Replace the on-disk snapshot with `state`.
    pub fn save(&self, state: &RetentionState) -> Result<(), SnapshotError> {
        let document = state_to_document(state);
        let content = serde_json::to_string_pretty(&document).map_err(SnapshotError::Encode)?;
        write_atomic(&self.path, &content)
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<(), SnapshotError> {
    let io_error = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).map_err(|source| SnapshotError::Io {
        path: temp_path.clone(),
        source,
    })?;

    if let Err(rename_error) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error(rename_error));
    }

    Ok(())
}

fn state_to_document(state: &RetentionState) -> SnapshotDocument {
    let policies = state
        .policies
        .iter()
        .map(|(key, policy)| PolicyRecord {
            chat_id: key.chat_id,
            thread_id: key.thread_id,
            minutes: policy.minutes,
            max_messages: policy.max_messages,
        })
        .collect();

    let scheduled = state
        .schedule
        .iter()
        .map(|entry| ScheduledRecord {
            chat_id: entry.message.chat_id,
            message_id: entry.message.message_id,
            thread_id: entry.message.thread_id,
            due_at: entry.due_at,
        })
        .collect();

    let windows = state
        .windows
        .topics()
        .map(|(key, window)| WindowRecord {
            chat_id: key.chat_id,
            thread_id: key.thread_id,
            message_ids: window.iter().map(|message| message.message_id).collect(),
        })
        .collect();

    SnapshotDocument {
        version: SNAPSHOT_VERSION,
        policies,
        scheduled,
        windows,
    }
}

fn document_into_state(document: SnapshotDocument) -> Result<RetentionState, String> {
    if document.version != SNAPSHOT_VERSION {
        return Err(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            document.version
        ));
    }

    let mut state = RetentionState::new();

    for record in document.policies {
        let key = TopicKey::new(record.chat_id, record.thread_id);
        let policy = RetentionPolicy::new(record.minutes, record.max_messages);
        if policy.is_disabled() {
            return Err(format!("topic {key} has an all-zero policy"));
        }
        if state.policies.contains(key) {
            return Err(format!("topic {key} has more than one policy"));
        }
        state
            .policies
            .set(key, Some(policy.minutes), Some(policy.max_messages));
    }

    for record in document.scheduled {
        let message = MessageRef::new(record.chat_id, record.message_id, record.thread_id);
        if state.schedule.get(&message).is_some() {
            return Err(format!(
                "message {}:{} is scheduled more than once",
                record.chat_id, record.message_id
            ));
        }
        state.schedule.schedule_at(message, record.due_at);
    }

    let mut windowed: HashSet<MessageIdentity> = HashSet::new();
    for record in document.windows {
        let key = TopicKey::new(record.chat_id, record.thread_id);
        if state.windows.topics().any(|(existing, _)| existing == key) {
            return Err(format!("topic {key} has more than one window"));
        }
        let mut messages = VecDeque::with_capacity(record.message_ids.len());
        for message_id in record.message_ids {
            let message = MessageRef::new(record.chat_id, message_id, record.thread_id);
            if !windowed.insert(message.identity()) {
                return Err(format!(
                    "message {}:{message_id} appears in more than one window slot",
                    record.chat_id
                ));
            }
            messages.push_back(message);
        }
        state.windows.insert_window(key, messages);
    }

    Ok(state)
}
