use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thread id used for a chat's main stream (no forum topic).
pub const MAIN_THREAD: i64 = 0;

/// Identity of a retention scope: one chat plus one forum thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicKey {
    pub chat_id: i64,
    pub thread_id: i64,
}

impl TopicKey {
    pub fn new(chat_id: i64, thread_id: i64) -> Self {
        Self { chat_id, thread_id }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chat_id, self.thread_id)
    }
}

/// Retention rules for one topic. Zero disables the corresponding rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub minutes: u32,
    pub max_messages: u32,
}

impl RetentionPolicy {
    pub fn new(minutes: u32, max_messages: u32) -> Self {
        Self {
            minutes,
            max_messages,
        }
    }

    /// Both rules disabled; such a policy is never stored.
    pub fn is_disabled(&self) -> bool {
        self.minutes == 0 && self.max_messages == 0
    }

    pub fn has_time_limit(&self) -> bool {
        self.minutes > 0
    }

    pub fn has_count_limit(&self) -> bool {
        self.max_messages > 0
    }
}

/// Reference to one chat message. `(chat_id, message_id)` is globally unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
    pub thread_id: i64,
}

impl MessageRef {
    pub fn new(chat_id: i64, message_id: i64, thread_id: i64) -> Self {
        Self {
            chat_id,
            message_id,
            thread_id,
        }
    }

    pub fn topic(&self) -> TopicKey {
        TopicKey::new(self.chat_id, self.thread_id)
    }

    pub fn identity(&self) -> MessageIdentity {
        MessageIdentity {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }
}

/// The unique part of a [`MessageRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageIdentity {
    pub chat_id: i64,
    pub message_id: i64,
}

/// A pending time-based deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledDeletion {
    pub message: MessageRef,
    pub due_at: DateTime<Utc>,
}
