use super::types::{MessageIdentity, MessageRef, ScheduledDeletion, TopicKey};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// Pending time-based deletions, at most one per message identity.
///
/// A due-time index keeps `due` returning the earliest entries first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSchedule {
    entries: HashMap<MessageIdentity, ScheduledDeletion>,
    by_due: BTreeSet<(DateTime<Utc>, MessageIdentity)>,
}

impl DeletionSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the deletion for `message`'s identity.
    pub fn schedule_at(&mut self, message: MessageRef, due_at: DateTime<Utc>) {
        let identity = message.identity();
        if let Some(previous) = self
            .entries
            .insert(identity, ScheduledDeletion { message, due_at })
        {
            self.by_due.remove(&(previous.due_at, identity));
        }
        self.by_due.insert((due_at, identity));
    }

    /// Drop the entry for `message`'s identity if present.
    pub fn cancel(&mut self, message: &MessageRef) -> bool {
        let identity = message.identity();
        match self.entries.remove(&identity) {
            Some(previous) => {
                self.by_due.remove(&(previous.due_at, identity));
                true
            }
            None => false,
        }
    }

    /// Cancel every entry belonging to `key`. Returns how many were dropped.
    pub fn cancel_topic(&mut self, key: TopicKey) -> usize {
        let doomed: Vec<MessageRef> = self
            .entries
            .values()
            .filter(|entry| entry.message.topic() == key)
            .map(|entry| entry.message)
            .collect();
        for message in &doomed {
            self.cancel(message);
        }
        doomed.len()
    }

    /// Up to `limit` entries with `due_at <= now`, earliest first. Nothing is removed.
    pub fn due(&self, now: DateTime<Utc>, limit: usize) -> Vec<ScheduledDeletion> {
        self.by_due
            .iter()
            .take_while(|(due_at, _)| *due_at <= now)
            .take(limit)
            .filter_map(|(_, identity)| self.entries.get(identity).copied())
            .collect()
    }

    pub fn get(&self, message: &MessageRef) -> Option<&ScheduledDeletion> {
        self.entries.get(&message.identity())
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.by_due.first().map(|(due_at, _)| *due_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, earliest due first.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledDeletion> + '_ {
        self.by_due
            .iter()
            .filter_map(|(_, identity)| self.entries.get(identity))
    }
}
