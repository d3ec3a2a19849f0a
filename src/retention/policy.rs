use super::types::{RetentionPolicy, TopicKey};
use std::collections::BTreeMap;

/// Per-topic retention policies.
///
/// Absence is the canonical "disabled" state: an update that leaves both
/// rules at zero removes the entry instead of storing `{0, 0}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyStore {
    policies: BTreeMap<TopicKey, RetentionPolicy>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a partial update and return the effective policy.
    /// `None` leaves the corresponding field unchanged.
    pub fn set(
        &mut self,
        key: TopicKey,
        minutes: Option<u32>,
        max_messages: Option<u32>,
    ) -> RetentionPolicy {
        let mut policy = self.get(key);
        if let Some(minutes) = minutes {
            policy.minutes = minutes;
        }
        if let Some(max_messages) = max_messages {
            policy.max_messages = max_messages;
        }

        if policy.is_disabled() {
            self.policies.remove(&key);
        } else {
            self.policies.insert(key, policy);
        }
        policy
    }

    /// Policy for `key`; `{0, 0}` when none is stored.
    pub fn get(&self, key: TopicKey) -> RetentionPolicy {
        self.policies.get(&key).copied().unwrap_or_default()
    }

    pub fn contains(&self, key: TopicKey) -> bool {
        self.policies.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TopicKey, RetentionPolicy)> + '_ {
        self.policies.iter().map(|(key, policy)| (*key, *policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: TopicKey = TopicKey {
        chat_id: -100,
        thread_id: 3,
    };

    #[test]
    fn absent_policy_reads_as_disabled() {
        let store = PolicyStore::new();
        assert_eq!(store.get(TOPIC), RetentionPolicy::default());
        assert!(!store.contains(TOPIC));
    }

    #[test]
    fn partial_update_keeps_other_field() {
        let mut store = PolicyStore::new();
        store.set(TOPIC, Some(10), None);
        let policy = store.set(TOPIC, None, Some(4));
        assert_eq!(policy, RetentionPolicy::new(10, 4));
        assert_eq!(store.get(TOPIC), policy);
    }

    #[test]
    fn all_zero_policy_is_removed() {
        let mut store = PolicyStore::new();
        store.set(TOPIC, Some(10), Some(4));
        store.set(TOPIC, Some(0), None);
        assert!(store.contains(TOPIC));

        let policy = store.set(TOPIC, None, Some(0));
        assert!(policy.is_disabled());
        assert!(!store.contains(TOPIC));
        assert!(store.is_empty());
    }

    #[test]
    fn zero_update_on_absent_topic_stores_nothing() {
        let mut store = PolicyStore::new();
        store.set(TOPIC, Some(0), Some(0));
        assert!(store.is_empty());
    }

    #[test]
    fn any_sequence_ending_in_zero_leaves_no_entry() {
        let updates = [
            (Some(5), None),
            (None, Some(2)),
            (Some(0), Some(7)),
            (Some(30), None),
            (Some(0), Some(0)),
        ];
        let mut store = PolicyStore::new();
        for (minutes, max_messages) in updates {
            store.set(TOPIC, minutes, max_messages);
        }
        assert!(!store.contains(TOPIC));
    }

    #[test]
    fn topics_are_independent() {
        let mut store = PolicyStore::new();
        let other = TopicKey::new(TOPIC.chat_id, 0);
        store.set(TOPIC, Some(1), None);
        store.set(other, None, Some(9));
        assert_eq!(store.get(TOPIC), RetentionPolicy::new(1, 0));
        assert_eq!(store.get(other), RetentionPolicy::new(0, 9));
        assert_eq!(store.len(), 2);
    }
}
