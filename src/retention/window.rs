use super::types::{MessageRef, TopicKey};
use std::collections::{BTreeMap, VecDeque};

/// Bounded FIFO of tracked messages per topic, oldest first.
///
/// Topics with no tracked messages have no entry at all, so an empty
/// window and a missing window are indistinguishable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowTracker {
    windows: BTreeMap<TopicKey, VecDeque<MessageRef>>,
}

impl WindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `message` to its topic window and pop the oldest entries while
    /// the window exceeds `cap`. Returns the evicted entries in arrival order.
    ///
    /// A `cap` of zero means the topic is not tracked: nothing is stored.
    /// A message already in the window keeps its slot; redelivered updates
    /// must not occupy a second one.
    pub fn track(&mut self, key: TopicKey, message: MessageRef, cap: usize) -> Vec<MessageRef> {
        if cap == 0 {
            return Vec::new();
        }

        let window = self.windows.entry(key).or_default();
        let identity = message.identity();
        if !window.iter().any(|tracked| tracked.identity() == identity) {
            window.push_back(message);
        }
        Self::drain_excess(window, cap)
    }

    /// Shrink a window to `cap`, returning the evicted oldest entries.
    /// A `cap` of zero drops the window without reporting evictions.
    pub fn enforce_cap(&mut self, key: TopicKey, cap: usize) -> Vec<MessageRef> {
        if cap == 0 {
            self.windows.remove(&key);
            return Vec::new();
        }

        let Some(window) = self.windows.get_mut(&key) else {
            return Vec::new();
        };
        Self::drain_excess(window, cap)
    }

    fn drain_excess(window: &mut VecDeque<MessageRef>, cap: usize) -> Vec<MessageRef> {
        let excess = window.len().saturating_sub(cap);
        window.drain(..excess).collect()
    }

    /// Remove one message from a topic window, wherever it sits. No-op if absent.
    pub fn remove(&mut self, key: TopicKey, message: &MessageRef) -> bool {
        let Some(window) = self.windows.get_mut(&key) else {
            return false;
        };

        let before = window.len();
        window.retain(|tracked| tracked.identity() != message.identity());
        let removed = window.len() != before;
        if window.is_empty() {
            self.windows.remove(&key);
        }
        removed
    }

    /// Remove a message from every window it appears in.
    pub fn remove_everywhere(&mut self, message: &MessageRef) -> bool {
        let identity = message.identity();
        let mut removed = false;
        self.windows.retain(|_, window| {
            let before = window.len();
            window.retain(|tracked| tracked.identity() != identity);
            removed |= window.len() != before;
            !window.is_empty()
        });
        removed
    }

    pub fn window(&self, key: TopicKey) -> Vec<MessageRef> {
        self.windows
            .get(&key)
            .map(|window| window.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, message: &MessageRef) -> bool {
        let identity = message.identity();
        self.windows
            .values()
            .any(|window| window.iter().any(|tracked| tracked.identity() == identity))
    }

    pub fn topics(&self) -> impl Iterator<Item = (TopicKey, &VecDeque<MessageRef>)> + '_ {
        self.windows.iter().map(|(key, window)| (*key, window))
    }

    pub fn tracked_count(&self) -> usize {
        self.windows.values().map(VecDeque::len).sum()
    }

    pub(crate) fn insert_window(&mut self, key: TopicKey, messages: VecDeque<MessageRef>) {
        if !messages.is_empty() {
            self.windows.insert(key, messages);
        }
    }
}
