use super::policy::PolicyStore;
use super::schedule::DeletionSchedule;
use super::window::WindowTracker;

/// Everything the retention engine owns and persists as one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionState {
    pub policies: PolicyStore,
    pub schedule: DeletionSchedule,
    pub windows: WindowTracker,
}

impl RetentionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty() && self.schedule.is_empty() && self.windows.tracked_count() == 0
    }
}
