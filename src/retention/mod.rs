//! Retention core: per-topic policies, the pending-deletion schedule, the
//! bounded message windows and the sweep that turns them into deletions.

pub mod engine;
pub mod policy;
pub mod schedule;
pub mod snapshot;
pub mod state;
pub mod sweep;
pub mod types;
pub mod window;

pub use engine::{ArrivalOutcome, EvictionReport, PolicyChange, RetentionEngine};
pub use policy::PolicyStore;
pub use schedule::DeletionSchedule;
pub use snapshot::SnapshotStore;
pub use state::RetentionState;
pub use sweep::{SweepReport, SweepSettings, run_sweep_loop, sweep_once};
pub use types::{MAIN_THREAD, MessageRef, RetentionPolicy, ScheduledDeletion, TopicKey};
pub use window::WindowTracker;
