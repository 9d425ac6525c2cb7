//! Domain types for check-in tracking.

pub mod checkpoint;
pub mod entities;
pub mod errors;
pub mod messages;
pub mod time;

pub use checkpoint::{checkpoint_states, has_skips, Checkpoint, CheckpointState};
pub use entities::{
    normalize_plate, AuditAction, Cycle, CycleAuditRecord, NewAuditRecord, NewSession, Scan,
    Session, Truck, SCAN_STATUS_OK,
};
pub use errors::{TrackingError, TrackingResult};
pub use messages::{reminder, Reminder, ReminderMode};
