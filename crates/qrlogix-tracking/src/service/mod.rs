//! # Check-in Service
//!
//! Reconciles trucks, sessions and cycles for every QR scan and manages
//! cycles afterwards (automatic discard, manual close/delete, views).
//!
//! ## Architecture
//!
//! This service:
//! 1. Registers scans against the right session/cycle (`registration`)
//! 2. Closes or discards cycles at the exit checkpoint
//! 3. Applies supervisor actions and records them in the audit table (`cycles`)
//! 4. Maintains the plate/device whitelists (`devices`)
//! 5. Uses dependency injection for storage and time

mod cycles;
mod devices;
mod locks;
mod registration;

pub use cycles::{
    DashboardSummary, ManualAction, ManualActionRequest, ManualActionResult, ManualCycleAction,
    OpenCycleView,
};
pub use locks::KeyedLocks;
pub use registration::{
    CheckpointStatus, CycleOutcome, ScanOutcome, ScanRegistration, ScanRequest,
};

use crate::ports::{CheckinRepository, TimeSource};
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

/// Recorded as author of automatic audit rows.
pub const SYSTEM_ACTOR: &str = "Sistema";

/// Reason recorded when a cycle reaches exit without the load checkpoint.
pub const MISSED_LOAD_REASON: &str = "Omitió punto3";

/// Tunables for the check-in service.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Lifetime of a new session.
    pub session_duration: Duration,
    /// How recent the last scan of another device's cycle must be for a
    /// plate to take that cycle over.
    pub reuse_window: Duration,
    /// Reject plates that are not on the authorized list.
    pub enforce_plate_whitelist: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            session_duration: Duration::minutes(60),
            reuse_window: Duration::minutes(60),
            enforce_plate_whitelist: false,
        }
    }
}

/// The check-in service.
pub struct CheckinService {
    pub(crate) repo: Arc<dyn CheckinRepository>,
    pub(crate) clock: Arc<dyn TimeSource>,
    pub(crate) config: TrackingConfig,
    pub(crate) locks: KeyedLocks,
}

impl CheckinService {
    pub fn new(
        repo: Arc<dyn CheckinRepository>,
        clock: Arc<dyn TimeSource>,
        config: TrackingConfig,
    ) -> Self {
        Self {
            repo,
            clock,
            config,
            locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Release lock entries for keys that are no longer in use.
    pub fn prune_locks(&self) -> usize {
        self.locks.prune()
    }
}

/// Mint a new device cookie value (32 hex chars).
pub fn new_device_cookie() -> String {
    Uuid::new_v4().simple().to_string()
}
