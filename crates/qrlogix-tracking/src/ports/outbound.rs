//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the check-in service requires from the host application.
//!
//! Production: `SqliteRepository` (adapters/sqlite.rs)
//! Testing: `InMemoryRepository` (adapters/memory.rs)

use crate::domain::{
    Checkpoint, Cycle, CycleAuditRecord, NewAuditRecord, NewSession, Scan, Session,
    TrackingResult, Truck,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence for trucks, sessions, cycles, scans, audit rows and the
/// authorization lists.
///
/// Every call is committed on its own. Callers that need several calls to
/// appear atomic serialize them in the service.
#[async_trait]
pub trait CheckinRepository: Send + Sync {
    // ---------------------------------------------------------------- trucks

    async fn truck_by_cookie(&self, cookie: &str) -> TrackingResult<Option<Truck>>;

    async fn truck(&self, truck_id: i64) -> TrackingResult<Option<Truck>>;

    async fn create_truck(&self, cookie: Option<&str>) -> TrackingResult<Truck>;

    // -------------------------------------------------------------- sessions

    /// Active session of a truck at `now`.
    async fn active_session_for_truck(
        &self,
        truck_id: i64,
        now: DateTime<Utc>,
    ) -> TrackingResult<Option<Session>>;

    /// Active session for a plate at `now`, regardless of truck.
    async fn active_session_for_plate(
        &self,
        plate: &str,
        now: DateTime<Utc>,
    ) -> TrackingResult<Option<Session>>;

    /// Most recently started session for a plate, active or not.
    async fn latest_session_for_plate(&self, plate: &str) -> TrackingResult<Option<Session>>;

    async fn session(&self, session_id: i64) -> TrackingResult<Option<Session>>;

    async fn create_session(&self, new: NewSession) -> TrackingResult<Session>;

    /// Move a session to another truck.
    async fn reassign_session(&self, session_id: i64, truck_id: i64) -> TrackingResult<()>;

    /// End a session at `at`; it is no longer active afterwards.
    async fn close_session(&self, session_id: i64, at: DateTime<Utc>) -> TrackingResult<()>;

    async fn count_active_sessions(&self, now: DateTime<Utc>) -> TrackingResult<u64>;

    // ---------------------------------------------------------------- cycles

    /// Latest open cycle of a session.
    async fn open_cycle_for_session(&self, session_id: i64) -> TrackingResult<Option<Cycle>>;

    async fn create_cycle(&self, session_id: i64, started_at: DateTime<Utc>)
        -> TrackingResult<Cycle>;

    async fn complete_cycle(&self, cycle_id: i64, ended_at: DateTime<Utc>) -> TrackingResult<()>;

    /// Delete a cycle and all of its scans.
    async fn delete_cycle(&self, cycle_id: i64) -> TrackingResult<()>;

    /// All open cycles.
    async fn open_cycles(&self) -> TrackingResult<Vec<Cycle>>;

    /// Cycles with `from <= started_at < to`, oldest first.
    async fn cycles_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TrackingResult<Vec<Cycle>>;

    /// Completed cycles with `from <= ended_at < to`.
    async fn count_cycles_completed_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TrackingResult<u64>;

    // ----------------------------------------------------------------- scans

    async fn scan_for_checkpoint(
        &self,
        cycle_id: i64,
        checkpoint: Checkpoint,
    ) -> TrackingResult<Option<Scan>>;

    async fn insert_scan(
        &self,
        cycle_id: i64,
        checkpoint: Checkpoint,
        scanned_at: DateTime<Utc>,
    ) -> TrackingResult<Scan>;

    async fn last_scan(&self, cycle_id: i64) -> TrackingResult<Option<Scan>>;

    /// Scans of a cycle ordered by time.
    async fn scans_for_cycle(&self, cycle_id: i64) -> TrackingResult<Vec<Scan>>;

    // ----------------------------------------------------------------- audit

    /// True when an audit row exists for this session and cycle.
    async fn audit_exists(&self, session_id: i64, cycle_id: i64) -> TrackingResult<bool>;

    async fn insert_audit(&self, record: NewAuditRecord) -> TrackingResult<CycleAuditRecord>;

    async fn audit_records_for_plate(&self, plate: &str) -> TrackingResult<Vec<CycleAuditRecord>>;

    // ------------------------------------------------------------ whitelists

    async fn is_plate_authorized(&self, plate: &str) -> TrackingResult<bool>;

    /// Returns true when the plate was newly added.
    async fn authorize_plate(&self, plate: &str) -> TrackingResult<bool>;

    async fn is_device_authorized(&self, device_id: &str, plate: &str) -> TrackingResult<bool>;

    async fn authorize_device(&self, device_id: &str, plate: &str) -> TrackingResult<()>;
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
