//! In-memory repository for tests and local demos.

use crate::domain::{
    Checkpoint, Cycle, CycleAuditRecord, NewAuditRecord, NewSession, Scan, Session,
    TrackingResult, Truck, SCAN_STATUS_OK,
};
use crate::ports::CheckinRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};

#[derive(Default)]
struct Tables {
    next_id: i64,
    trucks: BTreeMap<i64, Truck>,
    sessions: BTreeMap<i64, Session>,
    cycles: BTreeMap<i64, Cycle>,
    scans: BTreeMap<i64, Scan>,
    audit: BTreeMap<i64, CycleAuditRecord>,
    plates: HashSet<String>,
    devices: HashSet<(String, String)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Repository backed by ordered maps behind a lock.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cycles, open or not.
    pub fn cycle_count(&self) -> usize {
        self.tables.read().cycles.len()
    }

    pub fn scan_count(&self) -> usize {
        self.tables.read().scans.len()
    }

    pub fn truck_count(&self) -> usize {
        self.tables.read().trucks.len()
    }
}

#[async_trait]
impl CheckinRepository for InMemoryRepository {
    async fn truck_by_cookie(&self, cookie: &str) -> TrackingResult<Option<Truck>> {
        Ok(self
            .tables
            .read()
            .trucks
            .values()
            .find(|t| t.device_cookie.as_deref() == Some(cookie))
            .cloned())
    }

    async fn truck(&self, truck_id: i64) -> TrackingResult<Option<Truck>> {
        Ok(self.tables.read().trucks.get(&truck_id).cloned())
    }

    async fn create_truck(&self, cookie: Option<&str>) -> TrackingResult<Truck> {
        let mut tables = self.tables.write();
        let truck = Truck {
            id: tables.next_id(),
            device_cookie: cookie.map(str::to_string),
        };
        tables.trucks.insert(truck.id, truck.clone());
        Ok(truck)
    }

    async fn active_session_for_truck(
        &self,
        truck_id: i64,
        now: DateTime<Utc>,
    ) -> TrackingResult<Option<Session>> {
        Ok(self
            .tables
            .read()
            .sessions
            .values()
            .rev()
            .find(|s| s.truck_id == truck_id && s.is_active(now))
            .cloned())
    }

    async fn active_session_for_plate(
        &self,
        plate: &str,
        now: DateTime<Utc>,
    ) -> TrackingResult<Option<Session>> {
        Ok(self
            .tables
            .read()
            .sessions
            .values()
            .rev()
            .find(|s| s.plate == plate && s.is_active(now))
            .cloned())
    }

    async fn latest_session_for_plate(&self, plate: &str) -> TrackingResult<Option<Session>> {
        Ok(self
            .tables
            .read()
            .sessions
            .values()
            .filter(|s| s.plate == plate)
            .max_by_key(|s| (s.started_at, s.id))
            .cloned())
    }

    async fn session(&self, session_id: i64) -> TrackingResult<Option<Session>> {
        Ok(self.tables.read().sessions.get(&session_id).cloned())
    }

    async fn create_session(&self, new: NewSession) -> TrackingResult<Session> {
        let mut tables = self.tables.write();
        let session = Session {
            id: tables.next_id(),
            truck_id: new.truck_id,
            ends_at: new.ends_at(),
            plate: new.plate,
            started_at: new.started_at,
            closed: false,
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn reassign_session(&self, session_id: i64, truck_id: i64) -> TrackingResult<()> {
        if let Some(session) = self.tables.write().sessions.get_mut(&session_id) {
            session.truck_id = truck_id;
        }
        Ok(())
    }

    async fn close_session(&self, session_id: i64, at: DateTime<Utc>) -> TrackingResult<()> {
        if let Some(session) = self.tables.write().sessions.get_mut(&session_id) {
            session.ends_at = at;
            session.closed = true;
        }
        Ok(())
    }

    async fn count_active_sessions(&self, now: DateTime<Utc>) -> TrackingResult<u64> {
        Ok(self
            .tables
            .read()
            .sessions
            .values()
            .filter(|s| s.is_active(now))
            .count() as u64)
    }

    async fn open_cycle_for_session(&self, session_id: i64) -> TrackingResult<Option<Cycle>> {
        Ok(self
            .tables
            .read()
            .cycles
            .values()
            .filter(|c| c.session_id == session_id && !c.completed)
            .max_by_key(|c| (c.started_at, c.id))
            .cloned())
    }

    async fn create_cycle(
        &self,
        session_id: i64,
        started_at: DateTime<Utc>,
    ) -> TrackingResult<Cycle> {
        let mut tables = self.tables.write();
        let cycle = Cycle {
            id: tables.next_id(),
            session_id,
            started_at,
            ended_at: None,
            completed: false,
        };
        tables.cycles.insert(cycle.id, cycle.clone());
        Ok(cycle)
    }

    async fn complete_cycle(&self, cycle_id: i64, ended_at: DateTime<Utc>) -> TrackingResult<()> {
        if let Some(cycle) = self.tables.write().cycles.get_mut(&cycle_id) {
            cycle.completed = true;
            cycle.ended_at = Some(ended_at);
        }
        Ok(())
    }

    async fn delete_cycle(&self, cycle_id: i64) -> TrackingResult<()> {
        let mut tables = self.tables.write();
        tables.scans.retain(|_, s| s.cycle_id != cycle_id);
        tables.cycles.remove(&cycle_id);
        Ok(())
    }

    async fn open_cycles(&self) -> TrackingResult<Vec<Cycle>> {
        Ok(self
            .tables
            .read()
            .cycles
            .values()
            .filter(|c| !c.completed)
            .cloned()
            .collect())
    }

    async fn cycles_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TrackingResult<Vec<Cycle>> {
        let mut cycles: Vec<Cycle> = self
            .tables
            .read()
            .cycles
            .values()
            .filter(|c| c.started_at >= from && c.started_at < to)
            .cloned()
            .collect();
        cycles.sort_by_key(|c| (c.started_at, c.id));
        Ok(cycles)
    }

    async fn count_cycles_completed_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TrackingResult<u64> {
        Ok(self
            .tables
            .read()
            .cycles
            .values()
            .filter(|c| c.completed && c.ended_at.is_some_and(|e| e >= from && e < to))
            .count() as u64)
    }

    async fn scan_for_checkpoint(
        &self,
        cycle_id: i64,
        checkpoint: Checkpoint,
    ) -> TrackingResult<Option<Scan>> {
        Ok(self
            .tables
            .read()
            .scans
            .values()
            .find(|s| s.cycle_id == cycle_id && s.checkpoint == checkpoint)
            .cloned())
    }

    async fn insert_scan(
        &self,
        cycle_id: i64,
        checkpoint: Checkpoint,
        scanned_at: DateTime<Utc>,
    ) -> TrackingResult<Scan> {
        let mut tables = self.tables.write();
        let scan = Scan {
            id: tables.next_id(),
            cycle_id,
            checkpoint,
            scanned_at,
            status: SCAN_STATUS_OK.to_string(),
        };
        tables.scans.insert(scan.id, scan.clone());
        Ok(scan)
    }

    async fn last_scan(&self, cycle_id: i64) -> TrackingResult<Option<Scan>> {
        Ok(self
            .tables
            .read()
            .scans
            .values()
            .filter(|s| s.cycle_id == cycle_id)
            .max_by_key(|s| (s.scanned_at, s.id))
            .cloned())
    }

    async fn scans_for_cycle(&self, cycle_id: i64) -> TrackingResult<Vec<Scan>> {
        let mut scans: Vec<Scan> = self
            .tables
            .read()
            .scans
            .values()
            .filter(|s| s.cycle_id == cycle_id)
            .cloned()
            .collect();
        scans.sort_by_key(|s| (s.scanned_at, s.id));
        Ok(scans)
    }

    async fn audit_exists(&self, session_id: i64, cycle_id: i64) -> TrackingResult<bool> {
        Ok(self
            .tables
            .read()
            .audit
            .values()
            .any(|a| a.session_id == session_id && a.cycle_id == cycle_id))
    }

    async fn insert_audit(&self, record: NewAuditRecord) -> TrackingResult<CycleAuditRecord> {
        let mut tables = self.tables.write();
        let stored = CycleAuditRecord {
            id: tables.next_id(),
            plate: record.plate,
            recorded_at: record.recorded_at,
            session_id: record.session_id,
            cycle_id: record.cycle_id,
            action: record.action,
            reason: record.reason,
            details: record.details,
            recorded_by: record.recorded_by,
        };
        tables.audit.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn audit_records_for_plate(&self, plate: &str) -> TrackingResult<Vec<CycleAuditRecord>> {
        Ok(self
            .tables
            .read()
            .audit
            .values()
            .filter(|a| a.plate == plate)
            .cloned()
            .collect())
    }

    async fn is_plate_authorized(&self, plate: &str) -> TrackingResult<bool> {
        Ok(self.tables.read().plates.contains(plate))
    }

    async fn authorize_plate(&self, plate: &str) -> TrackingResult<bool> {
        Ok(self.tables.write().plates.insert(plate.to_string()))
    }

    async fn is_device_authorized(&self, device_id: &str, plate: &str) -> TrackingResult<bool> {
        Ok(self
            .tables
            .read()
            .devices
            .contains(&(device_id.to_string(), plate.to_string())))
    }

    async fn authorize_device(&self, device_id: &str, plate: &str) -> TrackingResult<()> {
        self.tables
            .write()
            .devices
            .insert((device_id.to_string(), plate.to_string()));
        Ok(())
    }
}
