//! Scan registration: truck/session/cycle reconciliation.

use super::{new_device_cookie, CheckinService};
use crate::domain::time::format_clock;
use crate::domain::{
    checkpoint_states, normalize_plate, reminder, Checkpoint, CheckpointState, Cycle, NewSession,
    Reminder, ReminderMode, Scan, Session, TrackingError, TrackingResult, Truck,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

/// Input for a scan registration.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Cookie the device presented, if any.
    pub device_cookie: Option<String>,
    /// Plate typed by the driver, if any.
    pub plate: Option<String>,
    pub checkpoint: Option<Checkpoint>,
    /// When false only the truck/session/cycle are reconciled.
    pub create_scan: bool,
}

impl ScanRequest {
    pub fn scan(device_cookie: Option<String>, plate: Option<String>, checkpoint: Checkpoint) -> Self {
        Self {
            device_cookie,
            plate,
            checkpoint: Some(checkpoint),
            create_scan: true,
        }
    }
}

/// Entities touched by a registration.
#[derive(Debug, Clone)]
pub struct ScanRegistration {
    pub truck: Truck,
    pub session: Session,
    pub cycle: Cycle,
    pub scan: Option<Scan>,
    /// Cookie the device should keep from now on.
    pub cookie: String,
    /// True when the plate took over another device's cycle.
    pub reused: bool,
}

/// What happened to the cycle after the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleOutcome {
    Open,
    Completed,
    /// Exit reached without the load checkpoint; cycle deleted.
    Discarded,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckpointStatus {
    pub checkpoint: Checkpoint,
    pub name: &'static str,
    pub state: CheckpointState,
}

/// Result of scanning a checkpoint, as presented to the driver.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub plate: String,
    pub checkpoint: Checkpoint,
    pub checkpoint_name: &'static str,
    pub scanned_at: DateTime<Utc>,
    /// Plant-local clock time of the scan.
    pub time: String,
    pub states: Vec<CheckpointStatus>,
    pub session_id: i64,
    pub cycle_id: i64,
    pub cycle: CycleOutcome,
    pub reused: bool,
    #[serde(skip)]
    pub cookie: String,
    pub reminder: Reminder,
}

impl CheckinService {
    /// Reconcile truck, session and cycle for a device/plate and record the
    /// scan if requested.
    pub async fn register_scan(&self, request: ScanRequest) -> TrackingResult<ScanRegistration> {
        let plate = request.plate.as_deref().and_then(normalize_plate);
        let _guards = self
            .lock_registration(plate.as_deref(), request.device_cookie.as_deref())
            .await?;
        self.register_scan_unlocked(&request, plate).await
    }

    /// Register a scan at `checkpoint` and settle the cycle when it is the
    /// final checkpoint.
    pub async fn scan_checkpoint(
        &self,
        device_cookie: Option<String>,
        plate: Option<String>,
        checkpoint: Checkpoint,
    ) -> TrackingResult<ScanOutcome> {
        let request = ScanRequest::scan(device_cookie, plate, checkpoint);
        let plate = request.plate.as_deref().and_then(normalize_plate);
        let _guards = self
            .lock_registration(plate.as_deref(), request.device_cookie.as_deref())
            .await?;

        let registration = self.register_scan_unlocked(&request, plate).await?;
        let scan = registration
            .scan
            .clone()
            .ok_or_else(|| TrackingError::storage("scan was not recorded"))?;

        let scanned: Vec<Checkpoint> = self
            .repo
            .scans_for_cycle(registration.cycle.id)
            .await?
            .iter()
            .map(|s| s.checkpoint)
            .collect();

        let cycle = if checkpoint.is_final() {
            self.settle_cycle(&registration, &scanned).await?
        } else {
            CycleOutcome::Open
        };

        let states = checkpoint_states(&scanned)
            .into_iter()
            .map(|(checkpoint, state)| CheckpointStatus {
                checkpoint,
                name: checkpoint.display_name(),
                state,
            })
            .collect();

        Ok(ScanOutcome {
            plate: registration.session.plate.clone(),
            checkpoint,
            checkpoint_name: checkpoint.display_name(),
            scanned_at: scan.scanned_at,
            time: format_clock(scan.scanned_at),
            states,
            session_id: registration.session.id,
            cycle_id: registration.cycle.id,
            cycle,
            reused: registration.reused,
            cookie: registration.cookie,
            reminder: reminder(ReminderMode::Safety),
        })
    }

    /// Active session of the truck behind a cookie, if any.
    pub async fn active_session_for_cookie(&self, cookie: &str) -> TrackingResult<Option<Session>> {
        let now = self.clock.now();
        match self.repo.truck_by_cookie(cookie).await? {
            Some(truck) => self.repo.active_session_for_truck(truck.id, now).await,
            None => Ok(None),
        }
    }

    /// Lock keys for a registration: the plate of the session the device
    /// already has (or the typed plate), plus the device cookie.
    async fn registration_lock_keys(
        &self,
        plate: Option<&str>,
        cookie: Option<&str>,
    ) -> TrackingResult<Vec<String>> {
        let cookie = cookie.filter(|c| !c.is_empty());
        let session_plate = match cookie {
            Some(cookie) => self.active_session_for_cookie(cookie).await?.map(|s| s.plate),
            None => None,
        };

        let mut keys = Vec::with_capacity(2);
        if let Some(plate) = session_plate.as_deref().or(plate) {
            keys.push(format!("plate:{plate}"));
        }
        if let Some(cookie) = cookie {
            keys.push(format!("cookie:{cookie}"));
        }
        Ok(keys)
    }

    /// Hold the registration locks. Keys are resolved again once held and
    /// the locks retaken if the device's session moved in between.
    async fn lock_registration(
        &self,
        plate: Option<&str>,
        cookie: Option<&str>,
    ) -> TrackingResult<Vec<OwnedMutexGuard<()>>> {
        let mut keys = self.registration_lock_keys(plate, cookie).await?;
        loop {
            let guards = self.locks.acquire_all(&keys).await;
            let current = self.registration_lock_keys(plate, cookie).await?;
            if current == keys {
                return Ok(guards);
            }
            drop(guards);
            keys = current;
        }
    }

    async fn register_scan_unlocked(
        &self,
        request: &ScanRequest,
        plate: Option<String>,
    ) -> TrackingResult<ScanRegistration> {
        let now = self.clock.now();
        let reuse_limit = now - self.config.reuse_window;
        let device_cookie = request.device_cookie.as_deref().filter(|c| !c.is_empty());

        let mut canonical_cookie = device_cookie.map(str::to_string);
        let mut truck = match device_cookie {
            Some(cookie) => self.repo.truck_by_cookie(cookie).await?,
            None => None,
        };
        let mut session = match &truck {
            Some(t) => self.repo.active_session_for_truck(t.id, now).await?,
            None => None,
        };
        let mut cycle = None;
        let mut reused = false;

        if session.is_none() {
            let Some(plate) = plate.as_deref() else {
                return Err(TrackingError::PlateRequired);
            };
            if self.config.enforce_plate_whitelist && !self.repo.is_plate_authorized(plate).await? {
                return Err(TrackingError::InvalidPlate(plate.to_string()));
            }

            if let Some(plate_session) = self.repo.active_session_for_plate(plate, now).await? {
                if let Some(takeover) = self
                    .takeover_candidate(&plate_session, device_cookie, reuse_limit)
                    .await?
                {
                    let (owner, open_cycle) = takeover;
                    info!(
                        plate = %plate,
                        session_id = plate_session.id,
                        cycle_id = open_cycle.id,
                        "Reusing cycle started from another device"
                    );
                    canonical_cookie = owner.device_cookie.clone();
                    truck = Some(owner);
                    session = Some(plate_session);
                    cycle = Some(open_cycle);
                    reused = true;
                }
            }
        }

        let cookie = canonical_cookie.unwrap_or_else(new_device_cookie);

        let truck = match truck {
            Some(truck) => truck,
            None => {
                let truck = self.repo.create_truck(Some(&cookie)).await?;
                debug!(truck_id = truck.id, "Registered new truck");
                truck
            }
        };

        let session = match session {
            None => {
                let plate = plate.ok_or(TrackingError::PlateRequired)?;
                let session = self
                    .repo
                    .create_session(NewSession {
                        truck_id: truck.id,
                        plate,
                        started_at: now,
                        duration: self.config.session_duration,
                    })
                    .await?;
                info!(plate = %session.plate, session_id = session.id, "Opened session");
                session
            }
            Some(mut session) if session.truck_id != truck.id => {
                self.repo.reassign_session(session.id, truck.id).await?;
                session.truck_id = truck.id;
                session
            }
            Some(session) => session,
        };

        let cycle = match cycle {
            Some(cycle) => cycle,
            None => match self.repo.open_cycle_for_session(session.id).await? {
                Some(cycle) => cycle,
                None => {
                    let cycle = self.repo.create_cycle(session.id, now).await?;
                    debug!(plate = %session.plate, cycle_id = cycle.id, "Started cycle");
                    cycle
                }
            },
        };

        let scan = match (request.create_scan, request.checkpoint) {
            (true, Some(checkpoint)) => Some(self.record_scan(&cycle, checkpoint, now).await?),
            _ => None,
        };

        Ok(ScanRegistration {
            truck,
            session,
            cycle,
            scan,
            cookie,
            reused,
        })
    }

    /// The owner truck and open cycle of `session` when this device may take
    /// them over: the cycle saw a scan inside the reuse window and the owner
    /// scans from a different cookie.
    async fn takeover_candidate(
        &self,
        session: &Session,
        device_cookie: Option<&str>,
        reuse_limit: DateTime<Utc>,
    ) -> TrackingResult<Option<(Truck, Cycle)>> {
        let Some(open_cycle) = self.repo.open_cycle_for_session(session.id).await? else {
            return Ok(None);
        };
        let Some(last_scan) = self.repo.last_scan(open_cycle.id).await? else {
            return Ok(None);
        };
        if last_scan.scanned_at < reuse_limit {
            return Ok(None);
        }
        let Some(owner) = self.repo.truck(session.truck_id).await? else {
            return Ok(None);
        };
        match owner.device_cookie.as_deref() {
            Some(owner_cookie) if Some(owner_cookie) != device_cookie => {
                Ok(Some((owner, open_cycle)))
            }
            _ => Ok(None),
        }
    }

    /// Insert a scan unless the cycle already has one for this checkpoint.
    async fn record_scan(
        &self,
        cycle: &Cycle,
        checkpoint: Checkpoint,
        now: DateTime<Utc>,
    ) -> TrackingResult<Scan> {
        if let Some(existing) = self.repo.scan_for_checkpoint(cycle.id, checkpoint).await? {
            debug!(cycle_id = cycle.id, checkpoint = %checkpoint, "Duplicate scan ignored");
            return Ok(existing);
        }
        self.repo.insert_scan(cycle.id, checkpoint, now).await
    }

    /// Complete or discard the cycle at the exit checkpoint and end the
    /// session. A discard already recorded for this cycle leaves both open.
    async fn settle_cycle(
        &self,
        registration: &ScanRegistration,
        scanned: &[Checkpoint],
    ) -> TrackingResult<CycleOutcome> {
        let session = &registration.session;

        let outcome = if scanned.contains(&Checkpoint::LOAD) {
            let closed_at = self.clock.now();
            self.repo
                .complete_cycle(registration.cycle.id, closed_at)
                .await?;
            log_cycle_closed(session, closed_at);
            CycleOutcome::Completed
        } else if self
            .delete_incomplete_cycle(&registration.cycle, session)
            .await?
        {
            CycleOutcome::Discarded
        } else {
            return Ok(CycleOutcome::Open);
        };

        let ended_at = self.clock.now();
        self.repo.close_session(session.id, ended_at).await?;
        debug!(plate = %session.plate, session_id = session.id, "Session ended at exit");
        Ok(outcome)
    }
}

fn log_cycle_closed(session: &Session, closed_at: DateTime<Utc>) {
    info!(
        plate = %session.plate,
        session_id = session.id,
        at = %format_clock(closed_at),
        "Cycle completed"
    );
}
