//! Cycle management: automatic discard, supervisor actions, views.

use super::{CheckinService, MISSED_LOAD_REASON, SYSTEM_ACTOR};
use crate::domain::time::{format_clock, local_date, start_of_day};
use crate::domain::{
    normalize_plate, AuditAction, Checkpoint, Cycle, CycleAuditRecord, NewAuditRecord, Session,
    TrackingError, TrackingResult,
};
use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Supervisor action on a plate's open cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualAction {
    #[serde(rename = "cerrar")]
    Close,
    #[serde(rename = "eliminar")]
    Delete,
}

impl ManualAction {
    pub fn parse(raw: &str) -> TrackingResult<Self> {
        match raw.trim() {
            "cerrar" => Ok(ManualAction::Close),
            "eliminar" => Ok(ManualAction::Delete),
            other => Err(TrackingError::InvalidAction(other.to_string())),
        }
    }

    /// Message returned to the dashboard on success.
    pub fn success_message(&self) -> &'static str {
        match self {
            ManualAction::Close => "Ciclo cerrado correctamente.",
            ManualAction::Delete => "Ciclo eliminado correctamente.",
        }
    }
}

/// Body of `POST /ciclos/accion`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManualActionRequest {
    #[serde(default)]
    pub placa: Option<String>,
    #[serde(default)]
    pub motivo: Option<String>,
    #[serde(default)]
    pub detalles: Option<serde_json::Value>,
    #[serde(default)]
    pub registrado_por: Option<String>,
    #[serde(default)]
    pub accion: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualActionResult {
    pub action: ManualAction,
    pub msg: &'static str,
    pub audit: CycleAuditRecord,
}

/// A close/delete on a known cycle.
#[derive(Debug, Clone)]
pub struct ManualCycleAction {
    pub cycle_id: i64,
    pub session_id: i64,
    pub plate: String,
    pub reason: String,
    pub details: serde_json::Value,
    pub recorded_by: String,
}

/// Row of the open cycles board.
#[derive(Debug, Clone, Serialize)]
pub struct OpenCycleView {
    pub plate: String,
    pub cycle_id: i64,
    /// Scanned checkpoints in scan order.
    pub checkpoints: Vec<Checkpoint>,
    /// First scan.
    pub started_at: DateTime<Utc>,
    pub last_scan_at: DateTime<Utc>,
    pub minutes_elapsed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub open_cycles: u64,
    pub active_sessions: u64,
    pub completed_today: u64,
}

/// Audit details as JSON: strings holding JSON are parsed, null becomes `{}`.
fn normalize_details(details: Option<serde_json::Value>) -> serde_json::Value {
    match details {
        None | Some(serde_json::Value::Null) => serde_json::json!({}),
        Some(serde_json::Value::String(raw)) if raw.trim().is_empty() => serde_json::json!({}),
        Some(serde_json::Value::String(raw)) => {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        }
        Some(other) => other,
    }
}

impl CheckinService {
    /// Delete a cycle that reached exit without loading, once.
    ///
    /// Returns false when the deletion was already recorded for this cycle.
    pub async fn delete_incomplete_cycle(
        &self,
        cycle: &Cycle,
        session: &Session,
    ) -> TrackingResult<bool> {
        if self.repo.audit_exists(session.id, cycle.id).await? {
            warn!(
                plate = %session.plate,
                cycle_id = cycle.id,
                "Deletion already recorded, skipping"
            );
            return Ok(false);
        }

        self.repo.delete_cycle(cycle.id).await?;

        let deleted_at = self.clock.now();
        self.repo
            .insert_audit(NewAuditRecord {
                plate: session.plate.clone(),
                recorded_at: deleted_at,
                session_id: session.id,
                cycle_id: cycle.id,
                action: AuditAction::Deleted,
                reason: MISSED_LOAD_REASON.to_string(),
                details: serde_json::json!({}),
                recorded_by: SYSTEM_ACTOR.to_string(),
            })
            .await?;

        info!(
            plate = %session.plate,
            cycle_id = cycle.id,
            at = %format_clock(deleted_at),
            "Cycle discarded: load checkpoint skipped"
        );
        Ok(true)
    }

    /// Mark a cycle completed by hand and record it.
    pub async fn close_cycle_manual(
        &self,
        action: ManualCycleAction,
    ) -> TrackingResult<CycleAuditRecord> {
        let closed_at = self.clock.now();
        self.repo.complete_cycle(action.cycle_id, closed_at).await?;

        let audit = self
            .repo
            .insert_audit(audit_record(action, AuditAction::Closed, closed_at))
            .await?;

        info!(
            plate = %audit.plate,
            reason = %audit.reason,
            by = %audit.recorded_by,
            at = %format_clock(closed_at),
            "Cycle closed manually"
        );
        Ok(audit)
    }

    /// Delete a cycle by hand, recording it first.
    pub async fn delete_cycle_manual(
        &self,
        action: ManualCycleAction,
    ) -> TrackingResult<CycleAuditRecord> {
        let deleted_at = self.clock.now();
        let cycle_id = action.cycle_id;

        let audit = self
            .repo
            .insert_audit(audit_record(action, AuditAction::Deleted, deleted_at))
            .await?;
        self.repo.delete_cycle(cycle_id).await?;

        info!(
            plate = %audit.plate,
            reason = %audit.reason,
            by = %audit.recorded_by,
            at = %format_clock(deleted_at),
            "Cycle deleted manually"
        );
        Ok(audit)
    }

    /// Apply a supervisor action to the latest open cycle of a plate.
    ///
    /// The session and cycle are looked up before the action is checked, so
    /// an unknown plate reports `SessionNotFound` whatever the action.
    pub async fn apply_manual_action(
        &self,
        request: ManualActionRequest,
    ) -> TrackingResult<ManualActionResult> {
        let raw_plate = request.placa.unwrap_or_default();
        let plate = normalize_plate(&raw_plate)
            .ok_or_else(|| TrackingError::SessionNotFound(raw_plate.clone()))?;
        let _guard = self.locks.acquire(&format!("plate:{plate}")).await;

        let session = self
            .repo
            .latest_session_for_plate(&plate)
            .await?
            .ok_or_else(|| TrackingError::SessionNotFound(plate.clone()))?;
        let cycle = self
            .repo
            .open_cycle_for_session(session.id)
            .await?
            .ok_or_else(|| TrackingError::OpenCycleNotFound(plate.clone()))?;
        let action = ManualAction::parse(request.accion.as_deref().unwrap_or_default())?;

        let cycle_action = ManualCycleAction {
            cycle_id: cycle.id,
            session_id: session.id,
            plate,
            reason: request.motivo.unwrap_or_default(),
            details: normalize_details(request.detalles),
            recorded_by: request.registrado_por.unwrap_or_default(),
        };

        let audit = match action {
            ManualAction::Close => self.close_cycle_manual(cycle_action).await?,
            ManualAction::Delete => self.delete_cycle_manual(cycle_action).await?,
        };

        Ok(ManualActionResult {
            action,
            msg: action.success_message(),
            audit,
        })
    }

    /// Open cycles with at least one scan, oldest first.
    pub async fn open_cycles(&self) -> TrackingResult<Vec<OpenCycleView>> {
        let mut views = Vec::new();

        for cycle in self.repo.open_cycles().await? {
            let scans = self.repo.scans_for_cycle(cycle.id).await?;
            let (Some(first), Some(last)) = (scans.first(), scans.last()) else {
                continue;
            };
            let Some(session) = self.repo.session(cycle.session_id).await? else {
                continue;
            };

            let elapsed = last.scanned_at - first.scanned_at;
            views.push(OpenCycleView {
                plate: session.plate,
                cycle_id: cycle.id,
                checkpoints: scans.iter().map(|s| s.checkpoint).collect(),
                started_at: first.scanned_at,
                last_scan_at: last.scanned_at,
                minutes_elapsed: elapsed.num_milliseconds() as f64 / 60_000.0,
            });
        }

        views.sort_by_key(|v| (v.started_at, v.cycle_id));
        Ok(views)
    }

    /// Counters for the dashboard.
    pub async fn dashboard_summary(&self) -> TrackingResult<DashboardSummary> {
        let now = self.clock.now();
        let today = local_date(now);
        let day_start = start_of_day(today);
        let day_end = today
            .checked_add_days(Days::new(1))
            .map(start_of_day)
            .unwrap_or(now);

        Ok(DashboardSummary {
            open_cycles: self.repo.open_cycles().await?.len() as u64,
            active_sessions: self.repo.count_active_sessions(now).await?,
            completed_today: self
                .repo
                .count_cycles_completed_between(day_start, day_end)
                .await?,
        })
    }

    /// Audit trail of a plate.
    pub async fn audit_trail(&self, plate: &str) -> TrackingResult<Vec<CycleAuditRecord>> {
        let plate =
            normalize_plate(plate).ok_or_else(|| TrackingError::InvalidPlate(plate.to_string()))?;
        self.repo.audit_records_for_plate(&plate).await
    }
}

fn audit_record(
    action: ManualCycleAction,
    kind: AuditAction,
    at: DateTime<Utc>,
) -> NewAuditRecord {
    NewAuditRecord {
        plate: action.plate,
        recorded_at: at,
        session_id: action.session_id,
        cycle_id: action.cycle_id,
        action: kind,
        reason: action.reason,
        details: action.details,
        recorded_by: action.recorded_by,
    }
}
