//! Persistent entities: trucks, sessions, cycles, scans and audit records.

use crate::domain::checkpoint::Checkpoint;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status written on every accepted scan.
pub const SCAN_STATUS_OK: &str = "OK";

/// A truck, identified by the device cookie it scans from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truck {
    pub id: i64,
    pub device_cookie: Option<String>,
}

/// Time-boxed session for one plate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub truck_id: i64,
    pub plate: String,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub closed: bool,
}

impl Session {
    /// Active when `started_at <= now <= ends_at` and not closed.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.closed && self.started_at <= now && now <= self.ends_at
    }
}

/// Fields needed to open a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub truck_id: i64,
    pub plate: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl NewSession {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.started_at + self.duration
    }
}

/// One pass of a truck through the checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: i64,
    pub session_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub completed: bool,
}

/// A single QR scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    pub id: i64,
    pub cycle_id: i64,
    pub checkpoint: Checkpoint,
    pub scanned_at: DateTime<Utc>,
    pub status: String,
}

/// What happened to a cycle recorded in the audit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Closed,
    Deleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Closed => "closed",
            AuditAction::Deleted => "deleted",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "closed" => Some(AuditAction::Closed),
            "deleted" => Some(AuditAction::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit row for a manual or automatic close/delete of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleAuditRecord {
    pub id: i64,
    pub plate: String,
    pub recorded_at: DateTime<Utc>,
    pub session_id: i64,
    pub cycle_id: i64,
    pub action: AuditAction,
    pub reason: String,
    pub details: serde_json::Value,
    pub recorded_by: String,
}

/// Audit row before insertion.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub plate: String,
    pub recorded_at: DateTime<Utc>,
    pub session_id: i64,
    pub cycle_id: i64,
    pub action: AuditAction,
    pub reason: String,
    pub details: serde_json::Value,
    pub recorded_by: String,
}

/// Normalize a plate for storage and lookup.
///
/// Returns `None` for blank input.
pub fn normalize_plate(raw: &str) -> Option<String> {
    let plate: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if plate.is_empty() {
        None
    } else {
        Some(plate)
    }
}
