//! # Check-in Tracking
//!
//! Records truck QR scans at the facility checkpoints and keeps each scan
//! attached to the right session and cycle for its plate.
//!
//! ## Flow
//!
//! ```text
//! punto1 ──→ punto2 ──→ punto3 ──→ punto4
//! Ingreso    Espera     Carga      Salida
//!                         │           │
//!                         │           ├── load scanned → cycle completed
//!                         └───────────┴── load missing → cycle discarded + audit
//! ```
//!
//! ## Rules
//!
//! | Rule | Description |
//! |------|-------------|
//! | Active session | `started_at <= now <= ends_at` and not closed |
//! | Idempotent scans | One scan per checkpoint per cycle |
//! | Cross-device reuse | A plate takes over another device's open cycle scanned within the reuse window |
//! | Single discard audit | A discarded cycle is audited once |
//! | Session ends at exit | Settling a cycle at punto4 closes its session |
//! | Local time | Display and calendar days use America/Panama (UTC-05:00) |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, checkpoints, errors, time helpers, reminders
//! - `ports/` - Repository and clock traits
//! - `service/` - Scan registration and cycle management
//! - `adapters/` - In-memory and SQLite repositories, clocks
//! - `report` - Cycle report and xlsx rendering
//!
//! ## Usage
//!
//! ```ignore
//! use qrlogix_tracking::{CheckinService, Checkpoint, InMemoryRepository, SystemTimeSource};
//!
//! let service = CheckinService::new(
//!     Arc::new(InMemoryRepository::new()),
//!     Arc::new(SystemTimeSource),
//!     TrackingConfig::default(),
//! );
//! let outcome = service
//!     .scan_checkpoint(None, Some("HE2345".into()), Checkpoint::Entry)
//!     .await?;
//! ```

#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod report;
pub mod service;

// Re-export key types for convenience
pub use adapters::{InMemoryRepository, ManualClock, SystemTimeSource};
#[cfg(feature = "sqlite")]
pub use adapters::{SqliteConfig, SqliteRepository};
pub use domain::{
    normalize_plate, reminder, AuditAction, Checkpoint, CheckpointState, Cycle, CycleAuditRecord,
    Reminder, ReminderMode, Scan, Session, TrackingError, TrackingResult, Truck,
};
pub use ports::{CheckinRepository, TimeSource};
pub use report::{report_filename, CycleReport, ReportRow, XLSX_CONTENT_TYPE};
pub use service::{
    new_device_cookie, CheckinService, CheckpointStatus, CycleOutcome, DashboardSummary,
    ManualAction, ManualActionRequest, ManualActionResult, OpenCycleView, ScanOutcome,
    ScanRequest, TrackingConfig,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
