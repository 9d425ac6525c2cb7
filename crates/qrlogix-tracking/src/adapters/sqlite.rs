//! SQLite repository through sqlx.
//!
//! Timestamps are stored as UTC unix milliseconds so range filters compare
//! integers. Table and column names keep the plant's existing schema.

use crate::domain::{
    AuditAction, Checkpoint, Cycle, CycleAuditRecord, NewAuditRecord, NewSession, Scan, Session,
    TrackingError, TrackingResult, Truck, SCAN_STATUS_OK,
};
use crate::ports::CheckinRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Schema, applied idempotently at startup.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS camiones (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_cookie TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_camiones_cookie ON camiones(device_cookie)",
    "CREATE TABLE IF NOT EXISTS sesiones (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        camion_id INTEGER NOT NULL REFERENCES camiones(id) ON DELETE CASCADE,
        placa TEXT NOT NULL,
        inicio INTEGER NOT NULL,
        fin INTEGER NOT NULL,
        cerrada INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_sesiones_placa ON sesiones(placa)",
    "CREATE TABLE IF NOT EXISTS ciclos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sesion_id INTEGER NOT NULL REFERENCES sesiones(id) ON DELETE CASCADE,
        inicio INTEGER NOT NULL,
        fin INTEGER,
        completado INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_ciclos_sesion ON ciclos(sesion_id)",
    "CREATE TABLE IF NOT EXISTS escaneos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ciclo_id INTEGER NOT NULL REFERENCES ciclos(id) ON DELETE CASCADE,
        punto TEXT NOT NULL,
        fecha_hora INTEGER NOT NULL,
        estado TEXT NOT NULL DEFAULT 'OK',
        UNIQUE (ciclo_id, punto)
    )",
    "CREATE TABLE IF NOT EXISTS ciclo_manual (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        placa TEXT NOT NULL,
        fecha_eliminacion INTEGER NOT NULL,
        sesion_id INTEGER NOT NULL,
        ciclo_id INTEGER NOT NULL,
        accion TEXT NOT NULL,
        motivo TEXT NOT NULL,
        detalles TEXT NOT NULL DEFAULT '{}',
        registrado_por TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_ciclo_manual_sesion ON ciclo_manual(sesion_id, ciclo_id)",
    "CREATE TABLE IF NOT EXISTS placas_autorizadas (
        placa TEXT PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS dispositivos_autorizados (
        dispositivo_id TEXT NOT NULL,
        placa TEXT NOT NULL,
        PRIMARY KEY (dispositivo_id, placa)
    )",
];

impl From<sqlx::Error> for TrackingError {
    fn from(e: sqlx::Error) -> Self {
        TrackingError::Storage(e.to_string())
    }
}

/// Connection settings for the SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub url: String,
    pub max_connections: u32,
}

impl SqliteConfig {
    /// File-backed database, created when missing.
    pub fn file(path: impl AsRef<str>) -> Self {
        Self {
            url: format!("sqlite:{}?mode=rwc", path.as_ref()),
            max_connections: 5,
        }
    }

    /// Private in-memory database (for testing).
    pub fn memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        if url.contains(":memory:") {
            Self {
                url,
                max_connections: 1,
            }
        } else {
            Self {
                url,
                max_connections: 5,
            }
        }
    }
}

fn to_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

fn from_millis(ms: i64) -> TrackingResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| TrackingError::storage(format!("timestamp out of range: {ms}")))
}

#[derive(sqlx::FromRow)]
struct TruckRow {
    id: i64,
    device_cookie: Option<String>,
}

impl From<TruckRow> for Truck {
    fn from(row: TruckRow) -> Self {
        Truck {
            id: row.id,
            device_cookie: row.device_cookie,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    camion_id: i64,
    placa: String,
    inicio: i64,
    fin: i64,
    cerrada: bool,
}

impl TryFrom<SessionRow> for Session {
    type Error = TrackingError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Session {
            id: row.id,
            truck_id: row.camion_id,
            plate: row.placa,
            started_at: from_millis(row.inicio)?,
            ends_at: from_millis(row.fin)?,
            closed: row.cerrada,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CycleRow {
    id: i64,
    sesion_id: i64,
    inicio: i64,
    fin: Option<i64>,
    completado: bool,
}

impl TryFrom<CycleRow> for Cycle {
    type Error = TrackingError;

    fn try_from(row: CycleRow) -> Result<Self, Self::Error> {
        Ok(Cycle {
            id: row.id,
            session_id: row.sesion_id,
            started_at: from_millis(row.inicio)?,
            ended_at: row.fin.map(from_millis).transpose()?,
            completed: row.completado,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScanRow {
    id: i64,
    ciclo_id: i64,
    punto: String,
    fecha_hora: i64,
    estado: String,
}

impl TryFrom<ScanRow> for Scan {
    type Error = TrackingError;

    fn try_from(row: ScanRow) -> Result<Self, Self::Error> {
        Ok(Scan {
            id: row.id,
            cycle_id: row.ciclo_id,
            checkpoint: Checkpoint::parse(&row.punto)?,
            scanned_at: from_millis(row.fecha_hora)?,
            status: row.estado,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    placa: String,
    fecha_eliminacion: i64,
    sesion_id: i64,
    ciclo_id: i64,
    accion: String,
    motivo: String,
    detalles: String,
    registrado_por: String,
}

impl TryFrom<AuditRow> for CycleAuditRecord {
    type Error = TrackingError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let action = AuditAction::from_db(&row.accion)
            .ok_or_else(|| TrackingError::storage(format!("unknown audit action: {}", row.accion)))?;
        let details = serde_json::from_str(&row.detalles)
            .map_err(|e| TrackingError::storage(format!("invalid audit details: {e}")))?;
        Ok(CycleAuditRecord {
            id: row.id,
            plate: row.placa,
            recorded_at: from_millis(row.fecha_eliminacion)?,
            session_id: row.sesion_id,
            cycle_id: row.ciclo_id,
            action,
            reason: row.motivo,
            details,
            recorded_by: row.registrado_por,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> TrackingResult<Vec<T>>
where
    T: TryFrom<R, Error = TrackingError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const SESSION_COLUMNS: &str = "id, camion_id, placa, inicio, fin, cerrada";
const CYCLE_COLUMNS: &str = "id, sesion_id, inicio, fin, completado";
const SCAN_COLUMNS: &str = "id, ciclo_id, punto, fecha_hora, estado";

/// Repository backed by a SQLite pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open a pool and apply the schema.
    pub async fn connect(config: &SqliteConfig) -> TrackingResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            // An in-memory database lives only as long as its connection.
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        info!(url = %config.url, max_connections = config.max_connections, "Opened SQLite pool");

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create missing tables and indexes.
    pub async fn migrate(&self) -> TrackingResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!(statements = SCHEMA.len(), "Schema applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn cycle_by_id(&self, cycle_id: i64) -> TrackingResult<Cycle> {
        let row: CycleRow = sqlx::query_as(&format!(
            "SELECT {CYCLE_COLUMNS} FROM ciclos WHERE id = ?"
        ))
        .bind(cycle_id)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }
}

#[async_trait]
impl CheckinRepository for SqliteRepository {
    async fn truck_by_cookie(&self, cookie: &str) -> TrackingResult<Option<Truck>> {
        let row: Option<TruckRow> = sqlx::query_as(
            "SELECT id, device_cookie FROM camiones WHERE device_cookie = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(cookie)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Truck::from))
    }

    async fn truck(&self, truck_id: i64) -> TrackingResult<Option<Truck>> {
        let row: Option<TruckRow> =
            sqlx::query_as("SELECT id, device_cookie FROM camiones WHERE id = ?")
                .bind(truck_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Truck::from))
    }

    async fn create_truck(&self, cookie: Option<&str>) -> TrackingResult<Truck> {
        let id = sqlx::query("INSERT INTO camiones (device_cookie) VALUES (?)")
            .bind(cookie)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(Truck {
            id,
            device_cookie: cookie.map(str::to_string),
        })
    }

    async fn active_session_for_truck(
        &self,
        truck_id: i64,
        now: DateTime<Utc>,
    ) -> TrackingResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sesiones
             WHERE camion_id = ? AND inicio <= ? AND fin >= ? AND cerrada = 0
             ORDER BY id DESC LIMIT 1"
        ))
        .bind(truck_id)
        .bind(to_millis(now))
        .bind(to_millis(now))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Session::try_from).transpose()
    }

    async fn active_session_for_plate(
        &self,
        plate: &str,
        now: DateTime<Utc>,
    ) -> TrackingResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sesiones
             WHERE placa = ? AND inicio <= ? AND fin >= ? AND cerrada = 0
             ORDER BY id DESC LIMIT 1"
        ))
        .bind(plate)
        .bind(to_millis(now))
        .bind(to_millis(now))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Session::try_from).transpose()
    }

    async fn latest_session_for_plate(&self, plate: &str) -> TrackingResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sesiones WHERE placa = ? ORDER BY inicio DESC, id DESC LIMIT 1"
        ))
        .bind(plate)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Session::try_from).transpose()
    }

    async fn session(&self, session_id: i64) -> TrackingResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sesiones WHERE id = ?"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Session::try_from).transpose()
    }

    async fn create_session(&self, new: NewSession) -> TrackingResult<Session> {
        let ends_at = new.ends_at();
        let id = sqlx::query(
            "INSERT INTO sesiones (camion_id, placa, inicio, fin, cerrada) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(new.truck_id)
        .bind(&new.plate)
        .bind(to_millis(new.started_at))
        .bind(to_millis(ends_at))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        let row: SessionRow = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sesiones WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn reassign_session(&self, session_id: i64, truck_id: i64) -> TrackingResult<()> {
        sqlx::query("UPDATE sesiones SET camion_id = ? WHERE id = ?")
            .bind(truck_id)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn close_session(&self, session_id: i64, at: DateTime<Utc>) -> TrackingResult<()> {
        sqlx::query("UPDATE sesiones SET fin = ?, cerrada = 1 WHERE id = ?")
            .bind(to_millis(at))
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_active_sessions(&self, now: DateTime<Utc>) -> TrackingResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sesiones WHERE inicio <= ? AND fin >= ? AND cerrada = 0",
        )
        .bind(to_millis(now))
        .bind(to_millis(now))
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn open_cycle_for_session(&self, session_id: i64) -> TrackingResult<Option<Cycle>> {
        let row: Option<CycleRow> = sqlx::query_as(&format!(
            "SELECT {CYCLE_COLUMNS} FROM ciclos
             WHERE sesion_id = ? AND completado = 0
             ORDER BY inicio DESC, id DESC LIMIT 1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Cycle::try_from).transpose()
    }

    async fn create_cycle(
        &self,
        session_id: i64,
        started_at: DateTime<Utc>,
    ) -> TrackingResult<Cycle> {
        let id = sqlx::query("INSERT INTO ciclos (sesion_id, inicio, completado) VALUES (?, ?, 0)")
            .bind(session_id)
            .bind(to_millis(started_at))
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        self.cycle_by_id(id).await
    }

    async fn complete_cycle(&self, cycle_id: i64, ended_at: DateTime<Utc>) -> TrackingResult<()> {
        sqlx::query("UPDATE ciclos SET completado = 1, fin = ? WHERE id = ?")
            .bind(to_millis(ended_at))
            .bind(cycle_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_cycle(&self, cycle_id: i64) -> TrackingResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM escaneos WHERE ciclo_id = ?")
            .bind(cycle_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM ciclos WHERE id = ?")
            .bind(cycle_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn open_cycles(&self) -> TrackingResult<Vec<Cycle>> {
        let rows: Vec<CycleRow> = sqlx::query_as(&format!(
            "SELECT {CYCLE_COLUMNS} FROM ciclos WHERE completado = 0 ORDER BY inicio, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn cycles_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TrackingResult<Vec<Cycle>> {
        let rows: Vec<CycleRow> = sqlx::query_as(&format!(
            "SELECT {CYCLE_COLUMNS} FROM ciclos WHERE inicio >= ? AND inicio < ? ORDER BY inicio, id"
        ))
        .bind(to_millis(from))
        .bind(to_millis(to))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn count_cycles_completed_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TrackingResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ciclos WHERE completado = 1 AND fin >= ? AND fin < ?",
        )
        .bind(to_millis(from))
        .bind(to_millis(to))
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn scan_for_checkpoint(
        &self,
        cycle_id: i64,
        checkpoint: Checkpoint,
    ) -> TrackingResult<Option<Scan>> {
        let row: Option<ScanRow> = sqlx::query_as(&format!(
            "SELECT {SCAN_COLUMNS} FROM escaneos WHERE ciclo_id = ? AND punto = ? LIMIT 1"
        ))
        .bind(cycle_id)
        .bind(checkpoint.code())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Scan::try_from).transpose()
    }

    async fn insert_scan(
        &self,
        cycle_id: i64,
        checkpoint: Checkpoint,
        scanned_at: DateTime<Utc>,
    ) -> TrackingResult<Scan> {
        // The unique (ciclo_id, punto) index turns a racing duplicate into a no-op.
        sqlx::query(
            "INSERT OR IGNORE INTO escaneos (ciclo_id, punto, fecha_hora, estado) VALUES (?, ?, ?, ?)",
        )
        .bind(cycle_id)
        .bind(checkpoint.code())
        .bind(to_millis(scanned_at))
        .bind(SCAN_STATUS_OK)
        .execute(&self.pool)
        .await?;

        self.scan_for_checkpoint(cycle_id, checkpoint)
            .await?
            .ok_or_else(|| TrackingError::storage("scan vanished after insert"))
    }

    async fn last_scan(&self, cycle_id: i64) -> TrackingResult<Option<Scan>> {
        let row: Option<ScanRow> = sqlx::query_as(&format!(
            "SELECT {SCAN_COLUMNS} FROM escaneos WHERE ciclo_id = ? ORDER BY fecha_hora DESC, id DESC LIMIT 1"
        ))
        .bind(cycle_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Scan::try_from).transpose()
    }

    async fn scans_for_cycle(&self, cycle_id: i64) -> TrackingResult<Vec<Scan>> {
        let rows: Vec<ScanRow> = sqlx::query_as(&format!(
            "SELECT {SCAN_COLUMNS} FROM escaneos WHERE ciclo_id = ? ORDER BY fecha_hora, id"
        ))
        .bind(cycle_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn audit_exists(&self, session_id: i64, cycle_id: i64) -> TrackingResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM ciclo_manual WHERE sesion_id = ? AND ciclo_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(session_id)
        .bind(cycle_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn insert_audit(&self, record: NewAuditRecord) -> TrackingResult<CycleAuditRecord> {
        let details = record.details.to_string();
        let id = sqlx::query(
            "INSERT INTO ciclo_manual
             (placa, fecha_eliminacion, sesion_id, ciclo_id, accion, motivo, detalles, registrado_por)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.plate)
        .bind(to_millis(record.recorded_at))
        .bind(record.session_id)
        .bind(record.cycle_id)
        .bind(record.action.as_str())
        .bind(&record.reason)
        .bind(&details)
        .bind(&record.recorded_by)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(CycleAuditRecord {
            id,
            plate: record.plate,
            recorded_at: record.recorded_at,
            session_id: record.session_id,
            cycle_id: record.cycle_id,
            action: record.action,
            reason: record.reason,
            details: record.details,
            recorded_by: record.recorded_by,
        })
    }

    async fn audit_records_for_plate(&self, plate: &str) -> TrackingResult<Vec<CycleAuditRecord>> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            "SELECT id, placa, fecha_eliminacion, sesion_id, ciclo_id, accion, motivo, detalles, registrado_por
             FROM ciclo_manual WHERE placa = ? ORDER BY id",
        )
        .bind(plate)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn is_plate_authorized(&self, plate: &str) -> TrackingResult<bool> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT placa FROM placas_autorizadas WHERE placa = ?")
                .bind(plate)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn authorize_plate(&self, plate: &str) -> TrackingResult<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO placas_autorizadas (placa) VALUES (?)")
            .bind(plate)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn is_device_authorized(&self, device_id: &str, plate: &str) -> TrackingResult<bool> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT placa FROM dispositivos_autorizados WHERE dispositivo_id = ? AND placa = ?",
        )
        .bind(device_id)
        .bind(plate)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn authorize_device(&self, device_id: &str, plate: &str) -> TrackingResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO dispositivos_autorizados (dispositivo_id, placa) VALUES (?, ?)",
        )
        .bind(device_id)
        .bind(plate)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
