use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::error::CollaboratorError;
use crate::sinks::BossStore;
use crate::types::{BossId, BossReport, BossStatus, Layer, ScoutReport, TenantConfig};

/// SQLite-backed persistence for tenants, boss reports, and sightings.
pub struct SqliteStore {
    conn: Connection,
}

// ---------------------------------------------------------------------------
// helpers – column <-> domain value
// ---------------------------------------------------------------------------

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn time_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

impl SqliteStore {
    /// Open (or create) a database at the given file path.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, CollaboratorError> {
        let conn = Connection::open(path.as_ref()).await?;
        let db = Self { conn };
        db.init_schema().await?;
        Ok(db)
    }

    /// Create a purely in-memory database (useful for tests).
    pub async fn new_in_memory() -> Result<Self, CollaboratorError> {
        let conn = Connection::open_in_memory().await?;
        let db = Self { conn };
        db.init_schema().await?;
        Ok(db)
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    async fn init_schema(&self) -> Result<(), CollaboratorError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA busy_timeout=5000;

                    CREATE TABLE IF NOT EXISTS tenants (
                        tenant_id            TEXT PRIMARY KEY,
                        notification_channel TEXT,
                        found_message        TEXT NOT NULL,
                        respawn_message      TEXT NOT NULL,
                        layer_notifications  INTEGER NOT NULL DEFAULT 1,
                        updated_at           TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS boss_reports (
                        tenant_id   TEXT NOT NULL,
                        boss_id     TEXT NOT NULL,
                        total_kills INTEGER NOT NULL DEFAULT 0,
                        revision    INTEGER NOT NULL DEFAULT 0,
                        report      TEXT NOT NULL,
                        updated_at  TEXT NOT NULL,
                        PRIMARY KEY (tenant_id, boss_id)
                    );

                    CREATE TABLE IF NOT EXISTS scout_reports (
                        id          TEXT PRIMARY KEY,
                        timestamp   TEXT NOT NULL,
                        tenant_id   TEXT NOT NULL,
                        boss_id     TEXT NOT NULL,
                        layer       TEXT NOT NULL,
                        status      TEXT NOT NULL,
                        reporter_id TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_scout_reports_boss
                        ON scout_reports(tenant_id, boss_id, timestamp);
                    ",
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    /// Sum of kills across both bosses, per tenant.
    pub async fn total_kills_by_tenant(&self) -> Result<HashMap<String, u64>, CollaboratorError> {
        let totals = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT tenant_id, SUM(total_kills) FROM boss_reports GROUP BY tenant_id",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                let mut out = HashMap::new();
                for row in rows {
                    let (tenant, kills) = row?;
                    out.insert(tenant, u64::try_from(kills).unwrap_or(0));
                }
                Ok(out)
            })
            .await?;
        Ok(totals)
    }

    /// Most recent sighting per layer of one boss.
    pub async fn latest_scout_reports(
        &self,
        tenant_id: &str,
        boss: BossId,
    ) -> Result<BTreeMap<Layer, ScoutReport>, CollaboratorError> {
        let tenant_id = tenant_id.to_string();
        let boss_id = boss.key();
        let latest = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, timestamp, tenant_id, boss_id, layer, status, reporter_id
                     FROM scout_reports
                     WHERE tenant_id = ?1 AND boss_id = ?2
                     ORDER BY timestamp DESC",
                )?;
                let mut rows = stmt.query(rusqlite::params![tenant_id, boss_id])?;
                let mut out = BTreeMap::new();
                while let Some(row) = rows.next()? {
                    let report = row_to_scout_report(row)?;
                    out.entry(report.layer).or_insert(report);
                }
                Ok(out)
            })
            .await?;
        Ok(latest)
    }
}

#[async_trait]
impl BossStore for SqliteStore {
    async fn load_boss_report(
        &self,
        tenant_id: &str,
        boss: BossId,
    ) -> Result<Option<BossReport>, CollaboratorError> {
        let tenant_id = tenant_id.to_string();
        let boss_id = boss.key();
        let raw: Option<String> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT report FROM boss_reports WHERE tenant_id = ?1 AND boss_id = ?2",
                )?;
                let mut rows = stmt.query(rusqlite::params![tenant_id, boss_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get(0)?)),
                    None => Ok(None),
                }
            })
            .await?;

        match raw {
            Some(json) => {
                let report: BossReport = serde_json::from_str(&json)?;
                Ok(Some(report.normalized()))
            }
            None => Ok(None),
        }
    }

    async fn save_boss_report(
        &self,
        tenant_id: &str,
        report: &BossReport,
    ) -> Result<(), CollaboratorError> {
        let tenant_id = tenant_id.to_string();
        let boss_id = report.boss.key();
        let total_kills = i64::try_from(report.total_kills).unwrap_or(i64::MAX);
        let revision = i64::try_from(report.revision()).unwrap_or(i64::MAX);
        let json = serde_json::to_string(report)?;
        let updated_at = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                // Saves may land out of order; an older revision never replaces a newer one.
                conn.execute(
                    "INSERT INTO boss_reports (tenant_id, boss_id, total_kills, revision, report, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(tenant_id, boss_id) DO UPDATE SET
                        total_kills=excluded.total_kills, revision=excluded.revision,
                        report=excluded.report, updated_at=excluded.updated_at
                     WHERE excluded.revision > boss_reports.revision",
                    rusqlite::params![tenant_id, boss_id, total_kills, revision, json, updated_at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn append_scout_report(&self, report: &ScoutReport) -> Result<(), CollaboratorError> {
        let id = report.id.to_string();
        // Fixed width so ORDER BY timestamp sorts chronologically.
        let timestamp = report.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);
        let tenant_id = report.tenant_id.clone();
        let boss_id = report.boss.key();
        let layer = report.layer.label();
        let status = report.status.to_string();
        let reporter_id = report.reporter_id.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO scout_reports (id, timestamp, tenant_id, boss_id, layer, status, reporter_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![id, timestamp, tenant_id, boss_id, layer, status, reporter_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn load_tenant_config(
        &self,
        tenant_id: &str,
    ) -> Result<Option<TenantConfig>, CollaboratorError> {
        let tenant_id = tenant_id.to_string();
        let config = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT tenant_id, notification_channel, found_message, respawn_message,
                            layer_notifications
                     FROM tenants WHERE tenant_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![tenant_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_tenant(row)?)),
                    None => Ok(None),
                }
            })
            .await?;
        Ok(config)
    }

    async fn save_tenant_config(&self, config: &TenantConfig) -> Result<(), CollaboratorError> {
        let tenant_id = config.tenant_id.clone();
        let channel = config.notification_channel.clone();
        let found = config.found_message.clone();
        let respawn = config.respawn_message.clone();
        let notifications = config.layer_notifications;
        let updated_at = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tenants (tenant_id, notification_channel, found_message,
                        respawn_message, layer_notifications, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(tenant_id) DO UPDATE SET
                        notification_channel=excluded.notification_channel,
                        found_message=excluded.found_message,
                        respawn_message=excluded.respawn_message,
                        layer_notifications=excluded.layer_notifications,
                        updated_at=excluded.updated_at",
                    rusqlite::params![tenant_id, channel, found, respawn, notifications, updated_at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn all_tenant_configs(&self) -> Result<Vec<TenantConfig>, CollaboratorError> {
        let configs = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT tenant_id, notification_channel, found_message, respawn_message,
                            layer_notifications
                     FROM tenants ORDER BY tenant_id",
                )?;
                let mut rows = stmt.query([])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_tenant(row)?);
                }
                Ok(out)
            })
            .await?;
        Ok(configs)
    }
}

// ---------------------------------------------------------------------------
// Row mapping helpers
// ---------------------------------------------------------------------------

fn row_to_tenant(row: &rusqlite::Row<'_>) -> rusqlite::Result<TenantConfig> {
    let channel: Option<String> = row.get(1)?;
    Ok(TenantConfig {
        tenant_id: row.get(0)?,
        notification_channel: channel.filter(|c| !c.is_empty()),
        found_message: row.get(2)?,
        respawn_message: row.get(3)?,
        layer_notifications: row.get(4)?,
    })
}

fn row_to_scout_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScoutReport> {
    let id: Uuid = parse_column(row, 0)?;
    let boss: BossId = parse_column(row, 3)?;
    let layer_label: String = row.get(4)?;
    let layer = Layer::from_label(&layer_label).map_err(|e| conversion_error(4, e))?;
    let status: BossStatus = parse_column(row, 5)?;

    Ok(ScoutReport {
        id,
        timestamp: time_column(row, 1)?,
        tenant_id: row.get(2)?,
        boss,
        layer,
        status,
        reporter_id: row.get(6)?,
    })
}
