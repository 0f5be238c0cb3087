//! SQLite store for named runs.
//!
//! Parameters and results are kept as JSON text next to a few indexed
//! columns used for listing.

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::domain::error::DcaBenchError;
use crate::domain::metrics::StrategyResult;
use crate::domain::strategy::StrategySpec;
use crate::ports::config_port::ConfigPort;
use crate::ports::run_store_port::{RunStorePort, SavedRun, SavedRunSummary};

pub struct SqliteRunStore {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> DcaBenchError {
    DcaBenchError::Storage {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> DcaBenchError {
    DcaBenchError::StorageQuery {
        reason: e.to_string(),
    }
}

fn json_err(e: serde_json::Error) -> DcaBenchError {
    DcaBenchError::StorageQuery {
        reason: format!("corrupt JSON column: {}", e),
    }
}

fn parse_saved_at(raw: &str) -> Result<DateTime<Utc>, DcaBenchError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DcaBenchError::StorageQuery {
            reason: format!("invalid saved_at '{}': {}", raw, e),
        })
}

impl SqliteRunStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, DcaBenchError> {
        let db_path =
            config
                .get_non_empty("storage", "path")
                .ok_or_else(|| DcaBenchError::ConfigMissing {
                    section: "storage".into(),
                    key: "path".into(),
                })?;
        let pool_size = config.get_int("storage", "pool_size", 4).clamp(1, 32) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Single-connection in-memory store; every pooled connection to
    /// `:memory:` would otherwise see its own database.
    pub fn in_memory() -> Result<Self, DcaBenchError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn initialize_schema(&self) -> Result<(), DcaBenchError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                strategy TEXT NOT NULL,
                saved_at TEXT NOT NULL,
                total_return REAL NOT NULL,
                spec TEXT NOT NULL,
                result TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_runs_saved_at ON runs(saved_at);",
        )
        .map_err(query_err)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, DcaBenchError> {
        self.pool.get().map_err(pool_err)
    }
}

impl RunStorePort for SqliteRunStore {
    fn save(
        &self,
        name: &str,
        symbol: &str,
        spec: &StrategySpec,
        result: &StrategyResult,
    ) -> Result<i64, DcaBenchError> {
        let spec_json = serde_json::to_string(spec).map_err(json_err)?;
        let result_json = serde_json::to_string(result).map_err(json_err)?;
        // fixed width so text order is time order
        let saved_at = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO runs (name, symbol, strategy, saved_at, total_return, spec, result)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                name,
                symbol,
                spec.kind().selector(),
                saved_at,
                result.total_return,
                spec_json,
                result_json
            ],
        )
        .map_err(query_err)?;

        let id = conn.last_insert_rowid();
        debug!(id, name, "saved run");
        Ok(id)
    }

    fn list(&self) -> Result<Vec<SavedRunSummary>, DcaBenchError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, symbol, strategy, saved_at, total_return
                 FROM runs
                 ORDER BY saved_at DESC, id DESC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            })
            .map_err(query_err)?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, name, symbol, strategy, saved_at, total_return) = row.map_err(query_err)?;
            summaries.push(SavedRunSummary {
                id,
                name,
                symbol,
                strategy,
                saved_at: parse_saved_at(&saved_at)?,
                total_return,
            });
        }
        Ok(summaries)
    }

    fn get(&self, id: i64) -> Result<Option<SavedRun>, DcaBenchError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT name, symbol, saved_at, spec, result FROM runs WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(query_err)?;

        let Some((name, symbol, saved_at, spec, result)) = row else {
            return Ok(None);
        };
        Ok(Some(SavedRun {
            id,
            name,
            symbol,
            saved_at: parse_saved_at(&saved_at)?,
            spec: serde_json::from_str(&spec).map_err(json_err)?,
            result: serde_json::from_str(&result).map_err(json_err)?,
        }))
    }

    fn delete(&self, id: i64) -> Result<bool, DcaBenchError> {
        let conn = self.conn()?;
        let removed = conn
            .execute("DELETE FROM runs WHERE id = ?1", params![id])
            .map_err(query_err)?;
        Ok(removed > 0)
    }
}
