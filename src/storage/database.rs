//! Database Layer with Connection Pooling and Safe Transactions
//!
//! SQLite persistence for inspection profiles:
//! - Connection pooling via r2d2 for concurrent access
//! - Panic-safe transactions with automatic rollback
//! - Version-tracked migrations
//! - WAL mode for concurrent readers during uploads

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;
use tracing::{info, warn};

use crate::types::{
    Inspection, InspectionStatus, NewInspection, ParseWithDefault, QcError, Result, ResultExt,
};

/// Shared database handle for async contexts.
pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version for migration tracking
const SCHEMA_VERSION: u32 = 1;

/// Migration definitions
struct Migration {
    version: u32,
    description: &'static str,
    up: &'static str,
}

/// Changes on top of schema.sql for databases created at an older version
const MIGRATIONS: &[Migration] = &[];

const SELECT_COLUMNS: &str =
    "id, image_path, analysis_result, status, user_id, created_at, updated_at";

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Minimum idle connections to keep ready
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl PoolConfig {
    const MIN_POOL_SIZE: u32 = 2;
    const MAX_POOL_SIZE: u32 = 16;

    /// Two connections per core, clamped
    pub fn optimal_pool_size() -> u32 {
        let cores = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        (cores * 2).clamp(Self::MIN_POOL_SIZE, Self::MAX_POOL_SIZE)
    }

    pub fn auto() -> Self {
        let max_size = Self::optimal_pool_size();
        Self {
            max_size,
            min_idle: (max_size / 4).max(1),
            connection_timeout_secs: 30,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::auto()
    }
}

/// Thread-safe database with connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open database with connection pooling at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Open database with custom pool configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .map_err(|e| QcError::Storage(format!("Failed to create connection pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// Open an in-memory database for testing or temporary use.
    ///
    /// A single pooled connection keeps every caller on the same memory file.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| QcError::Storage(format!("Failed to create in-memory pool: {}", e)))?;

        Ok(Self { pool })
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            PRAGMA wal_autocheckpoint = 1000;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Initialize database schema and apply pending migrations.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;

        let current_version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        conn.execute_batch(SCHEMA)
            .with_context("Failed to initialize database schema")?;

        // A fresh database gets everything from schema.sql
        if current_version > 0 {
            for migration in MIGRATIONS {
                if migration.version > current_version {
                    conn.execute_batch(migration.up).with_context_fn(|| {
                        format!(
                            "Failed to apply migration {}: {}",
                            migration.version, migration.description
                        )
                    })?;

                    info!(
                        "Applied migration {}: {}",
                        migration.version, migration.description
                    );
                }
            }
        }

        if current_version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .with_context("Failed to update schema version")?;
        }

        Ok(())
    }

    /// Get a raw connection for advanced operations.
    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.conn()
    }

    /// Execute within a transaction with panic safety.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + std::panic::UnwindSafe,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .with_context("Failed to start transaction")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&tx)));

        match result {
            Ok(Ok(value)) => {
                tx.commit().with_context("Failed to commit transaction")?;
                Ok(value)
            }
            // Rolled back on drop
            Ok(Err(e)) => Err(e),
            Err(panic_payload) => {
                let panic_msg = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());

                tracing::error!("Transaction panicked: {}", panic_msg);
                Err(QcError::Storage(format!(
                    "Transaction panicked: {}",
                    panic_msg
                )))
            }
        }
    }

    // =========================================================================
    // Inspection Profiles
    // =========================================================================

    /// Insert a new inspection and return the stored record
    pub fn insert_inspection(&self, new: &NewInspection) -> Result<Inspection> {
        if new.image_path.trim().is_empty() {
            return Err(QcError::Validation(
                "image_path must not be empty".to_string(),
            ));
        }

        let blob = new
            .analysis_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = timestamp(Utc::now());

        self.transaction(|conn| {
            conn.execute(
                "INSERT INTO inspection_profiles (image_path, analysis_result, status, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new.image_path,
                    blob,
                    new.status.as_str(),
                    new.user_id,
                    now
                ],
            )?;
            let id = conn.last_insert_rowid();

            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM inspection_profiles WHERE id = ?1"),
                params![id],
                row_to_inspection,
            )
            .map_err(QcError::from)
        })
    }

    /// Fetch one inspection by id
    pub fn get_inspection(&self, id: i64) -> Result<Option<Inspection>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM inspection_profiles WHERE id = ?1"),
                params![id],
                row_to_inspection,
            )
            .optional()?;
        Ok(record)
    }

    /// All inspections, newest first
    pub fn list_inspections(&self, skip: u32, limit: u32) -> Result<Vec<Inspection>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM inspection_profiles
             ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
        ))?;

        let rows = stmt
            .query_map(params![limit, skip], row_to_inspection)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Inspections owned by `user_id`, newest first
    pub fn list_user_inspections(
        &self,
        user_id: &str,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Inspection>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM inspection_profiles WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt
            .query_map(params![user_id, limit, skip], row_to_inspection)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete an inspection row; returns whether a row existed
    pub fn delete_inspection(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "DELETE FROM inspection_profiles WHERE id = ?1",
            params![id],
        )?;
        Ok(affected > 0)
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_inspection(row: &Row<'_>) -> rusqlite::Result<Inspection> {
    let id: i64 = row.get(0)?;
    let blob: Option<String> = row.get(2)?;
    let status: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let updated_at: Option<String> = row.get(6)?;

    let analysis_result = blob.and_then(|text| match serde_json::from_str::<Value>(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(id, error = %e, "Corrupt analysis_result blob, serving as null");
            None
        }
    });

    Ok(Inspection {
        id,
        image_path: row.get(1)?,
        status: InspectionStatus::parse_or_default(&status),
        user_id: row.get(4)?,
        analysis_result,
        created_at: parse_timestamp(5, &created_at)?,
        updated_at: updated_at
            .as_deref()
            .map(|text| parse_timestamp(6, text))
            .transpose()?,
        image_url: None,
    })
}
