//! SQLite store for the seeded demo records.
//!
//! Uses `rusqlite` in synchronous mode (Tauri commands run on a thread pool).
//! The table is created if absent and seeded once, only when empty, so a
//! second open of the same file observes the same rows.

use rusqlite::{params, Connection};
use thiserror::Error;

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Errors raised while opening or querying the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem or schema error while opening the database.
    #[error("failed to open store: {reason}")]
    OpenFailed { reason: String },

    /// Seed insertion failed; the transaction is rolled back.
    #[error("failed to seed store: {reason}")]
    SeedFailed { reason: String },

    /// A read query failed.
    #[error("store query failed: {reason}")]
    QueryFailed { reason: String },
}

// ─── Records ────────────────────────────────────────────────────────────────

/// A persisted demo row: a name and an age.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRecord {
    pub name: String,
    pub age: i64,
}

/// Rows inserted on first open, when the table is empty.
const SEED_ROWS: &[(&str, i64)] = &[("Joey", 2), ("Sally", 4), ("Junior", 1)];

// ─── Store ──────────────────────────────────────────────────────────────────

/// Handle to the demo-record database.
pub struct NameStore {
    conn: Connection,
}

impl NameStore {
    /// Open (or create) the store at the given path, ensure the schema, and
    /// seed the table if it is empty.
    ///
    /// Pass `":memory:"` for an in-memory database (tests).
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                    reason: format!("failed to create '{}': {e}", parent.display()),
                })?;
            }
        }

        let mut conn = Connection::open(path).map_err(open_failed)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(open_failed)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cats (
                name CHAR(20) NOT NULL,
                age INT NOT NULL
            );",
        )
        .map_err(open_failed)?;

        seed_if_empty(&mut conn)?;

        Ok(Self { conn })
    }

    /// Every row's name, in storage order.
    pub fn select_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM cats")
            .map_err(query_failed)?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query_failed)?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row.map_err(query_failed)?);
        }
        Ok(names)
    }

    /// All rows, in storage order.
    pub fn select_records(&self) -> Result<Vec<NamedRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, age FROM cats")
            .map_err(query_failed)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(NamedRecord {
                    name: row.get(0)?,
                    age: row.get(1)?,
                })
            })
            .map_err(query_failed)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(query_failed)?);
        }
        Ok(records)
    }
}

/// Insert the seed rows as a single transaction, only when the table is empty.
fn seed_if_empty(conn: &mut Connection) -> Result<(), StoreError> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM cats", [], |row| row.get(0))
        .map_err(open_failed)?;
    if count > 0 {
        return Ok(());
    }

    let seed_failed = |e: rusqlite::Error| StoreError::SeedFailed {
        reason: e.to_string(),
    };

    let tx = conn.transaction().map_err(seed_failed)?;
    for (name, age) in SEED_ROWS {
        tx.execute(
            "INSERT INTO cats (name, age) VALUES (?1, ?2)",
            params![name, age],
        )
        .map_err(seed_failed)?;
    }
    tx.commit().map_err(seed_failed)?;

    tracing::info!(rows = SEED_ROWS.len(), "seeded empty store");
    Ok(())
}

fn open_failed(e: rusqlite::Error) -> StoreError {
    StoreError::OpenFailed {
        reason: e.to_string(),
    }
}

fn query_failed(e: rusqlite::Error) -> StoreError {
    StoreError::QueryFailed {
        reason: e.to_string(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
