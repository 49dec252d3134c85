// 🗄️ Location Store - SQLite-backed keyed record store
// One row per country code. The code is the natural key and never changes;
// name and the date bounds are overwritten by reconciliation. updated_at
// moves only through update(), which is only reachable via a non-empty diff.

use crate::error::SyncError;
use crate::mapper::LocationAttributes;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use std::path::Path;

/// A persisted register location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub code: String,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct LocationStore {
    conn: Connection,
}

impl LocationStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, SyncError> {
        let conn = Connection::open(path)?;

        // WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::setup(&conn)?;
        Ok(LocationStore { conn })
    }

    /// In-memory store, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, SyncError> {
        let conn = Connection::open_in_memory()?;
        Self::setup(&conn)?;
        Ok(LocationStore { conn })
    }

    fn setup(conn: &Connection) -> Result<(), SyncError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                start_date TEXT,
                end_date TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_locations_code ON locations(code)",
            [],
        )?;

        Ok(())
    }

    /// Look up a location by its country code.
    pub fn find_by_code(&self, code: &str) -> Result<Option<Location>, SyncError> {
        let mut stmt = self.conn.prepare(
            "SELECT code, name, start_date, end_date, created_at, updated_at
             FROM locations WHERE code = ?1",
        )?;
        let mut rows = stmt.query(params![code])?;

        match rows.next()? {
            Some(row) => Ok(Some(row_to_location(row)?)),
            None => Ok(None),
        }
    }

    /// Create a location from mapped attributes. Stamps both timestamps.
    pub fn insert(&self, attrs: &LocationAttributes) -> Result<(), SyncError> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO locations (code, name, start_date, end_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                attrs.code,
                attrs.name,
                attrs.start_date,
                attrs.end_date,
                now,
                now
            ],
        )?;
        Ok(())
    }

    /// Overwrite the comparable fields of an existing location and touch
    /// updated_at. Callers must only reach this through a non-empty diff;
    /// created_at and the code itself are never rewritten.
    pub fn update(&self, attrs: &LocationAttributes) -> Result<(), SyncError> {
        let now = Utc::now();
        self.conn.execute(
            "UPDATE locations
             SET name = ?2, start_date = ?3, end_date = ?4, updated_at = ?5
             WHERE code = ?1",
            params![attrs.code, attrs.name, attrs.start_date, attrs.end_date, now],
        )?;
        Ok(())
    }

    /// All locations, ordered by code.
    pub fn all_locations(&self) -> Result<Vec<Location>, SyncError> {
        let mut stmt = self.conn.prepare(
            "SELECT code, name, start_date, end_date, created_at, updated_at
             FROM locations ORDER BY code",
        )?;
        let mut rows = stmt.query([])?;

        let mut locations = Vec::new();
        while let Some(row) = rows.next()? {
            locations.push(row_to_location(row)?);
        }
        Ok(locations)
    }

    pub fn count(&self) -> Result<i64, SyncError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_location(row: &Row) -> Result<Location, rusqlite::Error> {
    Ok(Location {
        code: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

// Test-only access for pinning timestamps to known values.
#[cfg(test)]
impl LocationStore {
    pub(crate) fn set_updated_at(
        &self,
        code: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        self.conn.execute(
            "UPDATE locations SET updated_at = ?2 WHERE code = ?1",
            params![code, timestamp],
        )?;
        Ok(())
    }
}
