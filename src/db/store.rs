//! SQLite database store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Result as SqlResult, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::models::*;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("connection lock poisoned")]
    Poisoned,
    #[error("Not found")]
    NotFound,
}

/// Thread-safe database store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    /// Initialize the database with migrations.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // --- Endpoints ---

    /// Add an endpoint to the configured set. Adding an existing name is a no-op.
    pub fn add_endpoint(&self, name: &str) -> Result<Endpoint, DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO endpoints (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
            params![name, format_db_time(Utc::now())],
        )?;
        let endpoint = conn.query_row(
            "SELECT id, name, created_at FROM endpoints WHERE name = ?1",
            params![name],
            endpoint_from_row,
        )?;
        Ok(endpoint)
    }

    /// Get all configured endpoints, ordered by name.
    pub fn get_endpoints(&self) -> Result<Vec<Endpoint>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM endpoints ORDER BY name")?;
        let endpoints = stmt
            .query_map([], endpoint_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(endpoints)
    }

    /// Remove an endpoint from the configured set. Its probe records are kept.
    pub fn delete_endpoint(&self, name: &str) -> Result<(), DbError> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM endpoints WHERE name = ?1", params![name])?;
        if deleted == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // --- Probe Records ---

    /// Add probe records in batch.
    pub fn add_probe_records(&self, records: &[ProbeRecord]) -> Result<(), DbError> {
        if records.is_empty() {
            return Ok(());
        }

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO probe_records (time, endpoint, resolved_address, latency_ms, succeeded)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for r in records {
                stmt.execute(params![
                    format_db_time(r.timestamp),
                    r.endpoint_id,
                    r.resolved_address,
                    r.latency_ms,
                    r.succeeded,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Get the most recent probe records across all endpoints, newest first.
    pub fn get_recent_probe_records(&self, limit: usize) -> Result<Vec<ProbeRecord>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT time, endpoint, resolved_address, latency_ms, succeeded FROM probe_records
             ORDER BY time DESC, id DESC LIMIT ?1",
        )?;

        let records = stmt
            .query_map(params![limit], |row| {
                let time_str: String = row.get(0)?;
                let timestamp = parse_db_time(&time_str).unwrap_or_else(Utc::now);
                Ok(ProbeRecord {
                    timestamp,
                    endpoint_id: row.get(1)?,
                    resolved_address: row.get(2)?,
                    latency_ms: row.get(3)?,
                    succeeded: row.get(4)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(records)
    }

    /// Delete probe records before a cutoff time. Returns the number removed.
    pub fn delete_probe_records_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DbError> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM probe_records WHERE time < ?1",
            params![format_db_time(cutoff)],
        )?;
        Ok(deleted)
    }

    // --- Stats ---

    /// Get probe record statistics.
    pub fn get_record_stats(&self) -> Result<RecordStats, DbError> {
        let conn = self.conn()?;
        let (count, endpoints): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT endpoint) FROM probe_records",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(RecordStats { count, endpoints })
    }

    /// Get database size in bytes.
    pub fn get_db_size_bytes(&self) -> Result<i64, DbError> {
        let conn = self.conn()?;
        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |r| r.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |r| r.get(0))?;
        Ok(page_count * page_size)
    }
}

fn endpoint_from_row(row: &Row<'_>) -> SqlResult<Endpoint> {
    let created: String = row.get(2)?;
    Ok(Endpoint {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_db_time(&created).unwrap_or_else(Utc::now),
    })
}

fn format_db_time(dt: DateTime<Utc>) -> String {
    dt.format(TIME_FORMAT).to_string()
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [
        TIME_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.9fZ",
        "%Y-%m-%dT%H:%M:%SZ",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}
