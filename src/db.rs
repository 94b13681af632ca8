//! Database module for the conversation store
//!
//! Provides durable persistence for conversation records. A record is one
//! row in `conversations` plus its audit trail in `history`; both are written
//! in a single transaction so a record is stored whole or not at all.

mod schema;

pub use schema::*;

use crate::state_machine::StateKind;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown state for {subscriber_id}: {raw}")]
    UnknownState { subscriber_id: String, raw: String },
    #[error("History for {subscriber_id} would shrink from {stored} to {given} entries")]
    HistoryTruncated {
        subscriber_id: String,
        stored: usize,
        given: usize,
    },
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Columns of a `conversations` row before the state is decoded
struct RecordRow {
    subscriber_id: String,
    state: String,
    reservation_requested: bool,
    reservation_confirmed: Option<bool>,
    first_contact_at: String,
    last_contact_at: String,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Record Operations ====================

    /// Get the record for a subscriber, if one exists
    pub fn get_record(&self, subscriber_id: &str) -> DbResult<Option<ConversationRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT subscriber_id, state, reservation_requested, reservation_confirmed,
                        first_contact_at, last_contact_at
                 FROM conversations WHERE subscriber_id = ?1",
                params![subscriber_id],
                parse_record_row,
            )
            .optional()?;

        row.map(|row| load_record(&conn, row)).transpose()
    }

    /// Insert or replace a record, appending any new history entries.
    ///
    /// History already on disk is never rewritten; a record carrying fewer
    /// entries than are stored is rejected.
    pub fn put_record(&self, record: &ConversationRecord) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let stored: i64 = tx.query_row(
            "SELECT COUNT(*) FROM history WHERE subscriber_id = ?1",
            params![record.subscriber_id],
            |row| row.get(0),
        )?;
        let stored_len = usize::try_from(stored).unwrap_or_default();

        if record.history.len() < stored_len {
            return Err(DbError::HistoryTruncated {
                subscriber_id: record.subscriber_id.clone(),
                stored: stored_len,
                given: record.history.len(),
            });
        }

        let state_json = serde_json::to_string(&record.state)?;

        // The confirmation column belongs to an external writer; never clear it
        tx.execute(
            "INSERT INTO conversations (subscriber_id, state, reservation_requested,
                                        reservation_confirmed, first_contact_at, last_contact_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(subscriber_id) DO UPDATE SET
                state = excluded.state,
                reservation_requested = MAX(conversations.reservation_requested, excluded.reservation_requested),
                reservation_confirmed = COALESCE(excluded.reservation_confirmed, conversations.reservation_confirmed),
                last_contact_at = excluded.last_contact_at",
            params![
                record.subscriber_id,
                state_json,
                record.reservation_requested,
                record.reservation_confirmed,
                record.first_contact_at.to_rfc3339(),
                record.last_contact_at.to_rfc3339(),
            ],
        )?;

        for (sequence_id, entry) in (stored + 1..).zip(record.history.iter().skip(stored_len)) {
            tx.execute(
                "INSERT INTO history (subscriber_id, sequence_id, direction, text, state, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.subscriber_id,
                    sequence_id,
                    entry.direction.to_string(),
                    entry.text,
                    entry.state.as_str(),
                    entry.timestamp.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Snapshot every decodable record.
    ///
    /// Rows whose state no longer decodes are skipped with a warning so one
    /// bad record cannot stall the reminder sweep.
    pub fn list_records(&self) -> DbResult<Vec<ConversationRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT subscriber_id, state, reservation_requested, reservation_confirmed,
                    first_contact_at, last_contact_at
             FROM conversations ORDER BY first_contact_at ASC",
        )?;

        let rows = stmt
            .query_map([], parse_record_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match load_record(&conn, row) {
                Ok(record) => records.push(record),
                Err(e @ DbError::UnknownState { .. }) => {
                    tracing::warn!(error = %e, "Skipping undecodable conversation record");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// Overwrite the raw state column, bypassing the state machine.
    /// Only used to simulate a corrupted or downgraded database in tests.
    #[cfg(test)]
    pub fn set_raw_state(&self, subscriber_id: &str, raw: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE conversations SET state = ?1 WHERE subscriber_id = ?2",
            params![raw, subscriber_id],
        )?;
        Ok(())
    }
}

fn parse_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        subscriber_id: row.get(0)?,
        state: row.get(1)?,
        reservation_requested: row.get(2)?,
        reservation_confirmed: row.get(3)?,
        first_contact_at: row.get(4)?,
        last_contact_at: row.get(5)?,
    })
}

/// Decode a row and attach its history
fn load_record(conn: &Connection, row: RecordRow) -> DbResult<ConversationRecord> {
    let state: ConvState =
        serde_json::from_str(&row.state).map_err(|_| DbError::UnknownState {
            subscriber_id: row.subscriber_id.clone(),
            raw: row.state.clone(),
        })?;

    let mut stmt = conn.prepare(
        "SELECT direction, text, state, created_at
         FROM history WHERE subscriber_id = ?1 ORDER BY sequence_id ASC",
    )?;
    let raw_history = stmt
        .query_map(params![row.subscriber_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut history = Vec::with_capacity(raw_history.len());
    for (direction, text, label, created_at) in raw_history {
        let state = label
            .parse::<StateKind>()
            .map_err(|_| DbError::UnknownState {
                subscriber_id: row.subscriber_id.clone(),
                raw: label.clone(),
            })?;
        history.push(HistoryEntry {
            timestamp: parse_datetime(&created_at),
            direction: parse_direction(&direction),
            text,
            state,
        });
    }

    Ok(ConversationRecord {
        subscriber_id: row.subscriber_id,
        first_contact_at: parse_datetime(&row.first_contact_at),
        last_contact_at: parse_datetime(&row.last_contact_at),
        state,
        reservation_requested: row.reservation_requested,
        reservation_confirmed: row.reservation_confirmed,
        history,
    })
}

fn parse_direction(s: &str) -> Direction {
    match s {
        "outbound" => Direction::Outbound,
        _ => Direction::Inbound,
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
