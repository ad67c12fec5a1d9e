use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::sales_log::EntryKind;

/// FinancialRecord - one income line derived from a sales log entry
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FinancialRecord {
    /// Stable identity (UUID), independent of the deduplication hash
    pub id: String,
    pub amount: f64,
    pub category: EntryKind,
    pub notes: String,
    pub created_at: DateTime<Utc>,

    /// Original log line, kept for audit
    pub source_line: String,

    /// Deduplication key, see [`FinancialRecord::compute_idempotency_hash`]
    #[serde(default)]
    pub idempotency_hash: String,
}

impl FinancialRecord {
    pub fn new(
        amount: f64,
        category: EntryKind,
        notes: String,
        created_at: DateTime<Utc>,
        source_line: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            category,
            notes,
            created_at,
            source_line,
            idempotency_hash: String::new(),
        }
    }

    /// Hash for duplicate detection across repeated migrations.
    ///
    /// `occurrence` counts earlier identical lines of the same month and
    /// category, so repeated lines stay distinct records while edits to
    /// other lines leave the key alone. Surrounding whitespace is ignored.
    pub fn compute_idempotency_hash(&self, occurrence: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}",
            self.created_at.format("%Y-%m"),
            self.category.as_str(),
            occurrence,
            self.source_line.trim()
        ));
        format!("{:x}", hasher.finalize())
    }

    pub fn with_idempotency_hash(mut self, occurrence: usize) -> Self {
        self.idempotency_hash = self.compute_idempotency_hash(occurrence);
        self
    }
}

/// Event for audit trail
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(event_type: &str, data: serde_json::Value, actor: &str) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn open_database(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS financial_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_uuid TEXT UNIQUE NOT NULL,
            idempotency_hash TEXT UNIQUE NOT NULL,
            amount REAL NOT NULL,
            category TEXT NOT NULL,
            notes TEXT NOT NULL,
            source_line TEXT NOT NULL,
            created_at TEXT NOT NULL,
            inserted_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_created_at ON financial_records(created_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
        [],
    )?;

    Ok(())
}

/// Insert records in one transaction.
///
/// Returns `(inserted, duplicates)`; a duplicate is a record whose
/// idempotency hash is already stored.
pub fn insert_records(conn: &mut Connection, records: &[FinancialRecord]) -> Result<(usize, usize)> {
    let tx = conn.transaction()?;
    let mut inserted = 0;
    let mut duplicates = 0;

    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO financial_records (
                record_uuid, idempotency_hash, amount, category, notes, source_line, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for record in records {
            let changed = stmt
                .execute(params![
                    record.id,
                    record.idempotency_hash,
                    record.amount,
                    record.category.as_str(),
                    record.notes,
                    record.source_line,
                    record.created_at.to_rfc3339(),
                ])
                .with_context(|| format!("Failed to insert record: {}", record.source_line))?;

            if changed == 0 {
                duplicates += 1;
            } else {
                inserted += 1;
            }
        }
    }

    tx.commit()?;
    tracing::debug!(inserted, duplicates, "financial records written");

    Ok((inserted, duplicates))
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (event_id, timestamp, event_type, data, actor)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events of a given type, newest first
pub fn get_events(conn: &Connection, event_type: &str) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, data, actor
         FROM events
         WHERE event_type = ?1
         ORDER BY timestamp DESC",
    )?;

    let events = stmt
        .query_map(params![event_type], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(3)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(1, &timestamp_str)?,
                event_type: row.get(2)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
                })?,
                actor: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

/// All stored records, newest month first, then in insertion order
pub fn get_all_records(conn: &Connection) -> Result<Vec<FinancialRecord>> {
    let mut stmt = conn.prepare(
        "SELECT record_uuid, amount, category, notes, created_at, source_line, idempotency_hash
         FROM financial_records
         ORDER BY created_at DESC, id ASC",
    )?;

    let records = stmt
        .query_map([], |row| {
            let category: String = row.get(2)?;
            let created_at: String = row.get(4)?;

            Ok(FinancialRecord {
                id: row.get(0)?,
                amount: row.get(1)?,
                category: parse_category(2, &category)?,
                notes: row.get(3)?,
                created_at: parse_timestamp(4, &created_at)?,
                source_line: row.get(5)?,
                idempotency_hash: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn count_records(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM financial_records", [], |row| row.get(0))?;
    Ok(count)
}

/// Write all stored records to a CSV file
pub fn export_csv(conn: &Connection, csv_path: &Path) -> Result<usize> {
    let records = get_all_records(conn)?;
    let mut wtr = csv::Writer::from_path(csv_path)
        .with_context(|| format!("Failed to create CSV file: {}", csv_path.display()))?;

    for record in &records {
        wtr.serialize(record).context("Failed to write CSV row")?;
    }
    wtr.flush()?;

    Ok(records.len())
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_category(idx: usize, value: &str) -> rusqlite::Result<EntryKind> {
    match value {
        "vehicle" => Ok(EntryKind::Vehicle),
        "condo" => Ok(EntryKind::Condo),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown category: {}", other).into(),
        )),
    }
}
