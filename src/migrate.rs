// 🔁 Sales Log Migration
// Parsed months → individual financial records → SQLite

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::{insert_event, insert_records, Event, FinancialRecord};
use crate::sales_log::{month_number, MonthData, SalesEntry};

/// Outcome of one migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub months: usize,
    pub entries: usize,
    pub skipped_non_positive: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

/// First day of the month at midnight UTC.
///
/// Unknown month tokens fall back to January; a year that doesn't parse
/// falls back to the current year.
pub fn month_start(month: &str, year: &str) -> DateTime<Utc> {
    let month = month_number(month).unwrap_or(1);
    let year = year
        .parse::<i32>()
        .unwrap_or_else(|_| Utc::now().year());

    let midnight = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    Utc.from_utc_datetime(&midnight)
}

fn entry_notes(entry: &SalesEntry) -> String {
    [&entry.customer, &entry.vehicle, &entry.date_range]
        .iter()
        .filter(|field| !field.is_empty())
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn entry_record(entry: &SalesEntry, created_at: DateTime<Utc>, occurrence: usize) -> FinancialRecord {
    FinancialRecord::new(
        entry.amount(),
        entry.kind,
        entry_notes(entry),
        created_at,
        entry.raw_line.clone(),
    )
    .with_idempotency_hash(occurrence)
}

/// Flatten every vehicle and condo entry into a record, positive or not.
///
/// Occurrence numbers are counted per month start, category and trimmed
/// line, across every block that shares the same month header.
pub fn flatten(months: &[MonthData]) -> Vec<FinancialRecord> {
    let mut seen: HashMap<(DateTime<Utc>, &'static str, &str), usize> = HashMap::new();
    let mut records = Vec::new();

    for month in months {
        let created_at = month_start(&month.month, &month.year);
        for entry in month.vehicles.iter().chain(month.condos.iter()) {
            let count = seen
                .entry((created_at, entry.kind.as_str(), entry.raw_line.trim()))
                .or_insert(0);
            records.push(entry_record(entry, created_at, *count));
            *count += 1;
        }
    }

    records
}

/// Persist every record with a strictly positive amount
pub fn migrate(conn: &mut Connection, months: &[MonthData]) -> Result<MigrationReport> {
    let records = flatten(months);
    let entries = records.len();

    let (positive, skipped): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.amount > 0.0);
    for record in &skipped {
        tracing::debug!(line = %record.source_line, amount = record.amount, "skipping non-positive amount");
    }

    let (inserted, duplicates) = insert_records(conn, &positive)?;

    let report = MigrationReport {
        months: months.len(),
        entries,
        skipped_non_positive: skipped.len(),
        inserted,
        duplicates,
    };

    let event = Event::new("sales_log_migrated", serde_json::to_value(&report)?, "migrate");
    insert_event(conn, &event)?;

    tracing::info!(
        months = report.months,
        entries = report.entries,
        inserted = report.inserted,
        duplicates = report.duplicates,
        "sales log migrated"
    );

    Ok(report)
}
