// Rental Ledger - Core Library
// Sales-notes parsing, migration to financial records, and storage

pub mod config;
pub mod db;
pub mod logging;
pub mod migrate;
pub mod sales_log;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Settings;
pub use db::{
    FinancialRecord, Event,
    open_database, setup_database, insert_records, get_all_records,
    count_records, export_csv, insert_event, get_events,
};
pub use logging::init_tracing;
pub use migrate::{flatten, migrate, month_start, MigrationReport};
pub use sales_log::{
    parse_sales_log, lenient_amount, canonical_month, month_number,
    EntryKind, MonthData, SalesEntry,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
