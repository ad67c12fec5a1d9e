// ⚙️ Settings - environment-driven, with local defaults

use serde::Serialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_DB: &str = "rental_ledger.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// `RENTAL_LEDGER_BIND`
    pub bind_addr: String,
    /// `RENTAL_LEDGER_DB`
    pub database_path: PathBuf,
    /// `RENTAL_LEDGER_LOG_JSON`
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            database_path: PathBuf::from(DEFAULT_DB),
            log_json: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from any variable source (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bind_addr: lookup("RENTAL_LEDGER_BIND")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.bind_addr),
            database_path: lookup("RENTAL_LEDGER_DB")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            log_json: lookup("RENTAL_LEDGER_LOG_JSON")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.log_json),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}
