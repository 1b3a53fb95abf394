//! Settings resolved from the environment (and `.env`, when present).

use log::{LevelFilter, warn};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use luw_core::durability::{JournalMode, Synchronous, WriteAck};
use luw_core::store::sqlite::SqliteOptions;

const DEFAULT_SQL_PATH: &str = "local.db";
const DEFAULT_KEYDB_URL: &str = "redis://127.0.0.1:6379/";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_LOG_FILE: &str = "api.log";

fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Logger settings. Resolved before the logger exists, so nothing here logs.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub file: Option<String>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let level = lookup("API_LOG_LEVEL")
            .as_deref()
            .and_then(parse_log_level)
            .unwrap_or(LevelFilter::Info);

        let file = match lookup("API_LOG_FILE") {
            Some(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            None => Some(DEFAULT_LOG_FILE.to_string()),
        };

        Self { level, file }
    }
}

/// Backend and listener settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sql: SqliteOptions,
    pub keydb_url: String,
    pub write_ack: WriteAck,
    pub bind_addr: String,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = lookup("LUW_SQL_PATH").unwrap_or_else(|| DEFAULT_SQL_PATH.to_string());
        Self {
            sql: SqliteOptions {
                path: PathBuf::from(path),
                synchronous: resolve(&lookup, "LUW_SQL_SYNCHRONOUS", Synchronous::Full),
                journal_mode: resolve(&lookup, "LUW_SQL_JOURNAL_MODE", JournalMode::Wal),
            },
            keydb_url: lookup("LUW_KEYDB_URL").unwrap_or_else(|| DEFAULT_KEYDB_URL.to_string()),
            write_ack: resolve(&lookup, "LUW_DOC_WRITE_ACK", WriteAck::Journaled),
            bind_addr: lookup("API_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port: resolve(&lookup, "API_PORT", DEFAULT_PORT),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Parses `key` when set; an unparseable value falls back to `default`.
fn resolve<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(err) => {
                warn!("Ignoring {}={:?} ({}); using {:?}", key, raw, err, default);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_durable() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings.sql.path, PathBuf::from("local.db"));
        assert_eq!(settings.sql.synchronous, Synchronous::Full);
        assert_eq!(settings.sql.journal_mode, JournalMode::Wal);
        assert_eq!(settings.write_ack, WriteAck::Journaled);
        assert_eq!(settings.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn overrides_are_applied() {
        let settings = Settings::from_lookup(lookup(&[
            ("LUW_SQL_PATH", "/tmp/x.db"),
            ("LUW_SQL_SYNCHRONOUS", "normal"),
            ("LUW_DOC_WRITE_ACK", "memory"),
            ("API_PORT", "8080"),
        ]));
        assert_eq!(settings.sql.synchronous, Synchronous::Normal);
        assert_eq!(settings.write_ack, WriteAck::Memory);
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("LUW_SQL_JOURNAL_MODE", "fsync"),
            ("API_PORT", "not-a-port"),
        ]));
        assert_eq!(settings.sql.journal_mode, JournalMode::Wal);
        assert_eq!(settings.port, DEFAULT_PORT);
    }

    #[test]
    fn log_file_can_be_disabled() {
        assert_eq!(
            LogSettings::from_lookup(lookup(&[])).file.as_deref(),
            Some("api.log")
        );
        assert_eq!(
            LogSettings::from_lookup(lookup(&[("API_LOG_FILE", "None")])).file,
            None
        );
        let settings = LogSettings::from_lookup(lookup(&[("API_LOG_LEVEL", "WARNING")]));
        assert_eq!(settings.level, LevelFilter::Warn);
    }
}
