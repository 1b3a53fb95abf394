//! Write-acknowledgement settings for both backends.
//!
//! A write only counts as finished once the storage engine can recover it
//! after a crash. For SQLite that is `synchronous = FULL` (or `EXTRA`) with
//! a real on-disk journal. For the document store it is `appendonly yes`
//! plus either a `WAITAOF` after every write batch (Redis 7.2+) or
//! `appendfsync always` on servers without that command (KeyDB, older Redis).

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{BenchError, Result};
use crate::store::BackendKind;

/// What a backend connection promises when it acknowledges a write.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityMode {
    /// Acknowledged after the change is flushed to the log/journal.
    Durable,
    /// Acknowledged once the change is in memory or the OS page cache.
    Volatile,
}

impl DurabilityMode {
    pub fn is_durable(&self) -> bool {
        matches!(self, DurabilityMode::Durable)
    }
}

/// Fail with a configuration error unless `mode` is durable.
pub fn require_durable(backend: BackendKind, mode: DurabilityMode, detail: &str) -> Result<()> {
    match mode {
        DurabilityMode::Durable => Ok(()),
        DurabilityMode::Volatile => Err(BenchError::Configuration {
            backend,
            detail: detail.to_string(),
        }),
    }
}

/// SQLite `PRAGMA synchronous` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synchronous {
    Off,
    Normal,
    Full,
    Extra,
}

impl Synchronous {
    pub fn pragma_value(&self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
            Synchronous::Extra => "EXTRA",
        }
    }

    /// Maps the integer `PRAGMA synchronous` reports back to a level.
    pub fn from_pragma(value: i64) -> Option<Self> {
        match value {
            0 => Some(Synchronous::Off),
            1 => Some(Synchronous::Normal),
            2 => Some(Synchronous::Full),
            3 => Some(Synchronous::Extra),
            _ => None,
        }
    }
}

impl FromStr for Synchronous {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "off" | "0" => Ok(Synchronous::Off),
            "normal" | "1" => Ok(Synchronous::Normal),
            "full" | "2" => Ok(Synchronous::Full),
            "extra" | "3" => Ok(Synchronous::Extra),
            other => Err(format!("unknown synchronous level {other:?}")),
        }
    }
}

/// SQLite `PRAGMA journal_mode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub fn pragma_value(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

impl FromStr for JournalMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "delete" => Ok(JournalMode::Delete),
            "truncate" => Ok(JournalMode::Truncate),
            "persist" => Ok(JournalMode::Persist),
            "memory" => Ok(JournalMode::Memory),
            "wal" => Ok(JournalMode::Wal),
            "off" => Ok(JournalMode::Off),
            other => Err(format!("unknown journal mode {other:?}")),
        }
    }
}

/// Classify a live SQLite connection from its reported pragmas.
///
/// `NORMAL` is not enough: in WAL mode a commit acknowledged under `NORMAL`
/// can be lost on power failure. In-memory and disabled journals are never
/// durable.
pub fn sqlite_mode(synchronous: Synchronous, journal: JournalMode) -> DurabilityMode {
    let journal_on_disk = !matches!(journal, JournalMode::Memory | JournalMode::Off);
    let syncs_on_commit = matches!(synchronous, Synchronous::Full | Synchronous::Extra);
    if journal_on_disk && syncs_on_commit {
        DurabilityMode::Durable
    } else {
        DurabilityMode::Volatile
    }
}

/// Acknowledgement level for document-store writes, mirroring a per-write
/// concern: `Journaled` blocks on `WAITAOF`, `Memory` returns as soon as the
/// server has applied the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAck {
    Journaled,
    Memory,
}

impl FromStr for WriteAck {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "journal" | "journaled" | "j" => Ok(WriteAck::Journaled),
            "memory" | "none" => Ok(WriteAck::Memory),
            other => Err(format!("unknown write acknowledgement {other:?}")),
        }
    }
}

impl fmt::Display for WriteAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteAck::Journaled => f.write_str("journal"),
            WriteAck::Memory => f.write_str("memory"),
        }
    }
}

/// How a document-store write is confirmed to be on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AofConfirm {
    /// Block on `WAITAOF 1 0 0` after each batch.
    WaitAof,
    /// `appendfsync always`: the server fsyncs before it replies.
    FsyncAlways,
}

/// AOF-related facts reported by a document-store server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AofCapabilities {
    pub appendonly: bool,
    pub fsync_always: bool,
    pub waitaof: bool,
}

impl AofCapabilities {
    /// `WAITAOF` when the server has it, otherwise `appendfsync always`.
    /// `None` when the server cannot confirm a write reached disk.
    pub fn confirmation(&self) -> Option<AofConfirm> {
        if !self.appendonly {
            None
        } else if self.waitaof {
            Some(AofConfirm::WaitAof)
        } else if self.fsync_always {
            Some(AofConfirm::FsyncAlways)
        } else {
            None
        }
    }
}

/// Classify a document-store connection from the server's AOF capabilities
/// and the acknowledgement level it was opened with.
pub fn document_mode(caps: AofCapabilities, ack: WriteAck) -> DurabilityMode {
    if ack == WriteAck::Journaled && caps.confirmation().is_some() {
        DurabilityMode::Durable
    } else {
        DurabilityMode::Volatile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_full_sync_with_disk_journal_is_durable() {
        for journal in [
            JournalMode::Wal,
            JournalMode::Delete,
            JournalMode::Truncate,
            JournalMode::Persist,
        ] {
            assert_eq!(
                sqlite_mode(Synchronous::Full, journal),
                DurabilityMode::Durable
            );
            assert_eq!(
                sqlite_mode(Synchronous::Extra, journal),
                DurabilityMode::Durable
            );
        }
    }

    #[test]
    fn sqlite_relaxed_settings_are_volatile() {
        assert_eq!(
            sqlite_mode(Synchronous::Normal, JournalMode::Wal),
            DurabilityMode::Volatile
        );
        assert_eq!(
            sqlite_mode(Synchronous::Off, JournalMode::Wal),
            DurabilityMode::Volatile
        );
        assert_eq!(
            sqlite_mode(Synchronous::Full, JournalMode::Memory),
            DurabilityMode::Volatile
        );
        assert_eq!(
            sqlite_mode(Synchronous::Full, JournalMode::Off),
            DurabilityMode::Volatile
        );
    }

    fn caps(appendonly: bool, fsync_always: bool, waitaof: bool) -> AofCapabilities {
        AofCapabilities {
            appendonly,
            fsync_always,
            waitaof,
        }
    }

    #[test]
    fn document_store_needs_aof_and_journaled_ack() {
        assert!(document_mode(caps(true, false, true), WriteAck::Journaled).is_durable());
        assert!(!document_mode(caps(false, true, true), WriteAck::Journaled).is_durable());
        assert!(!document_mode(caps(true, true, true), WriteAck::Memory).is_durable());
    }

    #[test]
    fn servers_without_waitaof_need_fsync_always() {
        // KeyDB and Redis < 7.2: AOF on, no WAITAOF, default everysec fsync.
        let everysec = caps(true, false, false);
        assert_eq!(everysec.confirmation(), None);
        assert_eq!(
            document_mode(everysec, WriteAck::Journaled),
            DurabilityMode::Volatile
        );

        let always = caps(true, true, false);
        assert_eq!(always.confirmation(), Some(AofConfirm::FsyncAlways));
        assert!(document_mode(always, WriteAck::Journaled).is_durable());
    }

    #[test]
    fn waitaof_is_preferred_when_available() {
        assert_eq!(
            caps(true, true, true).confirmation(),
            Some(AofConfirm::WaitAof)
        );
    }

    #[test]
    fn require_durable_reports_the_backend() {
        assert!(require_durable(BackendKind::Relational, DurabilityMode::Durable, "").is_ok());
        let err = require_durable(BackendKind::Document, DurabilityMode::Volatile, "appendonly no")
            .unwrap_err();
        match err {
            BenchError::Configuration { backend, detail } => {
                assert_eq!(backend, BackendKind::Document);
                assert_eq!(detail, "appendonly no");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pragma_levels_parse_from_names_and_numbers() {
        assert_eq!("FULL".parse::<Synchronous>().unwrap(), Synchronous::Full);
        assert_eq!("1".parse::<Synchronous>().unwrap(), Synchronous::Normal);
        assert_eq!(Synchronous::from_pragma(3), Some(Synchronous::Extra));
        assert_eq!(Synchronous::from_pragma(9), None);
        assert_eq!("wal".parse::<JournalMode>().unwrap(), JournalMode::Wal);
        assert!("fsync".parse::<JournalMode>().is_err());
        assert_eq!("j".parse::<WriteAck>().unwrap(), WriteAck::Journaled);
    }
}
