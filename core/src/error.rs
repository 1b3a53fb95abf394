use thiserror::Error;

use crate::records::EntityKind;
use crate::store::BackendKind;

pub type Result<T> = std::result::Result<T, BenchError>;

/// Everything that can stop a benchmark run. Nothing in the core retries or
/// recovers from these.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("{backend} is not configured for durable writes: {detail}")]
    Configuration {
        backend: BackendKind,
        detail: String,
    },

    #[error(
        "requested {requested} {kind} updates but {backend} only holds {available}; \
         seed more with /inventory/{requested}"
    )]
    InsufficientData {
        backend: BackendKind,
        kind: EntityKind,
        requested: usize,
        available: u64,
    },

    #[error("{backend} unavailable: {message}")]
    BackendUnavailable {
        backend: BackendKind,
        message: String,
    },

    #[error("invalid {field}: {reason}")]
    InvalidRecord { field: &'static str, reason: String },

    #[error("batch size must be greater than zero")]
    EmptyBatch,

    #[error("batch size {requested} exceeds the limit of {limit}")]
    BatchTooLarge { requested: usize, limit: usize },

    #[error("unknown entity kind: {0}")]
    UnknownEntityKind(String),
}

impl BenchError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        BenchError::InvalidRecord {
            field,
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for BenchError {
    fn from(e: rusqlite::Error) -> BenchError {
        BenchError::BackendUnavailable {
            backend: BackendKind::Relational,
            message: e.to_string(),
        }
    }
}

impl From<redis::RedisError> for BenchError {
    fn from(e: redis::RedisError) -> BenchError {
        BenchError::BackendUnavailable {
            backend: BackendKind::Document,
            message: e.to_string(),
        }
    }
}
