use axum::Json;
use axum::http::StatusCode;
use log::{error, warn};
use serde::Serialize;

use luw_core::BenchError;
use luw_core::records::EntityKind;

use crate::types::Envelope;

/// HTTP status for each failure kind.
pub(crate) fn status_for(err: &BenchError) -> StatusCode {
    match err {
        BenchError::EmptyBatch
        | BenchError::BatchTooLarge { .. }
        | BenchError::UnknownEntityKind(_)
        | BenchError::InvalidRecord { .. } => StatusCode::BAD_REQUEST,
        BenchError::InsufficientData { .. } => StatusCode::CONFLICT,
        BenchError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        BenchError::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// A request that ended without a result.
#[derive(Debug)]
pub struct Failure {
    pub status: StatusCode,
    pub message: String,
}

impl From<BenchError> for Failure {
    fn from(err: BenchError) -> Self {
        Failure {
            status: status_for(&err),
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for Failure {
    fn from(err: tokio::task::JoinError) -> Self {
        Failure {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("benchmark worker failed: {err}"),
        }
    }
}

/// Runs blocking store work on the blocking pool.
pub(crate) async fn blocking<T, F>(job: F) -> Result<T, Failure>
where
    F: FnOnce() -> luw_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(job).await??)
}

/// Wraps an outcome into the response tuple, logging failures by severity.
pub(crate) fn respond<T: Serialize>(
    route: &str,
    outcome: Result<T, Failure>,
) -> (StatusCode, Json<Envelope<T>>) {
    match outcome {
        Ok(body) => (StatusCode::OK, Json(Envelope::ok(body))),
        Err(failure) => {
            if failure.status.is_server_error() {
                error!("{} failed: {}", route, failure.message);
            } else {
                warn!("{} rejected: {}", route, failure.message);
            }
            (failure.status, Json(Envelope::failed(failure.message)))
        }
    }
}

pub(crate) fn parse_kind(segment: &str) -> Result<EntityKind, Failure> {
    segment.parse::<EntityKind>().map_err(Failure::from)
}
