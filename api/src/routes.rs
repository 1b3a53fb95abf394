use axum::{Json, extract::Path, extract::State, http::StatusCode};
use log::info;

use luw_core::generator::FakeDataGenerator;
use luw_core::records::EntityKind;
use luw_core::runner::{self, BenchmarkResult, InventoryReport};
use luw_core::store::Backend;

use crate::AppState;
use crate::helpers::{self, Failure};
use crate::types::{Envelope, RecordsView, ResetView, Sample};

/// Most records `/records/{kind}` returns.
const SAMPLE_LIMIT: usize = 200;

type Reply<T> = (StatusCode, Json<Envelope<T>>);

/// Inserts `count` fake users into both stores, each batch committed durably.
///
/// # Returns
/// * `(StatusCode::OK, result)` with both timings and the winner.
/// * `(StatusCode::BAD_REQUEST, error)` when `count` is zero or above
///   [`runner::MAX_BATCH_SIZE`].
/// * `(StatusCode::INTERNAL_SERVER_ERROR, error)` when a backend is not durable.
/// * `(StatusCode::SERVICE_UNAVAILABLE, error)` when a backend cannot be reached.
pub(crate) async fn benchmark_write(
    State(state): State<AppState>,
    Path(count): Path<usize>,
) -> Reply<BenchmarkResult> {
    let outcome = match runner::check_batch(count) {
        Err(err) => Err(Failure::from(err)),
        Ok(()) => helpers::blocking(move || {
            let users = FakeDataGenerator::from_entropy().users(count)?;
            state.runner()?.insert_users(users)
        })
        .await,
    };
    helpers::respond("benchmark/write", outcome)
}

/// Reads up to `count` users from both stores. Zero is a valid, empty read.
pub(crate) async fn benchmark_read(
    State(state): State<AppState>,
    Path(count): Path<usize>,
) -> Reply<BenchmarkResult> {
    let outcome = helpers::blocking(move || state.runner()?.read_users(count)).await;
    helpers::respond("benchmark/read", outcome)
}

/// Applies `count` random stock decrements in both stores.
///
/// # Returns
/// * `(StatusCode::CONFLICT, error)` when either store holds fewer than
///   `count` products. Nothing is written in that case; seed with
///   `/inventory/{count}` first.
pub(crate) async fn benchmark_update(
    State(state): State<AppState>,
    Path(count): Path<usize>,
) -> Reply<BenchmarkResult> {
    let outcome = match runner::check_batch(count) {
        Err(err) => Err(Failure::from(err)),
        Ok(()) => helpers::blocking(move || {
            let mut generator = FakeDataGenerator::from_entropy();
            state.runner()?.update_random_stock(count, &mut generator)
        })
        .await,
    };
    helpers::respond("benchmark/update", outcome)
}

/// Seeds both stores up to `size` products. Sizes above
/// [`runner::MAX_BATCH_SIZE`] are a `BAD_REQUEST`.
pub(crate) async fn ensure_inventory(
    State(state): State<AppState>,
    Path(size): Path<usize>,
) -> Reply<InventoryReport> {
    let outcome = match runner::check_batch_limit(size) {
        Err(err) => Err(Failure::from(err)),
        Ok(()) => helpers::blocking(move || {
            let mut generator = FakeDataGenerator::from_entropy();
            state.runner()?.ensure_inventory(size, &mut generator)
        })
        .await,
    };
    helpers::respond("inventory", outcome)
}

/// Total plus a sample from the document store. Untimed.
pub(crate) async fn records(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Reply<RecordsView> {
    let outcome = match helpers::parse_kind(&kind) {
        Ok(kind) => {
            helpers::blocking(move || {
                let mut store = state.doc.get()?;
                let total = store.count(kind)?;
                let sample = match kind {
                    EntityKind::Users => Sample::Users(store.read_users(SAMPLE_LIMIT)?),
                    EntityKind::Products => Sample::Products(store.read_products(SAMPLE_LIMIT)?),
                };
                Ok(RecordsView {
                    kind,
                    total,
                    sample,
                })
            })
            .await
        }
        Err(failure) => Err(failure),
    };
    helpers::respond("records", outcome)
}

pub(crate) async fn reset_all(State(state): State<AppState>) -> Reply<ResetView> {
    let outcome = reset(state, EntityKind::ALL.to_vec()).await;
    helpers::respond("reset", outcome)
}

pub(crate) async fn reset_kind(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Reply<ResetView> {
    let outcome = match helpers::parse_kind(&kind) {
        Ok(kind) => reset(state, vec![kind]).await,
        Err(failure) => Err(failure),
    };
    helpers::respond("reset", outcome)
}

async fn reset(state: AppState, kinds: Vec<EntityKind>) -> Result<ResetView, Failure> {
    let cleared = helpers::blocking(move || state.runner()?.reset(&kinds)).await?;
    info!("Reset complete: {} kind(s) cleared", cleared.len());
    Ok(ResetView { cleared })
}
