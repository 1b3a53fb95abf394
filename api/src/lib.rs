pub mod config;
pub mod helpers;
pub mod pages;
pub mod routes;
pub mod types;

use axum::Router;
use axum::routing::get;

use luw_core::runner::Runner;
use luw_core::store::document::{DocumentPool, DocumentStore};
use luw_core::store::sqlite::{SqlitePool, SqliteStore};

use crate::config::Settings;

pub type BenchRunner = Runner<SqliteStore, DocumentStore>;

/// Connection pools shared by every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub sql: SqlitePool,
    pub doc: DocumentPool,
}

impl AppState {
    pub fn new(settings: &Settings) -> luw_core::Result<Self> {
        Ok(Self {
            sql: SqlitePool::new(settings.sql.clone()),
            doc: DocumentPool::open(&settings.keydb_url, settings.write_ack)?,
        })
    }

    /// Takes one connection from each pool and checks both are durable.
    pub fn runner(&self) -> luw_core::Result<BenchRunner> {
        Runner::new(self.sql.get()?, self.doc.get()?)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/benchmark/write/{count}", get(routes::benchmark_write))
        .route("/benchmark/read/{count}", get(routes::benchmark_read))
        .route("/benchmark/update/{count}", get(routes::benchmark_update))
        .route(
            "/inventory/{size}",
            get(routes::ensure_inventory).post(routes::ensure_inventory),
        )
        .route("/records/{kind}", get(routes::records))
        .route("/reset", get(routes::reset_all).delete(routes::reset_all))
        .route(
            "/reset/{kind}",
            get(routes::reset_kind).delete(routes::reset_kind),
        )
        .with_state(state)
}
