use anyhow::Context;
use log::{error, info, warn};
use std::time::Duration;
use tokio::time::sleep;

use api::config::{LogSettings, Settings};
use api::{AppState, router};
use luw_core::BenchError;

/// Opens one runner to prove both backends are reachable and durable.
/// Unreachable backends are retried; a non-durable one is fatal at once.
///
/// Only startup waits for backends this way. Once serving, a benchmark
/// request that cannot reach a store fails with 503 and is never retried.
async fn verify_backends(state: &AppState) -> Result<(), BenchError> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY_SECS: u64 = 3;

    let mut attempt = 0;
    loop {
        let check = state.clone();
        let outcome = tokio::task::spawn_blocking(move || check.runner().map(|_| ()))
            .await
            .unwrap_or_else(|err| {
                Err(BenchError::BackendUnavailable {
                    backend: luw_core::store::BackendKind::Relational,
                    message: format!("startup check aborted: {err}"),
                })
            });

        match outcome {
            Err(BenchError::BackendUnavailable { backend, message }) if attempt < MAX_RETRIES => {
                attempt += 1;
                warn!(
                    "{} unreachable (attempt {}/{}): {}; retrying in {}s",
                    backend,
                    attempt,
                    MAX_RETRIES + 1,
                    message,
                    RETRY_DELAY_SECS
                );
                sleep(Duration::from_secs(RETRY_DELAY_SECS)).await;
            }
            other => return other,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("Failed to read .env: {err}");
        }
    }

    let logging = LogSettings::from_env();
    luw_core::initialize_logger(logging.level, logging.file.as_deref())?;

    info!(
        "API starting (level={}, logfile={})",
        logging.level,
        logging.file.as_deref().unwrap_or("none")
    );

    let settings = Settings::from_env();
    info!(
        "SQL store: {} (synchronous={:?}, journal_mode={:?})",
        settings.sql.path.display(),
        settings.sql.synchronous,
        settings.sql.journal_mode
    );
    info!(
        "Document store: {} (write ack={})",
        settings.keydb_url, settings.write_ack
    );

    let state = AppState::new(&settings).context("invalid backend settings")?;
    if let Err(err) = verify_backends(&state).await {
        error!("Startup check failed: {}", err);
        std::process::exit(1);
    }
    info!("Both backends acknowledge writes only after they are durable");

    let app = router(state);
    let bind_address = settings.bind_address();
    info!("Listening on {}", bind_address);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    axum::serve(listener, app).await?;

    info!("Server shutdown");
    Ok(())
}
