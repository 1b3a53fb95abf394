//! Router tests: requests that are answered without a document-store server.

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tower::ServiceExt;

use api::config::Settings;
use api::{AppState, router};
use luw_core::store::sqlite::SqliteOptions;

/// Nothing listens on port 1, so document-store connections fail fast.
const UNREACHABLE_KEYDB: &str = "redis://127.0.0.1:1/";

fn state(dir: &tempfile::TempDir) -> AppState {
    let mut settings = Settings::from_lookup(|_| None);
    settings.sql = SqliteOptions::durable(dir.path().join("router.db"));
    settings.keydb_url = UNREACHABLE_KEYDB.to_string();
    AppState::new(&settings).expect("state")
}

async fn get(uri: &str) -> (StatusCode, Vec<u8>) {
    let dir = tempfile::tempdir().unwrap();
    let response = router(state(&dir))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(uri).await;
    (status, serde_json::from_slice(&body).expect("json body"))
}

#[tokio::test]
async fn index_links_every_benchmark() {
    let (status, body) = get("/").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    for link in [
        "/benchmark/write/",
        "/benchmark/read/",
        "/benchmark/update/",
        "/inventory/",
        "/reset",
    ] {
        assert!(html.contains(link), "missing {link}");
    }
}

#[tokio::test]
async fn zero_sized_writes_are_rejected() {
    for uri in ["/benchmark/write/0", "/benchmark/update/0"] {
        let (status, json) = get_json(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["back_link"], "/");
        assert!(json["error"].as_str().unwrap().contains("greater than zero"));
        assert!(json.get("winner").is_none());
    }
}

#[tokio::test]
async fn unknown_kinds_are_rejected() {
    let (status, json) = get_json("/reset/orders").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("orders"));

    let (status, _) = get_json("/records/orders").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_batches_are_rejected_before_connecting() {
    for uri in [
        "/benchmark/write/50001",
        "/benchmark/update/50001",
        "/inventory/50001",
        "/benchmark/write/100000000",
    ] {
        let (status, json) = get_json(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(json["error"].as_str().unwrap().contains("exceeds the limit of 50000"));
    }
}

#[tokio::test]
async fn unreachable_document_store_is_503() {
    let (status, json) = get_json("/benchmark/read/10").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].as_str().unwrap().starts_with("NoSQL unavailable"));
}

#[tokio::test]
async fn unreachable_store_fails_without_retrying() {
    let started = Instant::now();
    let (status, _) = get_json("/benchmark/write/5").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    // The startup check waits 3s between attempts; requests never do.
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn non_numeric_counts_are_rejected() {
    let (status, _) = get("/benchmark/write/lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_routes_are_404() {
    let (status, _) = get("/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
