#![allow(dead_code)] // Test helpers appear unused when compiled independently

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

const WAIT_ATTEMPTS: usize = 50;
const WAIT_DELAY: Duration = Duration::from_millis(100);

pub const TEST_API_KEY: &str = "dub_test_key";

/// A tracking call received by the mock Dub API.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReceivedCall {
    pub kind: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct DubState {
    calls: Arc<Mutex<Vec<ReceivedCall>>>,
    /// Status returned for tracking calls; 200 when unset.
    fail_status: Option<u16>,
    /// Calls still answered with `fail_status` before the API recovers.
    remaining_failures: Arc<AtomicUsize>,
}

pub struct MockDub {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl MockDub {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}

/// Find an available TCP port
pub async fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Best-effort check for whether binding to loopback is permitted in the current sandbox.
pub async fn can_bind_loopback() -> bool {
    match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => false,
        Err(_) => true, // treat other errors as non-fatal for skipping
    }
}

/// Spawn the mock Dub API, return (server handle, base URL)
pub async fn spawn_mock_dub(port: u16, fail_status: Option<u16>) -> (MockDub, String) {
    spawn_dub_with_state(
        port,
        DubState {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_status,
            remaining_failures: Arc::new(AtomicUsize::new(usize::MAX)),
        },
    )
    .await
}

/// Spawn a mock Dub API that answers the first `failures` calls with `status`
pub async fn spawn_flaky_dub(port: u16, status: u16, failures: usize) -> (MockDub, String) {
    spawn_dub_with_state(
        port,
        DubState {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_status: Some(status),
            remaining_failures: Arc::new(AtomicUsize::new(failures)),
        },
    )
    .await
}

async fn spawn_dub_with_state(port: u16, state: DubState) -> (MockDub, String) {
    let app = Router::new()
        .route("/track/:kind", post(track))
        .route("/calls", get(calls))
        .route("/health", get(health))
        .with_state(state);

    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .expect("failed to bind mock Dub listener");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(err) = server.await {
            eprintln!("mock Dub server error: {}", err);
        }
    });

    (
        MockDub {
            shutdown_tx,
            handle,
        },
        format!("http://127.0.0.1:{}", port),
    )
}

/// Start the component router against `api_url`, return its base URL
pub async fn spawn_component(api_url: &str) -> String {
    let mut settings = dub_component::Settings::new(TEST_API_KEY);
    settings.api_url = api_url.to_string();
    let app = dub_component::build_router(&settings).expect("failed to build router");

    let port = free_port().await;
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base_url = format!("http://127.0.0.1:{}", port);
    wait_for_health(&Client::new(), &base_url).await;
    base_url
}

/// Wait for a server to respond to /health
pub async fn wait_for_health(client: &Client, base_url: &str) {
    poll_until(|| async {
        client
            .get(format!("{}/health", base_url))
            .send()
            .await
            .ok()
            .map(|_| ())
    })
    .await
    .unwrap_or_else(|| panic!("timed out waiting for {} to be healthy", base_url));
}

/// Poll /calls until at least `min_count` tracking calls arrived
pub async fn wait_for_calls(
    client: &Client,
    base_url: &str,
    min_count: usize,
) -> Vec<ReceivedCall> {
    poll_until(|| async {
        match fetch_calls(client, base_url).await {
            Some(calls) if calls.len() >= min_count => Some(calls),
            _ => None,
        }
    })
    .await
    .unwrap_or_else(|| panic!("timed out waiting for {} calls at {}", min_count, base_url))
}

pub async fn fetch_calls(client: &Client, base_url: &str) -> Option<Vec<ReceivedCall>> {
    client
        .get(format!("{}/calls", base_url))
        .send()
        .await
        .ok()?
        .json::<Vec<ReceivedCall>>()
        .await
        .ok()
}

async fn poll_until<T, F, Fut>(mut f: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..WAIT_ATTEMPTS {
        if let Some(result) = f().await {
            return Some(result);
        }
        tokio::time::sleep(WAIT_DELAY).await;
    }
    None
}

async fn track(
    State(state): State<DubState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let parsed: Value = serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state.calls.lock().await.push(ReceivedCall {
        kind,
        authorization,
        body: parsed,
    });

    let failing = state.fail_status.filter(|_| {
        state
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    });

    match failing {
        Some(status) => Err(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST)),
        None => Ok(Json(serde_json::json!({ "status": "ok" }))),
    }
}

async fn calls(State(state): State<DubState>) -> Json<Vec<ReceivedCall>> {
    let calls = state.calls.lock().await;
    Json(calls.clone())
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
