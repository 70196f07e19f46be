use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::client::HttpCookieClient;
use crate::config::Settings;
use crate::dub::{DubClient, TrackSender};
use crate::event::{EventKind, McEvent};
use crate::handler::{Action, Dispatcher, HandleResponse};

/// Initialize tracing subscriber for native (non-WASM) builds.
/// Uses RUST_LOG env var for filtering (defaults to info).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(true))
        .with(filter)
        .init();
}

/// Router forwarding events to the Dub API described by `settings`.
pub fn build_router(settings: &Settings) -> Result<Router, String> {
    settings.validate().map_err(|e| e.to_string())?;
    let client = DubClient::from_settings(settings)?;
    let dispatcher = Dispatcher::new(client, settings.cookie_names());
    Ok(build_router_with_dispatcher(Arc::new(dispatcher)))
}

pub fn build_router_with_dispatcher<S>(dispatcher: Arc<Dispatcher<S>>) -> Router
where
    S: TrackSender + Send + Sync + 'static,
{
    Router::new()
        .route("/v1/events/:kind", post(handle_event_axum::<S>))
        .route("/health", get(|| async { "ok" }))
        .with_state(dispatcher)
}

async fn handle_event_axum<S>(
    State(dispatcher): State<Arc<Dispatcher<S>>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, (StatusCode, String)>
where
    S: TrackSender + Send + Sync + 'static,
{
    let kind = EventKind::from_name(&kind)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown event type: {}", kind)))?;
    let event = McEvent::from_json_body(&body).map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());
    let mut client = HttpCookieClient::new(cookie_header);

    let call = dispatcher.prepare(kind, event, &mut client);
    let action = Action::for_call(call.as_ref(), kind);

    // Each event is delivered on its own task; failures stay inside it.
    if let Some(call) = call {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            dispatcher.deliver(kind, call).await;
        });
    }

    let mut response =
        (StatusCode::ACCEPTED, Json(HandleResponse::accepted(action))).into_response();
    for cookie in client.set_cookie_headers() {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "skipping invalid Set-Cookie value"),
        }
    }
    Ok(response)
}
