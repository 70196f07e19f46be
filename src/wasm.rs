use time::format_description::well_known::Rfc3339;
use tracing_subscriber::fmt::format::Pretty;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_web::{performance_layer, MakeWebConsoleWriter};
use worker::*;

use crate::client::HttpCookieClient;
use crate::config::Settings;
use crate::dub::DubClient;
use crate::event::{EventKind, McEvent};
use crate::handler::{Action, Dispatcher, HandleResponse};

const EVENTS_PREFIX: &str = "/v1/events/";

/// Add CORS headers to a response, echoing the request origin so
/// credentialed posts carry cookies.
fn with_cors(response: Response, origin: Option<&str>) -> Result<Response> {
    let headers = Headers::new();
    if let Some(origin) = origin {
        headers.set("Access-Control-Allow-Origin", origin)?;
        headers.set("Access-Control-Allow-Credentials", "true")?;
        headers.set("Vary", "Origin")?;
    }
    headers.set("Access-Control-Allow-Methods", "POST, OPTIONS")?;
    headers.set("Access-Control-Allow-Headers", "Content-Type")?;
    headers.set("Access-Control-Max-Age", "86400")?;

    // Copy original headers; Set-Cookie may repeat so append rather than set
    for (key, value) in response.headers() {
        if !key.to_lowercase().starts_with("access-control-") {
            headers.append(&key, &value)?;
        }
    }

    Ok(Response::from_body(response.body().clone())?
        .with_status(response.status_code())
        .with_headers(headers))
}

/// Initialize tracing for Cloudflare Workers.
/// Must be called via #[event(start)] to run once on worker initialization.
#[event(start)]
fn init() {
    // JSON formatting layer that writes to the Workers console
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_ansi(false)
        .with_timer(UtcTime::new(Rfc3339))
        .with_writer(MakeWebConsoleWriter::new());

    let perf_layer = performance_layer().with_details_from_fields(Pretty::default());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(perf_layer)
        .init();
}

#[event(fetch)]
pub async fn main(req: Request, env: Env, ctx: Context) -> Result<Response> {
    let method = req.method();
    let path = req.path();
    let origin = req.headers().get("Origin").ok().flatten();

    if method == Method::Options {
        return with_cors(Response::empty()?.with_status(204), origin.as_deref());
    }

    let response = match (method, path.as_str()) {
        (Method::Post, path) if path.starts_with(EVENTS_PREFIX) => {
            let kind = path.trim_start_matches(EVENTS_PREFIX).to_string();
            handle_event_worker(&kind, req, env, ctx).await
        }
        (Method::Get, "/health") => Response::ok("ok"),
        _ => Response::error("Not Found", 404),
    };

    // Add CORS headers to all responses, including errors
    match response {
        Ok(r) => with_cors(r, origin.as_deref()),
        Err(e) => with_cors(Response::error(e.to_string(), 500)?, origin.as_deref()),
    }
}

async fn handle_event_worker(
    kind: &str,
    mut req: Request,
    env: Env,
    ctx: Context,
) -> Result<Response> {
    let kind = match EventKind::from_name(kind) {
        Some(kind) => kind,
        None => return Response::error(format!("unknown event type: {}", kind), 404),
    };

    let body = req.bytes().await?;
    let event = match McEvent::from_json_body(&body) {
        Ok(event) => event,
        Err(e) => return Response::error(e, 400),
    };

    let settings = Settings::from_worker_env(&env)?;
    let sender = DubClient::from_settings(&settings).map_err(Error::RustError)?;
    let dispatcher = Dispatcher::new(sender, settings.cookie_names());

    let cookie_header = req.headers().get("Cookie")?;
    let mut client = HttpCookieClient::new(cookie_header.as_deref());

    let call = dispatcher.prepare(kind, event, &mut client);
    let action = Action::for_call(call.as_ref(), kind);

    // Deliver after the response is sent; the dispatcher logs failures.
    if let Some(call) = call {
        ctx.wait_until(async move {
            dispatcher.deliver(kind, call).await;
        });
    }

    let mut response = Response::from_json(&HandleResponse::accepted(action))?.with_status(202);
    for cookie in client.set_cookie_headers() {
        response.headers_mut().append("Set-Cookie", &cookie)?;
    }
    Ok(response)
}
