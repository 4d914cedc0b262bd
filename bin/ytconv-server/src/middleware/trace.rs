use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::{BodyExt, Limited};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Only JSON bodies declaring a `Content-Length` below this are buffered
/// and logged; everything else streams through untouched.
const MAX_LOGGED_BODY: usize = 1024;

/// Wraps each request in a span carrying a trace id and logs its latency.
///
/// An incoming `x-trace-id` UUID is reused, otherwise a new one is generated;
/// either way it is echoed on the response. Small JSON request bodies are
/// logged at debug level. Response bodies are never buffered so downloads
/// stream straight through.
pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        info!("→ request started");
        let trace_value = HeaderValue::from_str(&trace_id.to_string()).ok();

        let (parts, body) = req.into_parts();
        let mut req = if should_log_body(&parts.headers) {
            let bytes = buffer_and_log(body).await;
            Request::from_parts(parts, Body::from(bytes))
        } else {
            Request::from_parts(parts, body)
        };
        if let Some(value) = &trace_value {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let mut response = next.run(req).await;
        if let Some(value) = trace_value {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );

        response
    }
    .instrument(span)
    .await
}

fn should_log_body(headers: &header::HeaderMap) -> bool {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    let declared_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    is_json && declared_len.is_some_and(|len| len < MAX_LOGGED_BODY)
}

async fn buffer_and_log(body: Body) -> Bytes {
    // A body longer than it declared is cut off here; the JSON extractor
    // then rejects the truncated payload.
    let bytes = match Limited::new(body, MAX_LOGGED_BODY).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(error = %e, "request body [unreadable]");
            return Bytes::new();
        }
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        debug!(body = %text, "request body");
    }

    bytes
}
