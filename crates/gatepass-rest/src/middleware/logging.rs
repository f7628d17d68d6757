//! Request logging middleware.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Logs method, path, status and duration of every request.
///
/// The query string is left out; name searches carry attendee names.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = started.elapsed().as_millis();

    if response.status().is_server_error() {
        warn!(target: "http", %method, %path, status, %duration_ms, "request failed");
    } else {
        info!(target: "http", %method, %path, status, %duration_ms, "request handled");
    }

    response
}
