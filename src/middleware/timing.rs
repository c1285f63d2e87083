use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};

static RESPONSE_TIME_US: HeaderName = HeaderName::from_static("x-response-time-us");
static SERVER_TIMING: HeaderName = HeaderName::from_static("server-timing");

/// Stamps API responses with how long the handler took:
///
///   X-Response-Time-Us  wall time in microseconds
///   Server-Timing       `probe;dur=<ms>` for a measurement run, `api;dur=<ms>` otherwise
///
/// and emits one `tracing` event per API request. Dashboard assets pass
/// through untouched.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    if !path.starts_with("/api/") {
        return next.run(req).await;
    }
    let method = req.method().clone();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();

    let headers = response.headers_mut();
    headers.insert(RESPONSE_TIME_US.clone(), HeaderValue::from(elapsed.as_micros() as u64));
    if let Ok(val) = HeaderValue::from_str(&server_timing(&path, elapsed)) {
        headers.insert(SERVER_TIMING.clone(), val);
    }

    let status = response.status().as_u16();
    let elapsed_us = elapsed.as_micros() as u64;
    if status >= 500 {
        tracing::warn!(%method, %path, status, elapsed_us, "request");
    } else {
        tracing::info!(%method, %path, status, elapsed_us, "request");
    }

    response
}

fn server_timing(path: &str, elapsed: Duration) -> String {
    let metric = if path == "/api/test" { "probe" } else { "api" };
    format!("{metric};dur={:.3}", elapsed.as_secs_f64() * 1000.0)
}
