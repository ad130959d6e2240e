//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/metrics` : Prometheus text format (collected families + self-metrics)

use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use snowprom_core::expo;

use crate::app_state::AppState;

/// Sent by Prometheus with every scrape.
pub const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn requested_timeout(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(SCRAPE_TIMEOUT_HEADER)?.to_str().ok()?;
    let secs: f64 = raw.trim().parse().ok()?;
    if secs.is_finite() && secs > 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

pub async fn metrics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let deadline = state.scrape_deadline(requested_timeout(&headers));
    let started = Instant::now();

    let families = state.registry().gather(Some(deadline)).await;
    let elapsed = started.elapsed();
    state.metrics().observe_scrape(elapsed);
    tracing::debug!(families = families.len(), elapsed_ms = elapsed.as_millis() as u64, "scrape served");

    let mut body = expo::render(&families);
    body.push_str(&expo::render(&state.metrics().families()));

    (StatusCode::OK, [(header::CONTENT_TYPE, expo::CONTENT_TYPE)], body).into_response()
}
