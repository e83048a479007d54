//! Monitored request categories. Each handler rebuilds the request against
//! its upstream and runs it through the interceptor, so a retryable failure
//! is staged and answered with a placeholder instead of an error.

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use replayq::{OutboundRequest, ReplayError};
use std::sync::Arc;

use super::{forwardable, into_axum_response, path_segment, upstream_url, AppState};

/// Analytics ping, e.g. `GET /collect?v=1&tid=UA-1&t=pageview`.
pub async fn collect(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, ReplayError> {
    let mut url = upstream_url(&state.config.analytics_upstream, &["collect"])?;
    url.set_query(query.as_deref());

    let request = OutboundRequest::get(url).with_headers(forwardable(&headers));
    let outcome = state
        .worker
        .interceptor
        .handle(state.worker.analytics.as_ref(), request)
        .await;

    Ok(into_axum_response(outcome.into_response()))
}

/// Add (`PUT`) or remove (`DELETE`) a session from the user's schedule.
pub async fn schedule_mutation(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ReplayError> {
    let url = upstream_url(
        &state.config.api_upstream,
        &["api", "v1", "user", "schedule", path_segment(&session_id)?],
    )?;

    let request = OutboundRequest::new(method, url)
        .with_headers(forwardable(&headers))
        .with_body(body.to_vec());
    let outcome = state
        .worker
        .interceptor
        .handle(state.worker.session_updates.as_ref(), request)
        .await;

    Ok(into_axum_response(outcome.into_response()))
}
