use axum::body::Body;
use axum::http::{HeaderMap, HeaderName};
use axum::response::Response;
use replayq::{ReplayConfig, ReplayError, TransportResponse, Worker};
use std::sync::Arc;
use url::Url;

pub mod forward;
pub mod health;
pub mod replay;

pub struct AppState {
    pub config: ReplayConfig,
    pub worker: Arc<Worker>,
}

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Headers worth carrying across the proxy in either direction.
pub(crate) fn forwardable(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// `base` with `segments` appended to its path. Each segment is
/// percent-encoded, so none of them can climb out of the base path or add a
/// query.
pub(crate) fn upstream_url(base: &Url, segments: &[&str]) -> Result<Url, ReplayError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| ReplayError::InvalidUrl(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// A single path segment taken from the client. Dot segments and `%` are
/// refused because the URL parser resolves `..`, `.` and their encoded forms
/// even inside a pushed segment.
pub(crate) fn path_segment(value: &str) -> Result<&str, ReplayError> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(&['/', '\\', '?', '#', '%'][..])
    {
        return Err(ReplayError::InvalidUrl(format!(
            "invalid path segment: {:?}",
            value
        )));
    }
    Ok(value)
}

pub(crate) fn into_axum_response(response: TransportResponse) -> Response {
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = response.status;
    *out.headers_mut() = forwardable(&response.headers);
    out
}

pub use forward::{collect, schedule_mutation};
pub use health::health;
pub use replay::{replay_all, replay_queue};
