use crate::classify::{classify, is_retryable_status};
use crate::queue::ReplayQueue;
use crate::transport::{OutboundRequest, Transport, TransportResponse};
use http::{HeaderValue, StatusCode};
use std::sync::Arc;

/// Header set on the placeholder response naming the queue a request went to.
pub const QUEUED_HEADER: &str = "x-replayq-queued";

#[derive(Debug)]
pub enum Intercepted {
    /// Upstream answered with a non-retryable status; hand it back unchanged.
    Passthrough(TransportResponse),
    /// The request failed and was staged in `queue`.
    Queued { queue: String },
}

impl Intercepted {
    /// The response the original caller sees.
    pub fn into_response(self) -> TransportResponse {
        match self {
            Intercepted::Passthrough(response) => response,
            Intercepted::Queued { queue } => placeholder_response(&queue),
        }
    }
}

/// `202 Accepted` with an empty body; the caller is never made to wait on
/// the retry.
pub fn placeholder_response(queue: &str) -> TransportResponse {
    let mut response = TransportResponse::new(StatusCode::ACCEPTED);
    if let Ok(value) = HeaderValue::from_str(queue) {
        response.headers.insert(QUEUED_HEADER, value);
    }
    response
}

/// Performs monitored requests and stages the ones that fail retryably.
pub struct Interceptor {
    transport: Arc<dyn Transport>,
}

impl Interceptor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn handle(&self, queue: &dyn ReplayQueue, request: OutboundRequest) -> Intercepted {
        let result = self.transport.send(&request).await;

        match result {
            Ok(response) if !is_retryable_status(response.status) => {
                Intercepted::Passthrough(response)
            }
            failed => {
                tracing::info!(
                    "[intercept] {} {} failed ({:?}), staging in {}",
                    request.method,
                    request.url,
                    classify(&failed),
                    queue.name()
                );
                queue.enqueue(&request).await;
                Intercepted::Queued {
                    queue: queue.name().to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::queue::test_support::ScriptedTransport;
    use crate::queue::{AnalyticsQueue, MutationQueue, ANALYTICS_QUEUE, SESSION_UPDATES_QUEUE};
    use crate::store::{KeyValueStore, MemoryStore};
    use http::Method;
    use std::time::Duration;
    use url::Url;

    fn analytics_queue(transport: Arc<ScriptedTransport>) -> (AnalyticsQueue, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(ANALYTICS_QUEUE));
        let queue = AnalyticsQueue::new(
            store.clone(),
            transport,
            Arc::new(ManualClock::new(1_000)),
            Duration::from_secs(86_400),
        );
        (queue, store)
    }

    fn ping() -> OutboundRequest {
        OutboundRequest::get(Url::parse("https://analytics.test/collect?v=1").unwrap())
    }

    #[tokio::test]
    async fn test_not_found_passes_through() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/collect", 404);
        let (queue, store) = analytics_queue(transport.clone());
        let interceptor = Interceptor::new(transport);

        let outcome = interceptor.handle(&queue, ping()).await;

        match outcome {
            Intercepted::Passthrough(response) => {
                assert_eq!(response.status, StatusCode::NOT_FOUND)
            }
            other => panic!("expected passthrough, got {:?}", other),
        }
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_service_unavailable_is_queued() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/collect", 503);
        let (queue, store) = analytics_queue(transport.clone());
        let interceptor = Interceptor::new(transport);

        let outcome = interceptor.handle(&queue, ping()).await;

        assert!(matches!(outcome, Intercepted::Queued { ref queue } if queue == ANALYTICS_QUEUE));
        assert_eq!(
            store
                .get("https://analytics.test/collect?v=1")
                .await
                .unwrap()
                .as_deref(),
            Some("1000")
        );
    }

    #[tokio::test]
    async fn test_network_error_is_queued() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryStore::new(SESSION_UPDATES_QUEUE));
        let queue = MutationQueue::new(store.clone(), transport.clone());
        let interceptor = Interceptor::new(transport);

        let request = OutboundRequest::new(
            Method::PUT,
            Url::parse("https://api.test/api/v1/user/schedule/s1").unwrap(),
        );
        let response = interceptor.handle(&queue, request).await.into_response();

        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(
            response.headers.get(QUEUED_HEADER).unwrap(),
            SESSION_UPDATES_QUEUE
        );
        assert_eq!(store.len().await.unwrap(), 1);
    }
}
