//! Interception over real HTTP: which upstream outcomes get staged.

use http::StatusCode;
use replayq::{
    HttpTransport, Intercepted, Interceptor, ManualClock, MemoryBackend, OutboundRequest,
    ReplayConfig, ReplayQueue, Worker, QUEUED_HEADER,
};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn worker_for(base: &str) -> Worker {
    let base = Url::parse(base).unwrap();
    let config = ReplayConfig::for_upstreams(base.clone(), base);
    let transport = Arc::new(HttpTransport::new(Duration::from_secs(2)).unwrap());
    Worker::open(
        &config,
        &MemoryBackend::new(),
        transport,
        Arc::new(ManualClock::new(42)),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn client_error_is_passed_through_and_not_staged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collect"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such property"))
        .mount(&server)
        .await;

    let worker = worker_for(&server.uri()).await;
    let request =
        OutboundRequest::get(Url::parse(&format!("{}/collect?v=1", server.uri())).unwrap());

    match worker.interceptor.handle(worker.analytics.as_ref(), request).await {
        Intercepted::Passthrough(response) => {
            assert_eq!(response.status, StatusCode::NOT_FOUND);
            assert_eq!(response.body, b"no such property");
        }
        other => panic!("expected passthrough, got {:?}", other),
    }
    assert!(worker.analytics.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn server_error_is_staged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collect"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let worker = worker_for(&server.uri()).await;
    let url = format!("{}/collect?v=1", server.uri());
    let request = OutboundRequest::get(Url::parse(&url).unwrap());

    let response = worker
        .interceptor
        .handle(worker.analytics.as_ref(), request)
        .await
        .into_response();

    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(
        response.headers.get(QUEUED_HEADER).unwrap(),
        "offline-analytics"
    );
    assert_eq!(
        worker.analytics.pending().await.unwrap(),
        vec![(url, "42".to_string())]
    );
}

#[tokio::test]
async fn unreachable_upstream_is_staged() {
    // Grab a free port, then close it so connections are refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = format!("http://{}", addr);
    let worker = worker_for(&base).await;
    let request = OutboundRequest::new(
        http::Method::PUT,
        Url::parse(&format!("{}/api/v1/user/schedule/s1", base)).unwrap(),
    );

    let outcome = Interceptor::handle(
        &worker.interceptor,
        worker.session_updates.as_ref(),
        request,
    )
    .await;

    assert!(matches!(outcome, Intercepted::Queued { .. }));
    let pending = worker.session_updates.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].1, "PUT");
}
