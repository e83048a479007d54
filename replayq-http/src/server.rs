use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use replayq::{store, HttpTransport, ReplayConfig, SystemClock, Worker};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::handlers::{collect, health, replay_all, replay_queue, schedule_mutation, AppState};

/// Build the proxy routes over an already-opened worker.
pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body_mb: usize = std::env::var("REPLAYQ_MAX_BODY_MB")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);

    Router::new()
        .route("/health", get(health))
        .route("/collect", get(collect))
        .route(
            "/api/v1/user/schedule/:session_id",
            put(schedule_mutation).delete(schedule_mutation),
        )
        .route("/internal/replay", post(replay_all))
        .route("/internal/replay/:queue", post(replay_queue))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_mb * 1024 * 1024))
        .layer(CorsLayer::very_permissive().max_age(std::time::Duration::from_secs(86400)))
        .layer(TraceLayer::new_for_http())
}

/// Open the worker described by `config`, the store backend included.
pub async fn open_worker(config: &ReplayConfig) -> replayq::Result<Arc<Worker>> {
    let backend = store::backend_from_config(config);
    let transport = Arc::new(HttpTransport::new(config.request_timeout())?);
    let worker = Worker::open(config, backend.as_ref(), transport, Arc::new(SystemClock)).await?;
    Ok(Arc::new(worker))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ReplayConfig::from_env()?;
    tracing::info!(
        store = ?config.store,
        data_dir = %config.data_dir.display(),
        analytics_upstream = %config.analytics_upstream,
        api_upstream = %config.api_upstream,
        retention_hours = config.analytics_retention_hours,
        "Configuration loaded"
    );

    let worker = open_worker(&config).await?;

    // One replay pass per start; the proxy serves while it runs.
    let startup = Arc::clone(&worker);
    tokio::spawn(async move {
        for report in startup.on_startup().await {
            tracing::info!("[worker] Start-up replay: {}", report);
        }
    });

    let bind_addr = config.bind_addr.clone();
    let app = build_router(Arc::new(AppState { config, worker }));

    tracing::info!("Starting replayq proxy on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("replayq proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use replayq::{ManualClock, MemoryBackend};
    use tower::ServiceExt;
    use url::Url;

    async fn app_with_unreachable_upstream() -> Router {
        // Free port, closed again, so every forward is a network failure.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        drop(listener);

        let config = ReplayConfig::for_upstreams(base.clone(), base);
        let worker = Worker::open(
            &config,
            &MemoryBackend::new(),
            Arc::new(HttpTransport::new(config.request_timeout()).unwrap()),
            Arc::new(ManualClock::new(0)),
        )
        .await
        .unwrap();

        build_router(Arc::new(AppState {
            config,
            worker: Arc::new(worker),
        }))
    }

    #[tokio::test]
    async fn test_health_reports_queues() {
        let app = app_with_unreachable_upstream().await;

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["queues"]["offline-analytics"]["pending"], 0);
        assert_eq!(json["queues"]["offline-session-updates"]["pending"], 0);
    }

    #[tokio::test]
    async fn test_unknown_queue_is_not_found() {
        let app = app_with_unreachable_upstream().await;

        let response = app
            .oneshot(
                Request::post("/internal/replay/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "unknown_queue");
    }

    #[tokio::test]
    async fn test_unreachable_collect_gets_placeholder() {
        let app = app_with_unreachable_upstream().await;

        let response = app
            .oneshot(
                Request::get("/collect?v=1&t=pageview")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response.headers().get("x-replayq-queued").unwrap(),
            "offline-analytics"
        );
    }
}
