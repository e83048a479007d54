use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;

/// Health check endpoint, with the number of staged requests per queue.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut queues = serde_json::Map::new();
    for queue in state.worker.queues() {
        let entry = match queue.pending().await {
            Ok(pending) => serde_json::json!({ "pending": pending.len() }),
            Err(e) => serde_json::json!({ "pending": null, "error": e.to_string() }),
        };
        queues.insert(queue.name().to_string(), entry);
    }

    Json(serde_json::json!({
        "status": "ok",
        "queues": queues,
        "build_profile": if cfg!(debug_assertions) { "debug" } else { "release" },
    }))
}
