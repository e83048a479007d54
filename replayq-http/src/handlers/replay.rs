use axum::extract::{Path, State};
use axum::Json;
use replayq::{ReplayError, ReplayReport};
use std::sync::Arc;

use super::AppState;

/// Replay every queue now.
pub async fn replay_all(State(state): State<Arc<AppState>>) -> Json<Vec<ReplayReport>> {
    Json(state.worker.replay_all().await)
}

/// Replay a single queue by name.
pub async fn replay_queue(
    State(state): State<Arc<AppState>>,
    Path(queue): Path<String>,
) -> Result<Json<ReplayReport>, ReplayError> {
    Ok(Json(state.worker.replay(&queue).await?))
}
