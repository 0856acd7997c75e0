use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;

use super::AppState;
use crate::error::AppResult;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/api/pipeline/refresh", post(refresh))
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    message: &'static str,
    processed: usize,
    failed: usize,
}

/// Run one ingestion cycle now against the configured feed.
///
/// Independent of the periodic loop; overlapping with a scheduled cycle is
/// safe because every row write is an upsert on its own key.
async fn refresh(State(state): State<AppState>) -> AppResult<Json<RefreshResponse>> {
    // ---
    info!("POST /api/pipeline/refresh - starting on-demand poll");
    let report = state.fetcher.poll(&state.source_url).await?;

    Ok(Json(RefreshResponse {
        message: "refresh complete",
        processed: report.processed,
        failed: report.failed,
    }))
}
