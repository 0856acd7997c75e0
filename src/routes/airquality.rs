//! Air-quality summaries: per-address rolling averages, per-province
//! averages and the newest reading.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{param, AppState};
use crate::cache::{keys, read_through, ttl};
use crate::engine::RollingWindow;
use crate::error::AppResult;
use crate::models::{LatestReading, ProvinceAverage, RollingAverages};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/airquality/latest", get(latest))
        .route("/api/airquality/province_average", get(province_average))
        .route("/api/airquality/{window}", get(rolling))
}

#[derive(Debug, Deserialize)]
struct LatestQuery {
    province: Option<String>,
}

/// Newest reading, not cached so the dashboard badge stays current.
async fn latest(
    State(state): State<AppState>,
    Query(params): Query<LatestQuery>,
) -> AppResult<Json<LatestReading>> {
    let province = param(&params.province);
    Ok(Json(state.engine.latest_reading(Some(&province)).await?))
}

async fn province_average(State(state): State<AppState>) -> AppResult<Json<Vec<ProvinceAverage>>> {
    // ---
    let engine = state.engine.clone();
    let averages = read_through(
        state.cache.as_ref(),
        keys::PROVINCE_AVERAGE,
        ttl::PROVINCE_AVERAGE,
        || async move { engine.province_averages().await },
    )
    .await?;
    Ok(Json(averages))
}

async fn rolling(
    State(state): State<AppState>,
    Path(window): Path<String>,
) -> AppResult<Json<RollingAverages>> {
    // ---
    let window = RollingWindow::parse(&window)?;
    let engine = state.engine.clone();
    let averages = read_through(
        state.cache.as_ref(),
        &keys::rolling(window.name()),
        ttl::ROLLING,
        || async move { engine.rolling_averages(window).await },
    )
    .await?;
    Ok(Json(averages))
}
