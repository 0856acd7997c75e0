use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{param, AppState};
use crate::cache::{keys, read_through, ttl};
use crate::error::AppResult;
use crate::models::PlaceItem;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/places", get(places))
}

#[derive(Debug, Deserialize)]
struct PlacesQuery {
    province: Option<String>,
}

/// Distinct places, optionally narrowed to addresses containing `province`.
async fn places(
    State(state): State<AppState>,
    Query(params): Query<PlacesQuery>,
) -> AppResult<Json<Vec<PlaceItem>>> {
    // ---
    let province = param(&params.province);
    let key = keys::places(&province);

    let engine = state.engine.clone();
    let places = read_through(state.cache.as_ref(), &key, ttl::PLACES, || async move {
        engine.places(Some(&province)).await
    })
    .await?;

    Ok(Json(places))
}
