//! Chart endpoints: range series, today, one-year heatmap and daily ranking.
//!
//! Every handler resolves its parameters first, builds the cache key from the
//! resolved values, and only calls the engine on a cache miss.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::{param, AppState};
use crate::cache::{chart_ttl, keys, read_through, ttl};
use crate::engine::metric::Metric;
use crate::engine::range::RangeKind;
use crate::engine::rank::RankRequest;
use crate::error::{AppError, AppResult};
use crate::models::{ChartSeries, RankRow};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/chartdata", get(chart_data))
        .route("/api/chartdata/today", get(today))
        .route("/api/chartdata/heatmap_one_year", get(heatmap_one_year))
        .route("/api/chartdata/rank_daily", get(rank_daily))
}

#[derive(Debug, Deserialize)]
struct ChartQuery {
    range: Option<String>,
    province: Option<String>,
    metric: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RankQuery {
    /// `YYYY-MM-DD`, defaults to today in Asia/Bangkok.
    date: Option<String>,
    metric: Option<String>,
    group: Option<String>,
    limit: Option<String>,
}

async fn chart_data(
    State(state): State<AppState>,
    Query(params): Query<ChartQuery>,
) -> AppResult<Json<ChartSeries>> {
    // ---
    let range = RangeKind::from_keyword(&param(&params.range));
    serve_chart(&state, range, &params).await
}

async fn today(
    State(state): State<AppState>,
    Query(params): Query<ChartQuery>,
) -> AppResult<Json<ChartSeries>> {
    serve_chart(&state, RangeKind::Today, &params).await
}

async fn serve_chart(
    state: &AppState,
    range: RangeKind,
    params: &ChartQuery,
) -> AppResult<Json<ChartSeries>> {
    // ---
    let province = param(&params.province);
    let metric = Metric::for_chart(&param(&params.metric));
    let key = keys::chart(range, &province, metric);

    let engine = state.engine.clone();
    let series = read_through(state.cache.as_ref(), &key, chart_ttl(range), || async move {
        engine.aggregate(range, metric, Some(&province)).await
    })
    .await?;

    Ok(Json(series))
}

async fn heatmap_one_year(
    State(state): State<AppState>,
    Query(params): Query<ChartQuery>,
) -> AppResult<Json<ChartSeries>> {
    // ---
    let province = param(&params.province);
    if province.is_empty() {
        return Err(AppError::validation("province is required"));
    }
    let metric = Metric::for_chart(&param(&params.metric));
    let key = keys::heatmap(&province, metric);

    let engine = state.engine.clone();
    let series = read_through(state.cache.as_ref(), &key, ttl::HEATMAP, || async move {
        engine.heatmap_one_year(&province, metric).await
    })
    .await?;

    Ok(Json(series))
}

async fn rank_daily(
    State(state): State<AppState>,
    Query(params): Query<RankQuery>,
) -> AppResult<Json<Vec<RankRow>>> {
    // ---
    let date = match param(&params.date) {
        d if d.is_empty() => state.engine.today_local(),
        d => d,
    };
    let metric = match param(&params.metric) {
        m if m.is_empty() => "pm25".to_string(),
        m => m,
    };
    let group = match param(&params.group) {
        g if g.is_empty() => "address".to_string(),
        g => g,
    };

    let request = RankRequest::parse(&date, &metric, &group, params.limit.as_deref())?;
    debug!(?request, "daily ranking");

    let engine = state.engine.clone();
    let key = request.cache_key();
    let ranking = read_through(state.cache.as_ref(), &key, ttl::RANKING, || async move {
        engine.rank_daily(&request).await
    })
    .await?;

    Ok(Json(ranking))
}
