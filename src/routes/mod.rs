//! HTTP gateway: merges every sibling subrouter and attaches shared state.
//!
//! Each sibling module owns its handlers and query types and exports a
//! `router()`; `main.rs` only ever calls [`router`].

use std::sync::Arc;

use axum::Router;

use crate::cache::JsonCache;
use crate::engine::Engine;
use crate::ingest::Fetcher;

mod airquality;
mod chart;
mod health;
mod pipeline;
mod places;

// ---

/// State shared by all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub cache: Arc<dyn JsonCache>,
    pub fetcher: Arc<Fetcher>,
    /// Feed polled by the on-demand refresh endpoint.
    pub source_url: String,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(chart::router())
        .merge(places::router())
        .merge(airquality::router())
        .merge(pipeline::router())
        .merge(health::router())
        .with_state(state)
}

/// Trimmed optional query parameter, empty when absent.
fn param(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}
