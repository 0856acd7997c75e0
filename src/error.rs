//! Error taxonomy shared by the ingestion and read paths.
//!
//! Every fallible library operation returns [`AppError`]. The HTTP layer
//! maps each variant onto a status code via [`IntoResponse`], so handlers can
//! simply propagate with `?`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ---
    /// Caller supplied parameters that fail validation (bad date, unknown
    /// ranking metric or group, missing required filter).
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Transport failure or non-2xx status talking to the upstream feed.
    #[error("upstream fetch failed: {0}")]
    Upstream(String),

    /// Upstream body was not the expected JSON envelope.
    #[error("upstream payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Cache backend failure. Read paths swallow these.
    #[error("cache error: {0}")]
    Cache(String),
}

impl AppError {
    // ---
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        // ---
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) | AppError::Decode(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Upstream(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
