//! Health check endpoint.
//!
//! Reports whether the note store still answers. A store that was closed for
//! a restart makes the instance unhealthy even while the listener lingers.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use crate::routes::notes::blocking;
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` or `unavailable`.
    pub status: &'static str,
    /// Engine backing the note store.
    pub engine: &'static str,
    /// Address this instance was configured to serve on.
    pub listen: String,
    /// Live notes, absent when the store cannot be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<u64>,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let counted = blocking(state.service(), |service| service.count()).await;
    let (code, status, notes) = match counted {
        Ok(notes) => (StatusCode::OK, "ok", Some(notes)),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable", None)
        }
    };

    let body = HealthResponse {
        status,
        engine: state.service().engine().as_str(),
        listen: state.config().bind_target(),
        notes,
    };
    (code, Json(body))
}

/// Build health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
