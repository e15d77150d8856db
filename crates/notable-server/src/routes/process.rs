//! Process identity routes.
//!
//! `GET /pid` is what the single-instance guard of a starting process reads
//! to recognise a running instance.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Response for GET /api/version.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub engine: &'static str,
    pub booted: DateTime<Utc>,
}

/// GET /pid - Process id as plain text.
async fn pid() -> String {
    std::process::id().to_string()
}

/// GET /api/version
async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        engine: state.service().engine().as_str(),
        booted: state.booted(),
    })
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pid", get(pid))
        .route("/api/version", get(version))
}
