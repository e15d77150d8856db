//! PUT /api/restart - Queue a restart of this process.

use axum::{Json, Router, extract::State, http::StatusCode, routing::put};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

/// Request body for PUT /api/restart.
#[derive(Debug, Default, Deserialize)]
pub struct RestartRequestBody {
    #[serde(default)]
    pub reason: String,
}

/// Response for an accepted restart.
#[derive(Debug, Serialize)]
pub struct RestartAccepted {
    pub status: &'static str,
}

async fn request_restart(
    State(state): State<AppState>,
    Json(body): Json<RestartRequestBody>,
) -> ApiResult<(StatusCode, Json<RestartAccepted>)> {
    let reason = match body.reason.trim() {
        "" => "unspecified".to_string(),
        reason => reason.to_string(),
    };
    state.restart().request(reason.clone())?;
    tracing::info!(%reason, "restart requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(RestartAccepted {
            status: "restarting",
        }),
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/restart", put(request_restart))
}
