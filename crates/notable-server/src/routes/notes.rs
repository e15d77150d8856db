//! Note routes.
//!
//! - GET /api/notes/list?q= - Search notes, most recently modified first
//! - POST /api/note/create - Create a note from the raw request body
//! - GET|POST /api/note/{uid} - Fetch a note
//! - GET|POST /api/note/content/{uid} - Fetch a note
//! - PUT /api/note/{uid} - Replace a note's content with the raw request body
//! - DELETE /api/note/{uid} - Delete a note
//!
//! Backend calls are synchronous and run on the blocking pool.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use notable_core::{Note, NoteId, SearchResults};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::service::{NoteService, ServiceResult};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /api/notes/list.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Search text; absent or empty lists every note.
    #[serde(default)]
    pub q: String,
}

/// Query parameters for POST /api/note/create.
#[derive(Debug, Default, Deserialize)]
pub struct CreateParams {
    /// Caller-chosen uid.
    pub uid: Option<String>,
}

/// Response for POST /api/note/create.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub uid: NoteId,
}

// ============================================================================
// Handlers
// ============================================================================

/// Runs a service call on the blocking pool.
pub(crate) async fn blocking<T, F>(service: &NoteService, call: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(NoteService) -> ServiceResult<T> + Send + 'static,
{
    let service = service.clone();
    tokio::task::spawn_blocking(move || call(service))
        .await
        .map_err(|e| ApiError::Internal(format!("storage task failed: {e}")))?
        .map_err(ApiError::from)
}

/// GET /api/notes/list
async fn list_notes(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<SearchResults>> {
    let results = blocking(state.service(), move |s| s.search(&params.q)).await?;
    tracing::debug!(hits = results.len(), "search complete");
    Ok(Json(results))
}

/// POST /api/note/create
async fn create_note(
    State(state): State<AppState>,
    Query(params): Query<CreateParams>,
    body: String,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let uid = blocking(state.service(), move |s| s.create(&body, params.uid.as_deref())).await?;
    tracing::info!(%uid, "note created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { uid })))
}

/// GET|POST /api/note/{uid}
async fn get_note(State(state): State<AppState>, Path(uid): Path<String>) -> ApiResult<Json<Note>> {
    let note = blocking(state.service(), move |s| s.read(&uid)).await?;
    Ok(Json(note))
}

/// PUT /api/note/{uid}
async fn update_note(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    body: String,
) -> ApiResult<StatusCode> {
    let logged = uid.clone();
    blocking(state.service(), move |s| s.update(&uid, &body)).await?;
    tracing::info!(uid = %logged, "note updated");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/note/{uid}
async fn delete_note(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<StatusCode> {
    let logged = uid.clone();
    blocking(state.service(), move |s| s.delete(&uid)).await?;
    tracing::info!(uid = %logged, "note deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Build note routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/notes/list", get(list_notes))
        .route("/api/note/create", post(create_note))
        .route(
            "/api/note/{uid}",
            get(get_note)
                .post(get_note)
                .put(update_note)
                .delete(delete_note),
        )
        .route("/api/note/content/{uid}", get(get_note).post(get_note))
}
