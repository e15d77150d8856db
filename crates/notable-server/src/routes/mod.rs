//! Route definitions for the HTTP API.

pub mod health;
pub mod notes;
pub mod process;
pub mod restart;

use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::middleware::no_cache;
use crate::middleware::request_id::{propagate_request_id, request_id_layer};
use crate::state::AppState;

/// Build the complete router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(process::routes())
        .merge(notes::routes())
        .merge(restart::routes())
        .with_state(state)
}

/// Build the router wrapped in the middleware stack.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
        .layer(middleware::from_fn(no_cache))
        .layer(middleware::from_fn(propagate_request_id))
        .layer(request_id_layer())
        .layer(TraceLayer::new_for_http())
}
