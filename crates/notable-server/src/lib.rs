//! notable-server: HTTP API and process lifecycle for Notable
//!
//! This crate provides:
//! - the [`NoteService`] validating every request before it reaches storage
//! - REST endpoints for creating, reading, updating, deleting and searching notes
//! - a single-instance guard that probes the bind address before startup
//! - a restart coordinator that replaces the running process on request
//!
//! # Architecture
//!
//! The server is built on Axum with a middleware stack for:
//! - Request tracing and logging
//! - Request ID generation
//! - `Cache-Control: no-cache` on every response
//! - JSON error responses
//!
//! # Usage
//!
//! ```rust,ignore
//! use clap::Parser;
//! use notable_server::{ProcessArgs, ServerConfig, run};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::parse();
//!     run(config, ProcessArgs::capture()?).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod restart;
pub mod routes;
pub mod server;
pub mod service;
pub mod singleton;
pub mod state;

// Re-exports for convenience
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use restart::{ProcessArgs, RestartCoordinator, RestartError, RestartHandle};
pub use server::{ServeOutcome, ServerError, run, serve, serve_until};
pub use service::{NoteService, ServiceError};
pub use state::AppState;

// Re-export dependent crates
pub use notable_core;
pub use notable_store;
