//! Process lifecycle: guard, open storage, bind, serve, restart.

use std::future::{Future, IntoFuture};
use std::io;

use notable_store::StoreError;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::{ConfigError, ServerConfig};
use crate::restart::{ProcessArgs, RestartCoordinator};
use crate::routes;
use crate::service::NoteService;
use crate::singleton::{self, SignalError, StartupDecision};
use crate::state::AppState;

/// How a call to [`run`] or [`serve`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// Another instance already serves the address.
    AlreadyRunning { pid: u32 },
    /// The running instance was asked to restart.
    RestartSignalled { pid: u32 },
    /// This process stopped serving and launched its replacement.
    Restarted { replacement_pid: u32 },
    /// Stopped by a shutdown signal.
    Shutdown,
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    /// The accept loop failed.
    #[error("server I/O error: {0}")]
    Io(#[from] io::Error),

    /// The replacement process could not be launched.
    #[error("failed to spawn replacement process: {0}")]
    Spawn(#[source] io::Error),
}

/// Runs the full startup sequence and serves until shutdown or restart.
pub async fn run(config: ServerConfig, argv: ProcessArgs) -> Result<ServeOutcome, ServerError> {
    let target = config.bind_target();

    let outcome = singleton::probe(&target).await;
    let decision = singleton::decide(outcome, config.restart);
    tracing::info!(?outcome, ?decision, %target, "startup probe");

    match decision {
        StartupDecision::NoOpExit { pid } => {
            tracing::info!(pid, "already running; pass --restart to replace it");
            return Ok(ServeOutcome::AlreadyRunning { pid });
        }
        StartupDecision::SignalExistingForRestart { pid } => {
            let reason = format!("replacement requested by pid {}", std::process::id());
            singleton::signal_restart(&config.base_url(), &reason).await?;
            tracing::info!(pid, "asked running instance to restart");
            return Ok(ServeOutcome::RestartSignalled { pid });
        }
        StartupDecision::StartFresh => {}
    }

    let store_config = config.store_config()?;
    let backend = tokio::task::spawn_blocking(move || notable_store::open(&store_config))
        .await
        .map_err(io::Error::other)??;
    match backend.count() {
        Ok(count) => tracing::info!(engine = %backend.engine(), count, "store ready"),
        Err(e) => tracing::warn!(error = %e, "could not count notes"),
    }
    let service = NoteService::new(backend);

    let listener = match TcpListener::bind(&target).await {
        Ok(listener) => listener,
        Err(source) => {
            close_service(&service).await;
            return Err(ServerError::Bind {
                addr: target,
                source,
            });
        }
    };
    tracing::info!(addr = %target, pid = std::process::id(), "listening");

    let (coordinator, handle) = RestartCoordinator::new();
    let state = AppState::new(service, handle, config);
    serve(listener, state, coordinator, argv).await
}

/// Serves until Ctrl-C/SIGTERM or a restart request.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    coordinator: RestartCoordinator,
    argv: ProcessArgs,
) -> Result<ServeOutcome, ServerError> {
    serve_until(listener, state, coordinator, argv, shutdown_signal()).await
}

/// Like [`serve`], with a caller-provided shutdown trigger.
pub async fn serve_until<S>(
    listener: TcpListener,
    state: AppState,
    mut coordinator: RestartCoordinator,
    argv: ProcessArgs,
    shutdown: S,
) -> Result<ServeOutcome, ServerError>
where
    S: Future<Output = ()> + Send + 'static,
{
    let service = state.service().clone();
    let app = routes::build_app(state);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .into_future();

    tokio::select! {
        result = server => {
            result?;
            close_service(&service).await;
            tracing::info!("server shutdown complete");
            Ok(ServeOutcome::Shutdown)
        }
        request = coordinator.wait() => {
            // The serve future, and with it the listener, is dropped here.
            tracing::warn!(
                reason = %request.reason,
                requested_at = %request.requested_at,
                "restart requested"
            );
            close_service(&service).await;
            let replacement_pid = argv.spawn().map_err(|e| {
                tracing::error!(
                    error = %e,
                    program = %argv.program.display(),
                    "replacement failed to start"
                );
                ServerError::Spawn(e)
            })?;
            tracing::info!(replacement_pid, "replacement started");
            Ok(ServeOutcome::Restarted { replacement_pid })
        }
    }
}

async fn close_service(service: &NoteService) {
    let service = service.clone();
    match tokio::task::spawn_blocking(move || service.close()).await {
        Ok(Ok(())) => tracing::info!("store closed"),
        Ok(Err(e)) => tracing::error!(error = %e, "closing store failed"),
        Err(e) => tracing::error!(error = %e, "closing store panicked"),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
