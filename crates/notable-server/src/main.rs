//! Entry point for the notable binary.

use std::process::ExitCode;

use clap::Parser;
use notable_server::{ProcessArgs, ServeOutcome, ServerConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Capture before clap so the replacement sees exactly what we saw
    let argv = ProcessArgs::capture();
    let config = ServerConfig::parse();

    init_tracing(&config.log_level, config.log_json);

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        return ExitCode::from(2);
    }
    let argv = match argv {
        Ok(argv) => argv,
        Err(e) => {
            tracing::error!(error = %e, "cannot determine own executable");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        engine = %config.engine,
        bind = %config.bind_target(),
        "Starting notable"
    );

    match notable_server::run(config, argv).await {
        Ok(ServeOutcome::Restarted { replacement_pid }) => {
            tracing::info!(replacement_pid, "exiting after restart");
            ExitCode::SUCCESS
        }
        Ok(outcome) => {
            tracing::info!(?outcome, "exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
