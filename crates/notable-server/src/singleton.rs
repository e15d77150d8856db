//! Single-instance guard.
//!
//! Before storage is opened the configured address is probed. An instance
//! that answers `GET /pid` is left alone, or asked to restart when
//! `--restart` was given.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use tokio::net::TcpStream;

/// How long the TCP probe waits for a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// How long HTTP calls to a running instance may take.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// What the probe found on the configured address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Nothing accepted the connection.
    NotRunning,
    /// An instance answered with its pid.
    Running { pid: u32 },
    /// Something listens there, but it is not an instance of this server.
    Foreign,
}

/// What startup should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupDecision {
    /// Open storage and bind.
    StartFresh,
    /// Leave the running instance alone and exit.
    NoOpExit { pid: u32 },
    /// Ask the running instance to restart, then exit.
    SignalExistingForRestart { pid: u32 },
}

/// Maps a probe outcome and the `--restart` flag onto a startup decision.
///
/// A foreign listener still yields `StartFresh`; the bind reports the clash.
pub fn decide(outcome: ProbeOutcome, restart_requested: bool) -> StartupDecision {
    match (outcome, restart_requested) {
        (ProbeOutcome::Running { pid }, false) => StartupDecision::NoOpExit { pid },
        (ProbeOutcome::Running { pid }, true) => StartupDecision::SignalExistingForRestart { pid },
        (ProbeOutcome::NotRunning | ProbeOutcome::Foreign, _) => StartupDecision::StartFresh,
    }
}

/// Probes `target` (`host:port`) for a running instance.
pub async fn probe(target: &str) -> ProbeOutcome {
    match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(target)).await {
        Ok(Ok(_stream)) => {}
        Ok(Err(e)) => {
            tracing::debug!(%target, error = %e, "probe connect failed");
            return ProbeOutcome::NotRunning;
        }
        Err(_) => {
            tracing::debug!(%target, "probe connect timed out");
            return ProbeOutcome::NotRunning;
        }
    }

    match fetch_pid(&format!("http://{target}/pid")).await {
        Some(pid) => ProbeOutcome::Running { pid },
        None => {
            tracing::warn!(%target, "address is in use by something that does not report a pid");
            ProbeOutcome::Foreign
        }
    }
}

async fn fetch_pid(url: &str) -> Option<u32> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .ok()?;
    let response = client.get(url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.text().await.ok()?.trim().parse().ok()
}

/// Errors from asking a running instance to restart.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The request could not be delivered.
    #[error("restart request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The instance answered with an unexpected status.
    #[error("running instance refused restart: HTTP {0}")]
    Rejected(StatusCode),
}

#[derive(Debug, Serialize)]
struct RestartBody<'a> {
    reason: &'a str,
}

/// Sends `PUT /api/restart` to the instance at `base_url`.
///
/// A restart that is already pending counts as delivered.
pub async fn signal_restart(base_url: &str, reason: &str) -> Result<(), SignalError> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let response = client
        .put(format!("{base_url}/api/restart"))
        .json(&RestartBody { reason })
        .send()
        .await?;

    match response.status() {
        StatusCode::ACCEPTED => Ok(()),
        StatusCode::CONFLICT => {
            tracing::info!("running instance already has a restart pending");
            Ok(())
        }
        status => Err(SignalError::Rejected(status)),
    }
}
