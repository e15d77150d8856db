//! Restart coordination.
//!
//! A restart request travels through a single-slot channel from any handler
//! holding a [`RestartHandle`] to the serving loop, which owns the
//! [`RestartCoordinator`]. The serving loop stops accepting connections,
//! closes storage, launches a replacement from the captured [`ProcessArgs`]
//! and returns.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};

/// A pending restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartRequest {
    /// Free-form reason, logged when the restart is carried out.
    pub reason: String,
    /// When the request was accepted.
    pub requested_at: DateTime<Utc>,
}

/// Restart request errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RestartError {
    /// Another restart is already queued.
    #[error("a restart is already pending")]
    AlreadyPending,

    /// The serving loop is gone.
    #[error("restart coordinator is no longer running")]
    Closed,
}

/// Receiving side, owned by the serving loop.
#[derive(Debug)]
pub struct RestartCoordinator {
    rx: mpsc::Receiver<RestartRequest>,
}

/// Sending side, shared with request handlers.
#[derive(Debug, Clone)]
pub struct RestartHandle {
    tx: mpsc::Sender<RestartRequest>,
}

impl RestartCoordinator {
    /// Creates a coordinator and its first handle.
    pub fn new() -> (Self, RestartHandle) {
        let (tx, rx) = mpsc::channel(1);
        (Self { rx }, RestartHandle { tx })
    }

    /// Waits for the next restart request.
    ///
    /// Never resolves once every handle has been dropped.
    pub async fn wait(&mut self) -> RestartRequest {
        match self.rx.recv().await {
            Some(request) => request,
            None => std::future::pending().await,
        }
    }
}

impl RestartHandle {
    /// Queues a restart without waiting.
    pub fn request(&self, reason: impl Into<String>) -> Result<(), RestartError> {
        let request = RestartRequest {
            reason: reason.into(),
            requested_at: Utc::now(),
        };
        self.tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => RestartError::AlreadyPending,
            TrySendError::Closed(_) => RestartError::Closed,
        })
    }
}

/// Executable and arguments used to launch a replacement process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessArgs {
    /// Executable path.
    pub program: PathBuf,
    /// Arguments, excluding the program name.
    pub args: Vec<OsString>,
}

impl ProcessArgs {
    pub fn new(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Captures the invocation of this process.
    ///
    /// The program comes from `argv[0]`, resolved against the current
    /// directory now, so a binary replaced in place is picked up on restart.
    /// `current_exe` names the unlinked old image in that case and is only
    /// consulted when `argv[0]` is missing.
    pub fn capture() -> io::Result<Self> {
        let mut argv = std::env::args_os();
        let program = match program_path(argv.next(), &std::env::current_dir()?) {
            Some(program) => program,
            None => std::env::current_exe()?,
        };
        Ok(Self {
            program,
            args: argv.collect(),
        })
    }

    /// Launches the replacement and returns its pid once the spawn succeeded.
    ///
    /// Standard streams are inherited. The child is not awaited.
    pub fn spawn(&self) -> io::Result<u32> {
        let child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .spawn()?;
        child
            .id()
            .ok_or_else(|| io::Error::other("replacement exited before its pid was read"))
    }
}

/// Resolve `argv[0]` into something `Command` can launch later.
///
/// Bare names stay as they are and go through `PATH` lookup, like a shell.
fn program_path(argv0: Option<OsString>, cwd: &Path) -> Option<PathBuf> {
    let program = PathBuf::from(argv0.filter(|arg| !arg.is_empty())?);
    if program.is_absolute() || program.components().count() == 1 {
        Some(program)
    } else {
        Some(cwd.join(program))
    }
}
