//! Engine selection and backend construction.
//!
//! Choosing an engine is a one-time configuration decision. Callers receive
//! an `Arc<dyn Backend>` and never learn which engine sits behind it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::{StoreError, StoreResult};
use crate::embedded::RedbBackend;
use crate::sqlite::SqliteBackend;

/// Available storage engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// Embedded ordered key-value store in a single file.
    #[default]
    Redb,
    /// Single-file relational store.
    Sqlite,
}

impl Engine {
    /// Stable lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::Sqlite => "sqlite",
        }
    }

    /// File name used for the store when no explicit path is configured.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Self::Redb => "notes.db",
            Self::Sqlite => "notes.sqlite",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = ParseEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" | "kv" | "embedded" => Ok(Self::Redb),
            "sqlite" | "sqlite3" | "sql" => Ok(Self::Sqlite),
            other => Err(ParseEngineError(other.to_string())),
        }
    }
}

/// Unknown engine name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown storage engine `{0}`; expected redb|sqlite")]
pub struct ParseEngineError(pub String);

/// Configuration for opening a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Which engine to open.
    pub engine: Engine,
    /// Where the engine keeps its data.
    pub path: PathBuf,
}

impl StoreConfig {
    /// Create a configuration for `engine` at `path`.
    pub fn new(engine: Engine, path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            path: path.into(),
        }
    }

    /// Configuration for `engine` with its default file name inside `dir`.
    pub fn in_dir(engine: Engine, dir: &Path) -> Self {
        Self::new(engine, dir.join(engine.default_file_name()))
    }
}

/// Open the configured backend.
///
/// Creates the parent directory of the store path when it is missing.
pub fn open(config: &StoreConfig) -> StoreResult<Arc<dyn Backend>> {
    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Open {
            engine: config.engine.as_str(),
            path: config.path.clone(),
            message: format!("cannot create directory '{}': {e}", parent.display()),
        })?;
    }

    tracing::info!(engine = %config.engine, path = %config.path.display(), "Opening note store");

    let backend: Arc<dyn Backend> = match config.engine {
        Engine::Redb => Arc::new(RedbBackend::open(&config.path)?),
        Engine::Sqlite => Arc::new(SqliteBackend::open(&config.path)?),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_default_is_redb() {
        assert_eq!(Engine::default(), Engine::Redb);
    }

    #[test]
    fn test_engine_parse() {
        assert_eq!("REDB".parse::<Engine>().unwrap(), Engine::Redb);
        assert_eq!(" sqlite ".parse::<Engine>().unwrap(), Engine::Sqlite);
        assert!("bolt".parse::<Engine>().is_err());
    }

    #[test]
    fn test_engine_display_roundtrip() {
        for engine in [Engine::Redb, Engine::Sqlite] {
            assert_eq!(engine.to_string().parse::<Engine>().unwrap(), engine);
        }
    }

    #[test]
    fn test_config_in_dir_uses_engine_file_name() {
        let config = StoreConfig::in_dir(Engine::Sqlite, Path::new("/tmp/notable"));
        assert_eq!(config.path, PathBuf::from("/tmp/notable/notes.sqlite"));
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(Engine::Sqlite, dir.path().join("nested/notes.sqlite"));
        let backend = open(&config).unwrap();
        assert_eq!(backend.engine(), Engine::Sqlite);
        assert!(dir.path().join("nested").is_dir());
        backend.close().unwrap();
    }
}
