use std::path::PathBuf;
use thiserror::Error;

/// Setup-level failures: the session cannot be opened or queried at all
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Project root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failure to persist one file; other files in the batch are unaffected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriteError {
    #[error("Formatter failed for {path}: {message}")]
    Format { path: PathBuf, message: String },

    #[error("Failed to write {path}: {message}")]
    Io { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to create watcher: {0}")]
    Create(#[from] notify::Error),

    #[error("Already watching {0}")]
    AlreadyWatching(PathBuf),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
