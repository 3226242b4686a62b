//! Error taxonomy shared by the store, the command builder and the session layer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SshyaError>;

#[derive(Debug, Error)]
pub enum SshyaError {
    /// A required connection field was empty after trimming.
    #[error("invalid connection: {0}")]
    Validation(String),

    #[error("Connection with alias \"{0}\" already exists.")]
    DuplicateAlias(String),

    #[error("Alias not found: {0}")]
    NotFound(String),

    #[error("failed to access {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The remote-login client could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// `run` was called while another session was spawning or running.
    #[error("a remote session is already active")]
    SessionActive,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SshyaError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}
