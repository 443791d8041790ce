//! Error types for mk

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MkError {
    #[error("{0}: invalid format")]
    Parse(String),

    #[error("No such command: {0}")]
    UnknownCommand(String),

    #[error("No such {kind}: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Not yet implemented: {0}")]
    NotImplemented(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{name}: {status}")]
    Process {
        name: String,
        status: std::process::ExitStatus,
    },

    #[error("Can't allocate anymore children in {0}")]
    Allocation(String),

    #[error("Random source unavailable: {0}")]
    Entropy(String),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Engine error: {0}")]
    Engine(String),
}

impl MkError {
    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        MkError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MkError>;
