//! Error types for the storage-engine layer

use thiserror::Error;

/// Result type for storage-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by engines, handlers and coordinators.
///
/// Every variant is a machine-checkable kind; the display string is the
/// human-readable side of the contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The engine does not implement the requested operation.
    #[error("Engine '{engine}' does not support {operation}")]
    Unsupported {
        engine: String,
        operation: &'static str,
    },

    /// Malformed request input: bad iterator type, incompatible key, etc.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A named collaborator (index, engine, space, checkpoint) is absent.
    #[error("No such {what}: {name}")]
    NotFound { what: &'static str, name: String },

    /// A checkpoint attempt is already in flight process-wide.
    #[error("Checkpoint already in progress")]
    AlreadyInProgress,

    /// An engine hook returned failure.
    #[error("Engine '{engine}' failed: {message}")]
    EngineFailure { engine: String, message: String },
}

impl Error {
    pub fn unsupported(engine: &str, operation: &'static str) -> Self {
        Error::Unsupported {
            engine: engine.to_string(),
            operation,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Error::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn no_such_index(id: impl std::fmt::Display) -> Self {
        Error::not_found("index", id.to_string())
    }

    pub fn no_such_engine(name: &str) -> Self {
        Error::not_found("engine", name)
    }

    pub fn engine_failure(engine: &str, message: impl Into<String>) -> Self {
        Error::EngineFailure {
            engine: engine.to_string(),
            message: message.into(),
        }
    }
}
