//! Error taxonomy shared across the TCM assistant crates

use thiserror::Error;

/// Result type used throughout the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the stores, providers, and chat engine
#[derive(Debug, Error)]
pub enum Error {
    /// A chunk id present in one store is missing from another.
    /// Indicates the persisted snapshot lost its 1:1 id correspondence.
    #[error("chunk not found: {0}")]
    NotFound(String),

    /// A persisted index failed structural validation on load.
    /// Fatal: the snapshot must not be served.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// A remote model call failed. `status` is the HTTP status code,
    /// or 0 when the request never produced a response (transport error,
    /// timeout).
    #[error("provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    /// No chunk scored above the configured similarity floor.
    #[error("no relevant chunks found for query")]
    EmptyResult,

    /// Missing or invalid configuration (environment variables, paths).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failed to serialize or deserialize a persisted artifact or wire body.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem failure while reading or writing snapshot artifacts.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether retrying the same call may succeed.
    ///
    /// Only transport-level provider failures qualify: no response at all
    /// (status 0) or a server-side 5xx. Authentication (401/403), quota
    /// (429), and other client errors are permanent for the current
    /// request and must be surfaced instead.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Provider { status, .. } => *status == 0 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Short machine-readable kind tag, used by the structured turn result
    /// the chat engine hands to its caller.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::CorruptIndex(_) => "corrupt_index",
            Error::Provider { .. } => "provider_error",
            Error::EmptyResult => "empty_result",
            Error::Configuration(_) => "configuration_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_server_errors_are_retryable() {
        assert!(Error::Provider { status: 0, message: "timeout".into() }.is_retryable());
        assert!(Error::Provider { status: 503, message: "overloaded".into() }.is_retryable());
    }

    #[test]
    fn auth_and_quota_errors_are_not_retryable() {
        assert!(!Error::Provider { status: 401, message: "bad key".into() }.is_retryable());
        assert!(!Error::Provider { status: 429, message: "throttled".into() }.is_retryable());
        assert!(!Error::NotFound("c1".into()).is_retryable());
    }
}
