//! Error types for PAGI Ballot.
//!
//! Monitoring never surfaces errors to its callers (a misfiring heuristic only ever
//! produces a `Violation`). These types cover persistence, configuration, the auth
//! API transport, and the user-facing session failures.

use thiserror::Error;

/// Persistence failures from a `KeyValueStore`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Stored value is not valid UTF-8 under key {0}")]
    Encoding(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures talking to the remote auth endpoints.
#[derive(Error, Debug)]
pub enum AuthApiError {
    /// The request never produced a response (DNS, refused connection, timeout).
    #[error("Auth request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status. `message` is the server's
    /// `{message}` field when it sent one.
    #[error("Auth endpoint returned {status}")]
    Rejected { status: u16, message: Option<String> },

    #[error("Auth response could not be decoded: {0}")]
    Decode(String),
}

/// User-facing session failures. `Display` is the readable message shown to the voter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Bad credentials, bad OTP, or any other rejection by the server.
    #[error("{0}")]
    Rejected(String),

    /// Transport failure; the message suggests retrying.
    #[error("{0}")]
    Network(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Failures assembling a `BallotRuntime` from configuration.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open ballot storage: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build auth client: {0}")]
    AuthClient(#[from] AuthApiError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Storage(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type SessionResult<T> = Result<T, SessionError>;
