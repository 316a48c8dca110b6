//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// The variants follow the failure classes the menu reacts to: bad API key,
/// bad bank credentials, upstream/provider trouble, connectivity, and local
/// validation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Wrong credentials")]
    WrongCredentials,

    #[error("No active session")]
    NotLoggedIn,

    #[error("Provider error: {0}")]
    Provider(String),

    /// Request-level rejection (e.g. no account matches the requested currency)
    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a client error
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
