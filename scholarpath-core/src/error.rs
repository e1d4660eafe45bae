//! Error types for the ScholarPath core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the backend client and the configuration system. Flow state
//! machines never surface these to the user directly; they convert them to
//! generic retry-style messages and keep the detail for logs.

/// Errors from talking to the research backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Could not read document: {message}")]
    Io { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },

    #[error("Could not write {path}: {message}")]
    Write { path: String, message: String },
}
