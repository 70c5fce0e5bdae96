//! Error types for the vial_core library.
//!
//! The ledger and the dosing math never fail; these errors come from
//! persistence, configuration and input validation.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vial_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ledger store error
    #[error("State error: {0}")]
    State(String),

    /// User input rejected before reaching the ledger
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
