//! Custom error types for the relay.
//!
//! This module defines the primary error type, `RelayError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of errors that can occur, from
//! request validation to sink I/O.
//!
//! ## Error Hierarchy
//!
//! - **`Validation`**: A required field is missing or malformed. Raised at the
//!   boundary before any shared state is touched; mapped to `400` by the HTTP
//!   layer. Never retried.
//! - **`Storage`**: Counter or ledger I/O failed. The CSV row ledger is the
//!   canonical record, so a storage failure there fails the whole save; mapped
//!   to `500`. Mirror-sink failures never surface as this variant; they are
//!   logged and swallowed by the ledger.
//! - **`Config` / `Configuration`**: Parsing versus semantic configuration
//!   problems. Both abort startup.
//! - **`Io`**: Wrapped lower-level I/O causes, convertible with `?` via
//!   `#[from]`.
//!
//! A device that has never reported is deliberately *not* an error anywhere in
//! the crate: queries for it return an empty snapshot.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, RelayError>;

#[derive(Error, Debug)]
pub enum RelayError {
    /// Missing or malformed required field, rejected before any mutation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Counter or ledger I/O failure, surfaced to the caller as a failed save.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// The message a caller should see, without the variant prefix.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::Validation(msg) | RelayError::Storage(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
