//! Error types and result handling for dbtuner.
//!
//! This module defines the core error type [`Error`] used throughout the crate, as well as the [`Result`] alias for fallible operations.
//!
//! ## What
//!
//! - [`Error`] enumerates the failures an archival run can hit: a missing environment, a connection that could not be opened, or a script that failed on the server.
//! - [`Result<T>`] is a convenient alias for `Result<T, Error>`.
//!
//! ## How
//!
//! Most crate APIs return [`Result<T>`]. The binary converts the final error into an exit status.
//!
//! ### Example
//!
//! ```rust
//! use dbtuner::error::{Error, Result};
//! use dbtuner::config::Context;
//!
//! fn lookup() -> Result<()> {
//!     Err(Error::ConfigurationMissing { context: Context::Prod })
//! }
//! assert!(lookup().is_err());
//! ```
use crate::config::Context;
use thiserror::Error;

/// Result type for dbtuner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error type for heterogeneous error sources
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for dbtuner operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested environment has no entry in the registry
    #[error("No configuration registered for environment '{context}'")]
    ConfigurationMissing { context: Context },

    /// A registry entry holds a value that cannot be used
    #[error("Invalid configuration value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// Authentication or network failure while opening a session
    #[error("Database connection failed: {source}. Context: {context}")]
    ConnectionFailed { source: BoxError, context: String },

    /// The archival script failed on the server
    #[error("Archive execution failed: {source}. Context: {context}")]
    ExecutionFailed { source: BoxError, context: String },

    /// Error reported by the SQL Server driver
    #[error("Database error: {0}")]
    Database(#[from] tiberius::error::Error),

    /// Reading or writing operator output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Command-line arguments could not be interpreted
    #[error("Argument error: {0}")]
    Cli(#[from] clap::Error),

    /// Dispatch reached a sub-command that is not registered
    #[error("Unknown sub-command '{name}'")]
    UnknownCommand { name: String },
}
