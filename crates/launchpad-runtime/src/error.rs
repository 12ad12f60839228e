//! Runtime error types.

use launchpad_core::LaunchError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Resolution or lifecycle error.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// Settings or persistence error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing command output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid command-line usage.
    #[error("{0}")]
    Cli(String),
}

impl RuntimeError {
    /// Creates a command-line usage error.
    pub fn cli(message: impl Into<String>) -> Self {
        Self::Cli(message.into())
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
