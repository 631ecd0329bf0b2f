//! Error types and handling for the MCP server.
//!
//! Each layer defines its own error enum; this module wraps them in a
//! single type for the binary. Per-call failures never reach it: the
//! handler turns them into tool results.

use std::path::PathBuf;

use thiserror::Error;

use super::loader::ConfigError;
use super::transport::TransportError;
use crate::domains::operations::LoadError;

/// A specialized Result type for MCP server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the MCP server.
#[derive(Debug, Error)]
pub enum Error {
    /// The service could not be built from its configuration.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// The service document could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transport failed to start or ended abnormally.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Neither the command line nor the environment names a document.
    #[error("No service document given (pass a path or set MCP_SERVICE_CONFIG)")]
    MissingDocument,

    /// The group selected on the command line is not in the document.
    #[error("Group '{group}' not found in {}", .path.display())]
    GroupNotFound { group: String, path: PathBuf },

    /// A command-line value was rejected.
    #[error("Invalid --{flag}: {value}")]
    InvalidArgument { flag: &'static str, value: String },
}

impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument(flag: &'static str, value: impl ToString) -> Self {
        Self::InvalidArgument {
            flag,
            value: value.to_string(),
        }
    }

    /// Whether the error was caused by configuration rather than by the
    /// running server.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}
