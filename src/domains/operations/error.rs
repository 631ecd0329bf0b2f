//! Operation-specific error types.
//!
//! Two families live here. [`LoadError`] covers structural problems found
//! while building the dispatch table; these are fatal and abort startup.
//! [`DispatchError`] covers everything that can go wrong with a single
//! invocation; these are returned to the caller and never affect other
//! invocations.

use std::time::Duration;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use thiserror::Error;

/// Errors raised while loading groups into a dispatcher.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A group's settings were missing, malformed, or rejected by the group.
    #[error("Configuration error in group '{group}': {message}")]
    Configuration { group: String, message: String },

    /// Two operations resolved to the same qualified name.
    #[error("Duplicate operation: {qualified_name}")]
    DuplicateOperation { qualified_name: String },

    /// A group entry references a kind that no catalog entry provides.
    #[error("Unknown group '{group_id}': no group type registered for kind '{kind}'")]
    UnknownGroup { group_id: String, kind: String },
}

impl LoadError {
    /// Create a new configuration error for the given group.
    pub fn configuration(group: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            group: group.into(),
            message: message.into(),
        }
    }

    /// Create a new duplicate operation error.
    pub fn duplicate(qualified_name: impl Into<String>) -> Self {
        Self::DuplicateOperation {
            qualified_name: qualified_name.into(),
        }
    }
}

/// Errors produced by a single invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No operation is registered under the requested qualified name.
    #[error("Operation not found: {0}")]
    NotFound(String),

    /// The arguments did not match the operation's input schema.
    #[error("Invalid arguments for '{operation}': {message}")]
    InvalidArguments { operation: String, message: String },

    /// The invocation exceeded its deadline and was abandoned.
    #[error("Execution timeout: '{operation}' did not finish within {:.3}s", .timeout.as_secs_f64())]
    Timeout { operation: String, timeout: Duration },

    /// The operation body returned an error or panicked.
    #[error("Operation '{operation}' failed: {message}")]
    OperationFailed { operation: String, message: String },

    /// The dispatcher is shutting down and no longer accepts work.
    #[error("Dispatcher is shutting down, '{0}' was not started")]
    ShuttingDown(String),
}

impl DispatchError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a new "operation failed" error.
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether the caller sent a request that can never succeed as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidArguments { .. })
    }

    /// Whether the invocation was abandoned because of its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Convert into the shape the MCP transport answers with.
    ///
    /// Client errors become protocol errors; execution failures become a
    /// tool result flagged with `isError` so the caller can still read the
    /// message.
    pub fn into_tool_response(self) -> Result<CallToolResult, McpError> {
        if self.is_client_error() {
            Err(McpError::invalid_params(self.to_string(), None))
        } else {
            Ok(CallToolResult::error(vec![Content::text(self.to_string())]))
        }
    }
}
