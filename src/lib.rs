//! Group MCP Server Library
//!
//! Exposes configured groups of operations as MCP tools. A service document
//! lists groups; each group is instantiated from a registered type and its
//! operations become tools named `<group_id>.<operation>`. Every call runs
//! under its own deadline, and failures are reported per call.
//!
//! # Architecture
//!
//! - **core**: configuration, document loading, errors, the MCP handler and
//!   transports
//! - **domains**: business logic
//!   - **operations**: operation marker, group catalog and dispatcher
//!   - **groups**: bundled service groups
//!
//! # Example
//!
//! ```rust,no_run
//! use group_mcp_server::core::{Config, McpServer, TransportService};
//! use group_mcp_server::domains::groups::builtin_catalog;
//! use group_mcp_server::domains::operations::{Dispatcher, GroupConfig, ServiceConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let service = ServiceConfig::new("demo").with_group(GroupConfig::new("math"));
//!     let dispatcher = Dispatcher::load(&builtin_catalog(), &service, config.dispatch.options())?;
//!
//!     let transport = TransportService::new(config.transport.clone());
//!     transport
//!         .run(McpServer::new(config, dispatcher), CancellationToken::new())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
pub use domains::operations::{Dispatcher, GroupCatalog, Operation, OperationContext, ServiceGroup};
