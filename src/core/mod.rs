//! Core module containing shared infrastructure components.
//!
//! Configuration, service document loading, error handling, the MCP
//! handler and the transport layer. Operation semantics live in
//! [`domains`](crate::domains).

pub mod config;
pub mod error;
pub mod loader;
pub mod server;
pub mod transport;

pub use config::{Config, EnvWarning};
pub use error::{Error, Result};
pub use loader::{ConfigError, load_service};
pub use server::McpServer;
pub use transport::{TransportConfig, TransportService};
