//! STDIO transport implementation.
//!
//! Standard input/output transport for MCP - the default and recommended mode.

use rmcp::ServiceExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{TransportError, TransportResult};
use crate::core::McpServer;

/// STDIO transport handler.
pub struct StdioTransport;

impl StdioTransport {
    /// Serve a single session over stdin/stdout until the client closes the
    /// stream or `shutdown` fires.
    pub async fn run(server: McpServer, shutdown: CancellationToken) -> TransportResult<()> {
        info!(
            "Ready - serving {} operations via stdin/stdout",
            server.dispatcher().len()
        );

        let service = server
            .serve_with_ct(rmcp::transport::stdio(), shutdown.child_token())
            .await
            .map_err(|e| TransportError::init(e.to_string()))?;

        let reason = service
            .waiting()
            .await
            .map_err(|e| TransportError::ServiceError(e.to_string()))?;

        info!("STDIO transport finished: {:?}", reason);
        Ok(())
    }
}
