//! Per-invocation context handed to operation bodies.

use std::sync::Arc;

use rmcp::{
    Peer, RoleServer,
    model::{ProgressNotificationParam, ProgressToken},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Sink for progress updates emitted by a running operation.
#[async_trait::async_trait]
pub trait ProgressReporter: Send + Sync {
    /// Report that `progress` out of an optional `total` units are done.
    async fn report(&self, progress: f64, total: Option<f64>, message: Option<String>);
}

/// Forwards progress to the MCP client that issued the request.
pub struct PeerProgress {
    peer: Peer<RoleServer>,
    token: ProgressToken,
}

impl PeerProgress {
    /// Create a reporter bound to the client's progress token.
    pub fn new(peer: Peer<RoleServer>, token: ProgressToken) -> Self {
        Self { peer, token }
    }
}

#[async_trait::async_trait]
impl ProgressReporter for PeerProgress {
    async fn report(&self, progress: f64, total: Option<f64>, message: Option<String>) {
        let param = ProgressNotificationParam {
            progress_token: self.token.clone(),
            progress,
            total,
            message,
        };
        if let Err(e) = self.peer.notify_progress(param).await {
            warn!("Failed to send progress notification: {}", e);
        }
    }
}

/// Context available to an operation while it runs.
///
/// The cancellation token fires when the invocation's deadline expires or
/// the dispatcher shuts down. Long-running bodies should check it between
/// units of work; bodies that never yield cannot be stopped.
#[derive(Clone)]
pub struct OperationContext {
    qualified_name: Arc<str>,
    cancellation: CancellationToken,
    progress: Option<Arc<dyn ProgressReporter>>,
}

impl OperationContext {
    pub(crate) fn new(
        qualified_name: Arc<str>,
        cancellation: CancellationToken,
        progress: Option<Arc<dyn ProgressReporter>>,
    ) -> Self {
        Self {
            qualified_name,
            cancellation,
            progress,
        }
    }

    /// A detached context, for calling operation bodies directly in tests.
    pub fn detached(qualified_name: &str) -> Self {
        Self::new(qualified_name.into(), CancellationToken::new(), None)
    }

    /// Attach a progress reporter.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The `<group>.<operation>` name being executed.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Token cancelled when the invocation is abandoned.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the invocation has been abandoned.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Log an informational message tagged with the operation name.
    pub fn info(&self, message: impl AsRef<str>) {
        info!(operation = %self.qualified_name, "{}", message.as_ref());
    }

    /// Report progress to the client, if it asked for updates.
    pub async fn report_progress(&self, progress: f64, total: Option<f64>) {
        match &self.progress {
            Some(reporter) => reporter.report(progress, total, None).await,
            None => tracing::debug!(
                operation = %self.qualified_name,
                progress,
                total,
                "Progress"
            ),
        }
    }
}

impl std::fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationContext")
            .field("qualified_name", &self.qualified_name)
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
