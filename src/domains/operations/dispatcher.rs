//! Dispatcher - the qualified-name lookup table and invocation runtime.
//!
//! The table is built once by [`Dispatcher::load`] and is read-only
//! afterwards, so concurrent invocations read it without locking. Each
//! invocation runs as its own task under an independent deadline:
//!
//! ```text
//! PENDING -> RUNNING -> COMPLETED | TIMED_OUT | FAILED
//! ```
//!
//! Timeouts, errors and panics inside an operation are turned into a
//! [`DispatchError`] for that call only; nothing escapes to the caller's
//! task or to other invocations.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rmcp::model::{JsonObject, Tool};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::{
    sync::{CancellationToken, DropGuard},
    task::TaskTracker,
};
use tracing::{debug, info, instrument, warn};

use super::config::{ServiceConfig, SettingsPolicy};
use super::context::{OperationContext, ProgressReporter};
use super::error::{DispatchError, LoadError};
use super::group::GroupCatalog;
use super::operation::{BoundHandler, OperationMetadata, OperationOutput};

/// Deadline applied when neither the config nor the operation sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options controlling how a dispatcher is built.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Deadline for operations without an override.
    pub default_timeout: Duration,
    /// Treatment of unknown group settings.
    pub settings_policy: SettingsPolicy,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            settings_policy: SettingsPolicy::default(),
        }
    }
}

/// Lifecycle of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Pending,
    Running,
    Completed,
    TimedOut,
    Failed,
}

impl std::fmt::Display for InvocationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::TimedOut => "TIMED_OUT",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Operation Handle
// ============================================================================

/// A registered operation bound to its group instance.
#[derive(Clone)]
pub struct OperationHandle {
    qualified_name: Arc<str>,
    group_id: String,
    metadata: OperationMetadata,
    timeout: Duration,
    handler: BoundHandler,
}

impl OperationHandle {
    /// `<group_id>.<operation>`.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Id of the owning group.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Metadata declared by the operation.
    pub fn metadata(&self) -> &OperationMetadata {
        &self.metadata
    }

    /// Effective deadline for each call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Description advertised to clients.
    pub fn description(&self) -> String {
        self.metadata.description().map(str::to_string).unwrap_or_else(|| {
            format!(
                "Operation {} in group {}",
                self.metadata.name(),
                self.group_id
            )
        })
    }

    /// Tool model for protocol listings.
    pub fn to_tool(&self) -> Tool {
        let input_schema = self
            .metadata
            .schema()
            .cloned()
            .unwrap_or_else(empty_input_schema);
        Tool::new(
            self.qualified_name.to_string(),
            self.description(),
            input_schema,
        )
    }
}

impl std::fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationHandle")
            .field("qualified_name", &self.qualified_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Input schema advertised for operations that take the raw mapping.
fn empty_input_schema() -> Arc<JsonObject> {
    let mut schema = JsonObject::new();
    schema.insert("type".into(), serde_json::json!("object"));
    schema.insert("properties".into(), serde_json::json!({}));
    Arc::new(schema)
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Registry of operations for one service, and the runtime that serves
/// invocations against it.
pub struct Dispatcher {
    service_name: String,
    description: Option<String>,
    handles: Vec<OperationHandle>,
    index: HashMap<Arc<str>, usize>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("service_name", &self.service_name)
            .field("operations", &self.handles.len())
            .field("in_flight", &self.tracker.len())
            .finish()
    }
}

impl Dispatcher {
    /// Build the dispatch table for `config`.
    ///
    /// Groups are instantiated in order and their operations inserted in
    /// declaration order. Any failure discards everything built so far.
    pub fn load(
        catalog: &GroupCatalog,
        config: &ServiceConfig,
        options: DispatchOptions,
    ) -> Result<Self, LoadError> {
        info!("Loading service '{}' ({} groups)", config.name, config.groups.len());

        let mut handles = Vec::new();
        let mut index: HashMap<Arc<str>, usize> = HashMap::new();

        for group in &config.groups {
            let operations = catalog.instantiate(group, options.settings_policy)?;

            if !group.packages.is_empty() {
                info!(group = %group.group_id, "Declared packages: {}", group.packages.join(", "));
            }

            for (metadata, handler) in operations {
                let qualified_name: Arc<str> =
                    format!("{}.{}", group.group_id, metadata.name()).into();
                if index.contains_key(&qualified_name) {
                    return Err(LoadError::duplicate(qualified_name.as_ref()));
                }

                let timeout = group
                    .timeout_for(metadata.name())?
                    .or(metadata.timeout())
                    .unwrap_or(options.default_timeout);

                debug!("Registering operation: {} (timeout {:?})", qualified_name, timeout);
                index.insert(qualified_name.clone(), handles.len());
                handles.push(OperationHandle {
                    qualified_name,
                    group_id: group.group_id.clone(),
                    metadata,
                    timeout,
                    handler,
                });
            }
        }

        info!("Registered {} operations", handles.len());

        Ok(Self {
            service_name: config.name.clone(),
            description: config.description.clone(),
            handles,
            index,
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Name of the loaded service.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Description of the loaded service.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no operations are registered.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Look up an operation by qualified name.
    pub fn handle(&self, qualified_name: &str) -> Option<&OperationHandle> {
        self.index.get(qualified_name).map(|&i| &self.handles[i])
    }

    /// All operations, in load order then declaration order.
    pub fn handles(&self) -> impl Iterator<Item = &OperationHandle> {
        self.handles.iter()
    }

    /// `(qualified_name, schema)` pairs, in load order then declaration order.
    pub fn list_operations(&self) -> Vec<(&str, Option<&Arc<JsonObject>>)> {
        self.handles
            .iter()
            .map(|h| (h.qualified_name(), h.metadata.schema()))
            .collect()
    }

    /// Tool models for every registered operation.
    pub fn tools(&self) -> Vec<Tool> {
        self.handles.iter().map(OperationHandle::to_tool).collect()
    }

    /// Number of invocation tasks still alive, including abandoned ones.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Invoke an operation with no progress reporting.
    pub async fn invoke(
        &self,
        qualified_name: &str,
        arguments: JsonObject,
    ) -> Result<OperationOutput, DispatchError> {
        self.invoke_with_progress(qualified_name, arguments, None)
            .await
    }

    /// Invoke an operation, forwarding its progress updates to `progress`.
    #[instrument(skip(self, qualified_name, arguments, progress), fields(operation = %qualified_name))]
    pub async fn invoke_with_progress(
        &self,
        qualified_name: &str,
        arguments: JsonObject,
        progress: Option<Arc<dyn ProgressReporter>>,
    ) -> Result<OperationOutput, DispatchError> {
        let handle = self.handle(qualified_name).ok_or_else(|| {
            warn!("Unknown operation requested: {}", qualified_name);
            DispatchError::not_found(qualified_name)
        })?;

        if self.shutdown.is_cancelled() {
            return Err(DispatchError::ShuttingDown(qualified_name.to_string()));
        }

        debug!(state = %InvocationState::Pending, "Validating arguments");

        let cancellation = self.shutdown.child_token();
        let ctx = OperationContext::new(
            handle.qualified_name.clone(),
            cancellation.clone(),
            progress,
        );
        let fut = (handle.handler)(arguments, ctx).map_err(|message| {
            warn!(state = %InvocationState::Failed, "Invalid arguments: {}", message);
            DispatchError::invalid_arguments(qualified_name, message)
        })?;

        let abandoned = Arc::new(AtomicBool::new(false));
        let guard = AbandonGuard {
            qualified_name: handle.qualified_name.clone(),
            abandoned: abandoned.clone(),
            started: Instant::now(),
        };
        let started = guard.started;

        let mut task = InvocationTask {
            join: self.tracker.spawn(async move {
                let _guard = guard;
                fut.await
            }),
            abandoned,
            _cancel_on_drop: cancellation.drop_guard(),
        };
        debug!(state = %InvocationState::Running, timeout = ?handle.timeout, "Dispatched");

        match tokio::time::timeout(handle.timeout, &mut task.join).await {
            Ok(Ok(Ok(output))) => {
                info!(state = %InvocationState::Completed, elapsed = ?started.elapsed(), "Operation completed");
                Ok(output)
            }
            Ok(Ok(Err(e))) => {
                warn!(state = %InvocationState::Failed, elapsed = ?started.elapsed(), "Operation failed: {:#}", e);
                Err(DispatchError::failed(qualified_name, format!("{:#}", e)))
            }
            Ok(Err(join_error)) => {
                let message = join_error_message(join_error);
                warn!(state = %InvocationState::Failed, elapsed = ?started.elapsed(), "Operation aborted: {}", message);
                Err(DispatchError::failed(qualified_name, message))
            }
            Err(_) => {
                warn!(
                    state = %InvocationState::TimedOut,
                    elapsed = ?started.elapsed(),
                    "Operation exceeded its {:?} deadline, abandoning",
                    handle.timeout
                );
                Err(DispatchError::Timeout {
                    operation: qualified_name.to_string(),
                    timeout: handle.timeout,
                })
            }
        }
    }

    /// Stop accepting invocations, cancel running ones, and wait up to
    /// `grace` for their tasks to finish. Returns whether all tasks ended.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        info!("Shutting down dispatcher for '{}'", self.service_name);
        self.shutdown.cancel();
        self.tracker.close();

        let drained = tokio::time::timeout(grace, self.tracker.wait())
            .await
            .is_ok();
        if drained {
            info!("All invocations finished");
        } else {
            warn!(
                "{} invocations still running after {:?}",
                self.tracker.len(),
                grace
            );
        }
        drained
    }
}

/// A spawned invocation owned by the call awaiting it.
///
/// Dropping it before the task finishes (deadline expiry, or the caller
/// itself being dropped) cancels the operation's context and aborts the
/// task.
struct InvocationTask {
    join: JoinHandle<anyhow::Result<OperationOutput>>,
    abandoned: Arc<AtomicBool>,
    _cancel_on_drop: DropGuard,
}

impl Drop for InvocationTask {
    fn drop(&mut self) {
        if !self.join.is_finished() {
            self.abandoned.store(true, Ordering::Release);
            self.join.abort();
        }
    }
}

/// Logs when the task of an abandoned invocation is finally released.
struct AbandonGuard {
    qualified_name: Arc<str>,
    abandoned: Arc<AtomicBool>,
    started: Instant,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if self.abandoned.load(Ordering::Acquire) {
            debug!(
                operation = %self.qualified_name,
                "Abandoned invocation released after {:?}",
                self.started.elapsed()
            );
        }
    }
}

fn join_error_message(error: JoinError) -> String {
    if error.is_panic() {
        let payload = error.into_panic();
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        format!("panicked: {}", detail)
    } else {
        "cancelled".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::groups::builtin_catalog;
    use crate::domains::operations::{GroupConfig, NoSettings, Operation, ServiceGroup};

    fn args(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap_or_default()
    }

    /// Operations that misbehave in various ways.
    struct FaultyGroup;

    impl ServiceGroup for FaultyGroup {
        const KIND: &'static str = "faulty";
        type Settings = NoSettings;

        fn new(_settings: Self::Settings) -> anyhow::Result<Self> {
            Ok(Self)
        }

        fn operations() -> Vec<Operation<Self>> {
            vec![
                Operation::new("fail", |_g: Arc<Self>, _args, _ctx| async move {
                    Err::<String, _>(anyhow::anyhow!("disk on fire"))
                }),
                Operation::new("panic", |_g: Arc<Self>, _args, _ctx| async move {
                    if true {
                        panic!("boom");
                    }
                    Ok("unreachable")
                }),
                Operation::new("wait_for_cancel", |_g: Arc<Self>, _args, ctx: OperationContext| async move {
                    ctx.cancellation().cancelled().await;
                    Ok("cancelled")
                })
                .timeout(Duration::from_millis(50)),
            ]
        }
    }

    fn catalog() -> GroupCatalog {
        builtin_catalog().with::<FaultyGroup>()
    }

    fn service() -> ServiceConfig {
        ServiceConfig::new("test-service")
            .with_group(GroupConfig::new("example"))
            .with_group(GroupConfig::new("timeout"))
            .with_group(GroupConfig::new("faulty"))
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::load(&catalog(), &service(), DispatchOptions::default()).unwrap()
    }

    #[test]
    fn test_list_operations_in_load_order() {
        let dispatcher = dispatcher();
        let names: Vec<_> = dispatcher
            .list_operations()
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        assert_eq!(
            names,
            vec![
                "example.hello_world",
                "example.echo",
                "example.count_to",
                "timeout.sleep",
                "timeout.slow_counter",
                "timeout.cpu_intensive",
                "faulty.fail",
                "faulty.panic",
                "faulty.wait_for_cancel",
            ]
        );
        assert_eq!(dispatcher.len(), names.len());
    }

    #[test]
    fn test_duplicate_across_groups_fails_load() {
        let config = ServiceConfig::new("dup")
            .with_group(GroupConfig::new("example"))
            .with_group(GroupConfig::new("example"));

        let err = Dispatcher::load(&catalog(), &config, DispatchOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::DuplicateOperation { ref qualified_name } if qualified_name == "example.hello_world"
        ));
    }

    #[test]
    fn test_same_kind_under_different_ids() {
        let config = ServiceConfig::new("two")
            .with_group(GroupConfig::new("example"))
            .with_group(GroupConfig::new("example2").with_kind("example"));

        let dispatcher = Dispatcher::load(&catalog(), &config, DispatchOptions::default()).unwrap();
        assert!(dispatcher.handle("example2.echo").is_some());
        assert_eq!(dispatcher.len(), 6);
    }

    #[test]
    fn test_unknown_group_fails_load() {
        let config = ServiceConfig::new("svc").with_group(GroupConfig::new("weather"));
        let err = Dispatcher::load(&catalog(), &config, DispatchOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::UnknownGroup { .. }));
    }

    #[test]
    fn test_timeout_precedence() {
        let config = ServiceConfig::new("svc")
            .with_group(GroupConfig::new("timeout").with_timeout("sleep", Duration::from_secs(2)))
            .with_group(GroupConfig::new("faulty"));
        let options = DispatchOptions {
            default_timeout: Duration::from_secs(9),
            ..Default::default()
        };
        let dispatcher = Dispatcher::load(&catalog(), &config, options).unwrap();

        assert_eq!(
            dispatcher.handle("timeout.sleep").unwrap().timeout(),
            Duration::from_secs(2)
        );
        assert_eq!(
            dispatcher.handle("timeout.slow_counter").unwrap().timeout(),
            Duration::from_secs(9)
        );
        assert_eq!(
            dispatcher.handle("faulty.wait_for_cancel").unwrap().timeout(),
            Duration::from_millis(50)
        );
    }

    #[test]
    fn test_tools_carry_schema_and_description() {
        let dispatcher = dispatcher();
        let tools = dispatcher.tools();
        let echo = tools.iter().find(|t| t.name == "example.echo").unwrap();
        assert!(echo.input_schema.get("properties").is_some());

        let fail = tools.iter().find(|t| t.name == "faulty.fail").unwrap();
        assert_eq!(
            fail.description.as_deref(),
            Some("Operation fail in group faulty")
        );
        assert_eq!(fail.input_schema.get("type"), Some(&serde_json::json!("object")));
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let dispatcher = dispatcher();
        let output = dispatcher
            .invoke("example.echo", args(serde_json::json!({"text": "Testing"})))
            .await
            .unwrap();
        assert_eq!(output.joined_text(), "Echo: Testing");
    }

    #[tokio::test]
    async fn test_not_found() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .invoke("nonexistent.op", JsonObject::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(ref name) if name == "nonexistent.op"));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .invoke("example.echo", args(serde_json::json!({"text": 5})))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments { .. }));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_sleep_within_deadline() {
        let dispatcher = dispatcher();
        let start = Instant::now();
        let output = dispatcher
            .invoke("timeout.sleep", args(serde_json::json!({"seconds": 0.2})))
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert!(output.joined_text().contains("Slept for 0.2 seconds"));
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed <= Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_sleep_just_under_deadline_returns_result() {
        let config = ServiceConfig::new("svc").with_group(
            GroupConfig::new("timeout").with_timeout("sleep", Duration::from_millis(500)),
        );
        let dispatcher = Dispatcher::load(&catalog(), &config, DispatchOptions::default()).unwrap();

        let output = dispatcher
            .invoke("timeout.sleep", args(serde_json::json!({"seconds": 0.3})))
            .await
            .unwrap();
        assert!(output.joined_text().contains("Slept for 0.3 seconds"));
    }

    #[tokio::test]
    async fn test_sleep_past_deadline_times_out() {
        let config = ServiceConfig::new("svc").with_group(
            GroupConfig::new("timeout").with_timeout("sleep", Duration::from_millis(200)),
        );
        let dispatcher = Dispatcher::load(&catalog(), &config, DispatchOptions::default()).unwrap();

        let start = Instant::now();
        let err = dispatcher
            .invoke("timeout.sleep", args(serde_json::json!({"seconds": 1.0})))
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout());
        assert!(err.to_string().to_lowercase().contains("timeout"));
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_concurrent_invocations_overlap() {
        let dispatcher = Arc::new(dispatcher());
        let durations = [0.05, 0.1, 0.15, 0.2, 0.1];

        let start = Instant::now();
        let calls = durations.iter().map(|secs| {
            let dispatcher = dispatcher.clone();
            let arguments = args(serde_json::json!({"seconds": secs}));
            async move { dispatcher.invoke("timeout.sleep", arguments).await }
        });
        let results = futures::future::join_all(calls).await;
        let elapsed = start.elapsed();

        assert!(results.iter().all(|r| r.is_ok()));
        // Serialized execution would take 0.6s.
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(450));
    }

    #[tokio::test]
    async fn test_operation_error_is_contained() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .invoke("faulty.fail", JsonObject::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::OperationFailed { ref message, .. } if message.contains("disk on fire")));

        // The dispatcher keeps serving.
        let output = dispatcher
            .invoke("example.hello_world", JsonObject::new())
            .await
            .unwrap();
        assert_eq!(output.joined_text(), "Hello, World!");
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let dispatcher = Arc::new(dispatcher());

        let slow = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .invoke("timeout.sleep", args(serde_json::json!({"seconds": 0.1})))
                    .await
            })
        };

        let err = dispatcher
            .invoke("faulty.panic", JsonObject::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::OperationFailed { ref message, .. } if message.contains("boom")));

        let slow = slow.await.unwrap().unwrap();
        assert!(slow.joined_text().contains("Slept for 0.1 seconds"));
    }

    #[tokio::test]
    async fn test_timeout_signals_cancellation() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .invoke("faulty.wait_for_cancel", JsonObject::new())
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        // The abandoned task is aborted and released.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dropped_caller_releases_invocation() {
        let config = ServiceConfig::new("svc").with_group(
            GroupConfig::new("timeout").with_timeout("sleep", Duration::from_millis(100)),
        );
        let dispatcher = Dispatcher::load(&catalog(), &config, DispatchOptions::default()).unwrap();

        let call = dispatcher.invoke("timeout.sleep", args(serde_json::json!({"seconds": 3600})));
        assert!(tokio::time::timeout(Duration::from_millis(10), call).await.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dropped_caller_cancels_context() {
        let config = ServiceConfig::new("svc").with_group(
            GroupConfig::new("faulty").with_timeout("wait_for_cancel", Duration::from_secs(10)),
        );
        let dispatcher = Dispatcher::load(&catalog(), &config, DispatchOptions::default()).unwrap();

        let call = dispatcher.invoke("faulty.wait_for_cancel", JsonObject::new());
        assert!(tokio::time::timeout(Duration::from_millis(20), call).await.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dispatcher.in_flight(), 0);
        assert!(dispatcher.shutdown(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_oversized_counts_are_rejected() {
        let dispatcher = dispatcher();
        for (name, arguments) in [
            ("example.count_to", serde_json::json!({"number": u32::MAX})),
            (
                "timeout.slow_counter",
                serde_json::json!({"limit": u32::MAX, "delay": 1.0}),
            ),
        ] {
            let err = dispatcher.invoke(name, args(arguments)).await.unwrap_err();
            assert!(matches!(err, DispatchError::InvalidArguments { .. }), "{}", name);
        }
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_work() {
        let dispatcher = dispatcher();
        assert!(dispatcher.shutdown(Duration::from_millis(100)).await);

        let err = dispatcher
            .invoke("example.hello_world", JsonObject::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ShuttingDown(_)));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight() {
        let config = ServiceConfig::new("svc").with_group(
            GroupConfig::new("faulty").with_timeout("wait_for_cancel", Duration::from_secs(10)),
        );
        let dispatcher = Arc::new(Dispatcher::load(&catalog(), &config, DispatchOptions::default()).unwrap());

        let call = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .invoke("faulty.wait_for_cancel", JsonObject::new())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(dispatcher.in_flight(), 1);

        assert!(dispatcher.shutdown(Duration::from_secs(1)).await);
        let output = call.await.unwrap().unwrap();
        assert_eq!(output.joined_text(), "cancelled");
    }

    #[test]
    fn test_invocation_state_display() {
        assert_eq!(InvocationState::TimedOut.to_string(), "TIMED_OUT");
        assert_eq!(InvocationState::Completed.to_string(), "COMPLETED");
    }
}
