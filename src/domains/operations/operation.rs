//! Operation marker and metadata.
//!
//! An [`Operation`] pairs a handler with the metadata the registry reads
//! later: the short name, an optional input schema, a description, and an
//! optional default timeout. Building one performs no dispatch.
//!
//! Handlers come in two shapes:
//!
//! - [`Operation::new`] receives the raw argument mapping.
//! - [`Operation::with_schema`] receives a typed value deserialized from the
//!   arguments. Its JSON schema is published in tool listings and a
//!   mismatch is reported as invalid arguments before the body runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, future::BoxFuture};
use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{CallToolResult, Content, JsonObject, RawContent},
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use super::context::OperationContext;

/// Future returned by a bound operation.
pub type OperationFuture = BoxFuture<'static, anyhow::Result<OperationOutput>>;

/// Type-erased handler for a group `G`. Argument validation happens before
/// the future is created, so a mismatch never reaches the body.
type Handler<G> =
    Arc<dyn Fn(Arc<G>, JsonObject, OperationContext) -> Result<OperationFuture, String> + Send + Sync>;

/// Handler already bound to its owning group instance.
pub(crate) type BoundHandler =
    Arc<dyn Fn(JsonObject, OperationContext) -> Result<OperationFuture, String> + Send + Sync>;

// ============================================================================
// Metadata
// ============================================================================

/// Metadata describing a single operation.
#[derive(Debug, Clone)]
pub struct OperationMetadata {
    name: String,
    description: Option<String>,
    schema: Option<Arc<JsonObject>>,
    timeout: Option<Duration>,
}

impl OperationMetadata {
    /// Short name, unique within the owning group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// JSON schema of the structured input, if the operation declares one.
    pub fn schema(&self) -> Option<&Arc<JsonObject>> {
        self.schema.as_ref()
    }

    /// Default timeout declared by the operation itself.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

// ============================================================================
// Operation
// ============================================================================

/// A remotely callable operation belonging to group type `G`.
pub struct Operation<G> {
    metadata: OperationMetadata,
    handler: Handler<G>,
}

impl<G> Operation<G>
where
    G: Send + Sync + 'static,
{
    fn from_parts(name: &str, schema: Option<Arc<JsonObject>>, handler: Handler<G>) -> Self {
        Self {
            metadata: OperationMetadata {
                name: name.to_string(),
                description: None,
                schema,
                timeout: None,
            },
            handler,
        }
    }

    /// Declare an operation that receives the raw argument mapping.
    pub fn new<F, Fut, T>(name: &str, handler: F) -> Self
    where
        F: Fn(Arc<G>, JsonObject, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Into<OperationOutput>,
    {
        let handler: Handler<G> = Arc::new(
            move |group: Arc<G>,
                  arguments: JsonObject,
                  ctx: OperationContext|
                  -> Result<OperationFuture, String> {
                let fut = handler(group, arguments, ctx);
                Ok(async move { fut.await.map(Into::<OperationOutput>::into) }.boxed())
            },
        );
        Self::from_parts(name, None, handler)
    }

    /// Declare an operation whose arguments are deserialized into `P`.
    pub fn with_schema<P, F, Fut, T>(name: &str, handler: F) -> Self
    where
        P: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(Arc<G>, P, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Into<OperationOutput>,
    {
        let handler: Handler<G> = Arc::new(
            move |group: Arc<G>,
                  arguments: JsonObject,
                  ctx: OperationContext|
                  -> Result<OperationFuture, String> {
                let params: P = serde_json::from_value(serde_json::Value::Object(arguments))
                    .map_err(|e| e.to_string())?;
                let fut = handler(group, params, ctx);
                Ok(async move { fut.await.map(Into::<OperationOutput>::into) }.boxed())
            },
        );
        Self::from_parts(name, Some(cached_schema_for_type::<P>()), handler)
    }

    /// Set the description shown to clients.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// Set the default timeout for this operation.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.metadata.timeout = Some(timeout);
        self
    }

    /// The metadata recorded for this operation.
    pub fn metadata(&self) -> &OperationMetadata {
        &self.metadata
    }

    /// Bind the handler to a group instance.
    pub(crate) fn bind(self, group: Arc<G>) -> (OperationMetadata, BoundHandler) {
        let handler = self.handler;
        let bound: BoundHandler = Arc::new(move |arguments: JsonObject, ctx: OperationContext| {
            handler(group.clone(), arguments, ctx)
        });
        (self.metadata, bound)
    }
}

// ============================================================================
// Output
// ============================================================================

/// Successful result of an operation: one or more content items.
#[derive(Debug, Clone)]
pub struct OperationOutput {
    content: Vec<Content>,
}

impl OperationOutput {
    /// A single text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text.into())],
        }
    }

    /// Arbitrary content items. An empty list is padded with an empty text
    /// item so callers always receive at least one.
    pub fn content(content: Vec<Content>) -> Self {
        if content.is_empty() {
            return Self::text("");
        }
        Self { content }
    }

    /// The content items.
    pub fn items(&self) -> &[Content] {
        &self.content
    }

    /// All text items joined by newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Wrap as a successful MCP tool result.
    pub fn into_call_result(self) -> CallToolResult {
        CallToolResult::success(self.content)
    }
}

impl From<String> for OperationOutput {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<&'static str> for OperationOutput {
    fn from(text: &'static str) -> Self {
        Self::text(text)
    }
}

impl From<serde_json::Value> for OperationOutput {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self::text(text),
            other => Self::text(other.to_string()),
        }
    }
}

impl From<Vec<Content>> for OperationOutput {
    fn from(content: Vec<Content>) -> Self {
        Self::content(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    struct Greeter {
        prefix: String,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct NameParams {
        name: String,
    }

    fn greet_op() -> Operation<Greeter> {
        Operation::with_schema("greet", |group: Arc<Greeter>, params: NameParams, _ctx| async move {
            Ok(format!("{} {}", group.prefix, params.name))
        })
        .description("Greet someone")
        .timeout(Duration::from_secs(2))
    }

    #[test]
    fn test_metadata_is_recorded() {
        let op = greet_op();
        let meta = op.metadata();
        assert_eq!(meta.name(), "greet");
        assert_eq!(meta.description(), Some("Greet someone"));
        assert_eq!(meta.timeout(), Some(Duration::from_secs(2)));

        let schema = meta.schema().expect("schema should be present");
        let props = schema.get("properties").and_then(|p| p.as_object()).unwrap();
        assert!(props.contains_key("name"));
    }

    #[tokio::test]
    async fn test_bound_handler_uses_group_state() {
        let group = Arc::new(Greeter {
            prefix: "Hi".to_string(),
        });
        let (_, handler) = greet_op().bind(group);

        let mut args = JsonObject::new();
        args.insert("name".into(), serde_json::json!("Ada"));
        let fut = handler(args, OperationContext::detached("g.greet")).unwrap();
        let output = fut.await.unwrap();
        assert_eq!(output.joined_text(), "Hi Ada");
    }

    #[test]
    fn test_schema_mismatch_is_rejected_before_running() {
        let group = Arc::new(Greeter {
            prefix: "Hi".to_string(),
        });
        let (_, handler) = greet_op().bind(group);

        let mut args = JsonObject::new();
        args.insert("name".into(), serde_json::json!(42));
        let result = handler(args, OperationContext::detached("g.greet"));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_raw_operation_receives_arguments() {
        let op = Operation::new("keys", |_group: Arc<Greeter>, args: JsonObject, _ctx| async move {
            let mut keys: Vec<_> = args.keys().cloned().collect();
            keys.sort();
            Ok(keys.join(","))
        });
        assert!(op.metadata().schema().is_none());

        let (_, handler) = op.bind(Arc::new(Greeter {
            prefix: String::new(),
        }));
        let mut args = JsonObject::new();
        args.insert("b".into(), serde_json::json!(1));
        args.insert("a".into(), serde_json::json!(2));
        let output = handler(args, OperationContext::detached("g.keys"))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(output.joined_text(), "a,b");
    }

    #[test]
    fn test_output_conversions() {
        let out: OperationOutput = serde_json::json!("plain").into();
        assert_eq!(out.joined_text(), "plain");

        let out: OperationOutput = serde_json::json!({"count": 1}).into();
        assert_eq!(out.joined_text(), r#"{"count":1}"#);

        let out = OperationOutput::content(Vec::new());
        assert_eq!(out.items().len(), 1);

        let result = OperationOutput::text("done").into_call_result();
        assert_ne!(result.is_error, Some(true));
    }
}
