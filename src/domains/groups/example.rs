//! Example group - the smallest useful set of operations.

use std::sync::Arc;

use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};

use crate::domains::operations::{Operation, OperationContext, ServiceGroup};

/// Largest number `count_to` accepts.
const MAX_COUNT: u32 = 10_000;

/// Numbers emitted between cancellation checks in `count_to`.
const COUNT_CHUNK: u32 = 1_000;

// ============================================================================
// Settings & Parameters
// ============================================================================

/// Settings for the example group.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ExampleSettings {
    /// Replaces the text returned by `hello_world`.
    #[serde(default)]
    pub greeting: Option<String>,
}

/// Parameters for `echo`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EchoParams {
    /// Text to echo back.
    pub text: String,
}

/// Parameters for `count_to`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CountToParams {
    /// Number to count up to.
    #[serde(deserialize_with = "count_limit")]
    #[schemars(range(max = 10000))]
    pub number: u32,
}

fn count_limit<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = u32::deserialize(deserializer)?;
    if value > MAX_COUNT {
        return Err(serde::de::Error::custom(format!(
            "number must be at most {}, got {}",
            MAX_COUNT, value
        )));
    }
    Ok(value)
}

// ============================================================================
// Group Definition
// ============================================================================

/// A basic group with simple, fast operations.
pub struct ExampleGroup {
    greeting: String,
}

impl ExampleGroup {
    async fn hello_world(
        self: Arc<Self>,
        _args: JsonObject,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        Ok(self.greeting.clone())
    }

    async fn echo(
        self: Arc<Self>,
        params: EchoParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        Ok(format!("Echo: {}", params.text))
    }

    async fn count_to(
        self: Arc<Self>,
        params: CountToParams,
        ctx: OperationContext,
    ) -> anyhow::Result<String> {
        let mut numbers = Vec::new();
        for i in 1..=params.number {
            if i % COUNT_CHUNK == 0 {
                if ctx.is_cancelled() {
                    anyhow::bail!("cancelled at {}/{}", i, params.number);
                }
                tokio::task::yield_now().await;
            }
            numbers.push(i.to_string());
        }
        Ok(numbers.join(", "))
    }
}

impl ServiceGroup for ExampleGroup {
    const KIND: &'static str = "example";
    const DESCRIPTION: &'static str = "A basic example group with simple operations";
    type Settings = ExampleSettings;

    fn new(settings: Self::Settings) -> anyhow::Result<Self> {
        Ok(Self {
            greeting: settings
                .greeting
                .unwrap_or_else(|| "Hello, World!".to_string()),
        })
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![
            Operation::new("hello_world", Self::hello_world)
                .description("Return a simple hello world message."),
            Operation::with_schema("echo", Self::echo)
                .description("Echo the provided text back to the user."),
            Operation::with_schema("count_to", Self::count_to)
                .description("Return a string with numbers from 1 to the provided number."),
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================
