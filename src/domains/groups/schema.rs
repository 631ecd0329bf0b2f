//! Schema group - operations taking structured, validated input.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};

use crate::domains::operations::{NoSettings, Operation, OperationContext, ServiceGroup};

const MAX_REPEAT: u32 = 10;

// ============================================================================
// Parameters
// ============================================================================

/// A person to greet.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PersonParams {
    /// Person's name
    pub name: String,
    /// Person's age
    pub age: u32,
    /// Person's email address
    #[serde(default)]
    pub email: Option<String>,
}

/// A message with repetition.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MessageParams {
    /// Message text
    pub text: String,
    /// Number of times to repeat the message
    #[serde(default = "default_repeat", deserialize_with = "repeat_count")]
    #[schemars(range(min = 1, max = 10))]
    pub repeat: u32,
}

fn default_repeat() -> u32 {
    1
}

fn repeat_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = u32::deserialize(deserializer)?;
    if !(1..=MAX_REPEAT).contains(&value) {
        return Err(serde::de::Error::custom(format!(
            "repeat must be between 1 and {}, got {}",
            MAX_REPEAT, value
        )));
    }
    Ok(value)
}

/// A list of items to process.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListParams {
    /// List of items to process
    pub items: Vec<String>,
    /// Prefix to add to each item
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Whether to convert items to uppercase
    #[serde(default)]
    pub uppercase: bool,
}

fn default_prefix() -> String {
    "Item:".to_string()
}

// ============================================================================
// Group Definition
// ============================================================================

/// Operations demonstrating schema-validated input.
pub struct SchemaGroup;

impl SchemaGroup {
    async fn greet_person(
        self: Arc<Self>,
        person: PersonParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        let mut parts = vec![format!("Hello, {}!", person.name)];
        if person.age > 0 {
            parts.push(format!("You are {} years old.", person.age));
        }
        if let Some(email) = person.email.filter(|e| !e.is_empty()) {
            parts.push(format!("Your email is {}.", email));
        }
        Ok(parts.join(" "))
    }

    async fn repeat_message(
        self: Arc<Self>,
        message: MessageParams,
        ctx: OperationContext,
    ) -> anyhow::Result<String> {
        ctx.info(format!("Repeating message {} times", message.repeat));
        let total = f64::from(message.repeat);
        let mut repeated = Vec::with_capacity(message.repeat as usize);
        for i in 1..=message.repeat {
            ctx.report_progress(f64::from(i), Some(total)).await;
            repeated.push(message.text.as_str());
        }
        Ok(repeated.join(" "))
    }

    async fn process_list(
        self: Arc<Self>,
        data: ListParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<serde_json::Value> {
        let processed: Vec<String> = data
            .items
            .iter()
            .map(|item| {
                let item = if data.uppercase {
                    item.to_uppercase()
                } else {
                    item.clone()
                };
                format!("{} {}", data.prefix, item)
            })
            .collect();
        Ok(serde_json::json!(processed))
    }
}

impl ServiceGroup for SchemaGroup {
    const KIND: &'static str = "schema";
    const DESCRIPTION: &'static str = "Operations using structured input schemas";
    type Settings = NoSettings;

    fn new(_settings: Self::Settings) -> anyhow::Result<Self> {
        Ok(Self)
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![
            Operation::with_schema("greet_person", Self::greet_person)
                .description("Greet a person based on their information."),
            Operation::with_schema("repeat_message", Self::repeat_message)
                .description("Repeat a message a specified number of times."),
            Operation::with_schema("process_list", Self::process_list)
                .description("Prefix and optionally uppercase each item of a list."),
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================
