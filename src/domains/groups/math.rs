//! Math group - arithmetic over two numbers.

use std::sync::Arc;

use anyhow::bail;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::domains::operations::{Operation, OperationContext, ServiceGroup};

/// Settings for the math group.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct MathSettings {
    /// Decimal places applied when a call does not pass `precision`.
    #[serde(default)]
    pub default_precision: Option<u32>,
}

/// Input for arithmetic operations.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ArithmeticParams {
    /// First number
    pub x: f64,
    /// Second number
    pub y: f64,
    /// Decimal precision
    #[serde(default)]
    pub precision: Option<u32>,
}

/// Round `value` to `places` decimal places (at most 15).
pub(crate) fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places.min(15) as i32);
    (value * factor).round() / factor
}

/// Arithmetic operations.
pub struct MathGroup {
    default_precision: Option<u32>,
}

impl MathGroup {
    fn finish(&self, value: f64, precision: Option<u32>) -> anyhow::Result<String> {
        if !value.is_finite() {
            bail!("result is not a finite number");
        }
        let value = match precision.or(self.default_precision) {
            Some(places) => round_to(value, places),
            None => value,
        };
        Ok(value.to_string())
    }

    async fn add(
        self: Arc<Self>,
        input: ArithmeticParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        self.finish(input.x + input.y, input.precision)
    }

    async fn subtract(
        self: Arc<Self>,
        input: ArithmeticParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        self.finish(input.x - input.y, input.precision)
    }

    async fn multiply(
        self: Arc<Self>,
        input: ArithmeticParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        self.finish(input.x * input.y, input.precision)
    }

    async fn divide(
        self: Arc<Self>,
        input: ArithmeticParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        if input.y == 0.0 {
            bail!("Division by zero");
        }
        self.finish(input.x / input.y, input.precision)
    }

    async fn power(
        self: Arc<Self>,
        input: ArithmeticParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        self.finish(input.x.powf(input.y), input.precision)
    }
}

impl ServiceGroup for MathGroup {
    const KIND: &'static str = "math";
    const DESCRIPTION: &'static str = "Math operations group";
    type Settings = MathSettings;

    fn new(settings: Self::Settings) -> anyhow::Result<Self> {
        Ok(Self {
            default_precision: settings.default_precision,
        })
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![
            Operation::with_schema("add", Self::add).description("Add two numbers."),
            Operation::with_schema("subtract", Self::subtract).description("Subtract two numbers."),
            Operation::with_schema("multiply", Self::multiply).description("Multiply two numbers."),
            Operation::with_schema("divide", Self::divide).description("Divide two numbers."),
            Operation::with_schema("power", Self::power).description("Raise x to the power of y."),
        ]
    }
}
