//! Stats group - descriptive statistics and normal sampling.

use std::f64::consts::TAU;
use std::sync::Arc;

use anyhow::bail;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};

use super::math::round_to;
use crate::domains::operations::{NoSettings, Operation, OperationContext, ServiceGroup};

/// Largest sample `normal_sample` will draw.
const MAX_SAMPLE_SIZE: usize = 10_000;

/// Input for statistics over a list of numbers.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct StatsParams {
    /// List of numbers
    pub values: Vec<f64>,
    /// Decimal precision
    #[serde(default)]
    pub precision: Option<u32>,
}

/// Input for `normal_sample`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DistributionParams {
    /// Mean of the distribution
    pub mean: f64,
    /// Standard deviation
    pub std: f64,
    /// Number of samples
    #[serde(deserialize_with = "sample_size")]
    #[schemars(range(max = 10000))]
    pub size: usize,
    /// Decimal precision
    #[serde(default)]
    pub precision: Option<u32>,
}

fn sample_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = usize::deserialize(deserializer)?;
    if value > MAX_SAMPLE_SIZE {
        return Err(serde::de::Error::custom(format!(
            "size must be at most {}, got {}",
            MAX_SAMPLE_SIZE, value
        )));
    }
    Ok(value)
}

fn finish(value: f64, precision: Option<u32>) -> anyhow::Result<String> {
    if !value.is_finite() {
        bail!("result is not a finite number");
    }
    Ok(precision.map_or(value, |places| round_to(value, places)).to_string())
}

fn non_empty(values: &[f64]) -> anyhow::Result<&[f64]> {
    if values.is_empty() {
        bail!("values must not be empty");
    }
    Ok(values)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
fn variance(values: &[f64]) -> f64 {
    let mean = mean(values);
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Box-Muller draws from N(mean, std²).
fn normal_samples(mean: f64, std: f64, size: usize) -> Vec<f64> {
    let mut rng = rand::rng();
    (0..size)
        .map(|_| {
            // 1 - [0, 1) keeps ln() away from zero.
            let u1 = 1.0 - rng.random::<f64>();
            let u2 = rng.random::<f64>();
            mean + std * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
        })
        .collect()
}

/// Statistics operations.
pub struct StatsGroup;

impl StatsGroup {
    async fn mean(
        self: Arc<Self>,
        input: StatsParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        finish(mean(non_empty(&input.values)?), input.precision)
    }

    async fn median(
        self: Arc<Self>,
        input: StatsParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        finish(median(non_empty(&input.values)?), input.precision)
    }

    async fn std(
        self: Arc<Self>,
        input: StatsParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        finish(variance(non_empty(&input.values)?).sqrt(), input.precision)
    }

    async fn variance(
        self: Arc<Self>,
        input: StatsParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        finish(variance(non_empty(&input.values)?), input.precision)
    }

    async fn normal_sample(
        self: Arc<Self>,
        input: DistributionParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<serde_json::Value> {
        if input.std < 0.0 {
            bail!("std must be non-negative, got {}", input.std);
        }
        let samples: Vec<f64> = normal_samples(input.mean, input.std, input.size)
            .into_iter()
            .map(|v| input.precision.map_or(v, |places| round_to(v, places)))
            .collect();
        Ok(serde_json::json!(samples))
    }
}

impl ServiceGroup for StatsGroup {
    const KIND: &'static str = "stats";
    const DESCRIPTION: &'static str = "Descriptive statistics over lists of numbers";
    type Settings = NoSettings;

    fn new(_settings: Self::Settings) -> anyhow::Result<Self> {
        Ok(Self)
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![
            Operation::with_schema("mean", Self::mean).description("Calculate mean of numbers."),
            Operation::with_schema("median", Self::median)
                .description("Calculate median of numbers."),
            Operation::with_schema("std", Self::std)
                .description("Calculate population standard deviation of numbers."),
            Operation::with_schema("variance", Self::variance)
                .description("Calculate population variance of numbers."),
            Operation::with_schema("normal_sample", Self::normal_sample)
                .description("Draw samples from a normal distribution."),
        ]
    }
}
