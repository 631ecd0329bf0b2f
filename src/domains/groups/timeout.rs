//! Timeout group - operations that take a controllable amount of time.
//!
//! Used to exercise per-call deadlines, cancellation and progress
//! reporting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::bail;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};

use crate::domains::operations::{NoSettings, Operation, OperationContext, ServiceGroup};

/// Iterations between cooperative yields in `cpu_intensive`.
const CHUNK_SIZE: u64 = 100;

/// Largest limit `slow_counter` accepts.
const MAX_COUNTER_LIMIT: u32 = 1_000;

// ============================================================================
// Parameters
// ============================================================================

/// Parameters for `sleep`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SleepParams {
    /// Seconds to sleep.
    pub seconds: f64,
}

/// Parameters for `slow_counter`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SlowCounterParams {
    /// The number to count up to.
    #[serde(deserialize_with = "counter_limit")]
    #[schemars(range(max = 1000))]
    pub limit: u32,
    /// Seconds to wait between counts.
    pub delay: f64,
}

/// Parameters for `cpu_intensive`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CpuIntensiveParams {
    /// Number of calculation iterations to perform.
    pub iterations: u64,
}

fn counter_limit<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = u32::deserialize(deserializer)?;
    if value > MAX_COUNTER_LIMIT {
        return Err(serde::de::Error::custom(format!(
            "limit must be at most {}, got {}",
            MAX_COUNTER_LIMIT, value
        )));
    }
    Ok(value)
}

fn seconds(value: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| anyhow::anyhow!("invalid duration: {} seconds", value))
}

// ============================================================================
// Group Definition
// ============================================================================

/// Operations with controllable duration.
pub struct TimeoutGroup;

impl TimeoutGroup {
    async fn sleep(
        self: Arc<Self>,
        params: SleepParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<String> {
        tokio::time::sleep(seconds(params.seconds)?).await;
        Ok(format!("Slept for {} seconds", params.seconds))
    }

    async fn slow_counter(
        self: Arc<Self>,
        params: SlowCounterParams,
        ctx: OperationContext,
    ) -> anyhow::Result<String> {
        let delay = seconds(params.delay)?;
        let limit = params.limit;
        let start = Instant::now();
        let mut counted = Vec::new();

        for i in 1..=limit {
            ctx.report_progress(f64::from(i), Some(f64::from(limit))).await;
            ctx.info(format!("Counter: {}/{}", i, limit));
            counted.push(i.to_string());

            tokio::select! {
                _ = ctx.cancellation().cancelled() => {
                    bail!("cancelled at {}/{}", i, limit);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Ok(format!(
            "Counted to {} in {:.2} seconds: {}",
            limit,
            start.elapsed().as_secs_f64(),
            counted.join(", ")
        ))
    }

    async fn cpu_intensive(
        self: Arc<Self>,
        params: CpuIntensiveParams,
        ctx: OperationContext,
    ) -> anyhow::Result<String> {
        let iterations = params.iterations;
        ctx.info(format!(
            "Starting CPU-intensive operation with {} iterations",
            iterations
        ));
        let start = Instant::now();
        let mut result: u64 = 0;

        for i in 0..iterations {
            if i % CHUNK_SIZE == 0 {
                if ctx.is_cancelled() {
                    bail!("cancelled after {} of {} iterations", i, iterations);
                }
                ctx.report_progress(i as f64, Some(iterations as f64)).await;
                tokio::task::yield_now().await;
            }
            let chunk: u64 = (0..1000u64).map(|j| j * j).sum();
            result = result.wrapping_add(std::hint::black_box(chunk));
        }

        Ok(format!(
            "Completed {} iterations in {:.2} seconds with result: {}",
            iterations,
            start.elapsed().as_secs_f64(),
            result
        ))
    }
}

impl ServiceGroup for TimeoutGroup {
    const KIND: &'static str = "timeout";
    const DESCRIPTION: &'static str = "Operations for testing timeout functionality";
    type Settings = NoSettings;

    fn new(_settings: Self::Settings) -> anyhow::Result<Self> {
        Ok(Self)
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![
            Operation::with_schema("sleep", Self::sleep)
                .description("Sleep for the specified number of seconds."),
            Operation::with_schema("slow_counter", Self::slow_counter).description(
                "Count up to a limit with a delay between each number and progress reporting.",
            ),
            Operation::with_schema("cpu_intensive", Self::cpu_intensive)
                .description("Perform CPU-bound work that yields periodically."),
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::operations::context::tests::RecordingProgress;

    fn group() -> Arc<TimeoutGroup> {
        Arc::new(TimeoutGroup)
    }

    #[tokio::test]
    async fn test_sleep_reports_duration() {
        let out = group()
            .sleep(
                SleepParams { seconds: 0.05 },
                OperationContext::detached("timeout.sleep"),
            )
            .await
            .unwrap();
        assert_eq!(out, "Slept for 0.05 seconds");
    }

    #[tokio::test]
    async fn test_sleep_rejects_negative_duration() {
        let err = group()
            .sleep(
                SleepParams { seconds: -1.0 },
                OperationContext::detached("timeout.sleep"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid duration"));
    }

    #[tokio::test]
    async fn test_slow_counter_reports_progress() {
        let recorder = Arc::new(RecordingProgress::default());
        let ctx = OperationContext::detached("timeout.slow_counter").with_progress(recorder.clone());

        let out = group()
            .slow_counter(
                SlowCounterParams {
                    limit: 3,
                    delay: 0.01,
                },
                ctx,
            )
            .await
            .unwrap();

        assert!(out.starts_with("Counted to 3 in "));
        assert!(out.ends_with(": 1, 2, 3"));
        let updates = recorder.updates.lock().await;
        assert_eq!(
            *updates,
            vec![(1.0, Some(3.0)), (2.0, Some(3.0)), (3.0, Some(3.0))]
        );
    }

    #[tokio::test]
    async fn test_slow_counter_stops_when_cancelled() {
        let ctx = OperationContext::detached("timeout.slow_counter");
        let token = ctx.cancellation().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            token.cancel();
        });

        let start = Instant::now();
        let err = group()
            .slow_counter(
                SlowCounterParams {
                    limit: 100,
                    delay: 0.05,
                },
                ctx,
            )
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("cancelled at 1/100"));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_cpu_intensive_completes() {
        let out = group()
            .cpu_intensive(
                CpuIntensiveParams { iterations: 250 },
                OperationContext::detached("timeout.cpu_intensive"),
            )
            .await
            .unwrap();
        assert!(out.starts_with("Completed 250 iterations in "));
        assert!(out.ends_with(&format!("with result: {}", 250u64 * 332_833_500)));
    }

    #[tokio::test]
    async fn test_cpu_intensive_honours_cancellation() {
        let ctx = OperationContext::detached("timeout.cpu_intensive");
        ctx.cancellation().cancel();

        let err = group()
            .cpu_intensive(CpuIntensiveParams { iterations: 10_000 }, ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cancelled after 0 of 10000"));
    }

    #[test]
    fn test_slow_counter_limit_is_bounded() {
        let result: Result<SlowCounterParams, _> =
            serde_json::from_value(serde_json::json!({"limit": 4_000_000_000u32, "delay": 1.0}));
        assert!(result.unwrap_err().to_string().contains("at most 1000"));
    }
}
