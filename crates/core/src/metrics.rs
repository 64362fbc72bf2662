//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Patient task queue (tasks added, terminal outcomes, runtimes)
//! - External tool invocations (probes, extractions, conversions)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// =============================================================================
// Task Queue Metrics
// =============================================================================

/// Tasks registered in any queue.
pub static QUEUE_TASKS_ADDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("flare_queue_tasks_added_total", "Total tasks added to queues").unwrap()
});

/// Tasks rolled off a queue, by terminal outcome.
pub static QUEUE_TASKS_ENDED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "flare_queue_tasks_ended_total",
            "Total tasks that reached a terminal state and were reported",
        ),
        &["outcome"], // "finished", "stopped", "timed_out", "failed"
    )
    .unwrap()
});

/// Task runtime in seconds, by terminal outcome.
pub static QUEUE_TASK_RUNTIME: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("flare_queue_task_runtime_seconds", "Runtime of queued tasks")
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 1800.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// External Tool Metrics
// =============================================================================

/// External tool invocations by operation and result.
pub static TOOL_INVOCATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "flare_tool_invocations_total",
            "Total invocations of the external media tool",
        ),
        &["operation", "result"], // operation: "probe", "execute"; result: "success", "failed"
    )
    .unwrap()
});

/// Conversions by result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("flare_conversions_total", "Total conversions"),
        &["result"],
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("flare_conversion_duration_seconds", "Duration of conversions")
            .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 3600.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Queue
        Box::new(QUEUE_TASKS_ADDED.clone()),
        Box::new(QUEUE_TASKS_ENDED.clone()),
        Box::new(QUEUE_TASK_RUNTIME.clone()),
        // Tool
        Box::new(TOOL_INVOCATIONS.clone()),
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
    ]
}

/// Registers every core metric in `registry`. Already registered metrics are skipped.
pub fn register_metrics(registry: &Registry) {
    for metric in all_metrics() {
        if let Err(e) = registry.register(metric) {
            tracing::debug!("Metric not registered: {}", e);
        }
    }
}

/// Renders `registry` in the Prometheus text exposition format.
pub fn encode_text(registry: &Registry) -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_encode() {
        let registry = Registry::new();
        register_metrics(&registry);
        QUEUE_TASKS_ENDED.with_label_values(&["finished"]).inc();

        let text = encode_text(&registry);
        assert!(text.contains("flare_queue_tasks_ended_total"));
    }

    #[test]
    fn test_register_twice_is_harmless() {
        let registry = Registry::new();
        register_metrics(&registry);
        register_metrics(&registry);
    }
}
