// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for orchestration runs.
//!
//! All metrics use the namespace prefix `admission_fleet_`. A run is a short-lived
//! process, so instead of serving `/metrics` the CLI writes the text exposition to
//! a file on exit (`--metrics-file`), suitable for a node-exporter textfile collector.
//!
//! # Metrics Categories
//!
//! - **External Operation Metrics** - every call into an external control plane
//! - **Region Metrics** - per-region pipeline outcomes
//! - **Drift Metrics** - shared identity policies whose stored document diverges
//!
//! # Example
//!
//! ```rust,no_run
//! use admission_fleet::metrics::record_external_operation;
//!
//! record_external_operation("helm", "upgrade", "success", std::time::Duration::from_secs(3));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "admission_fleet";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// External Operation Metrics
// ============================================================================

/// Total number of external operations by boundary, operation and outcome
///
/// Labels:
/// - `boundary`: External tool or API (`eksctl`, `aws`, `helm`, `kubectl`, `kube`)
/// - `operation`: Sub-command or API verb
/// - `outcome`: `success` or `error`
pub static EXTERNAL_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_external_operations_total"),
        "Total number of external operations by boundary, operation and outcome",
    );
    let counter = CounterVec::new(opts, &["boundary", "operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of external operations in seconds
///
/// Labels:
/// - `boundary`: External tool or API
pub static EXTERNAL_OPERATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_external_operation_duration_seconds"),
        "Duration of external operations in seconds by boundary",
    )
    .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 600.0, 1200.0, 2400.0]);
    let histogram = HistogramVec::new(opts, &["boundary"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Region Metrics
// ============================================================================

/// Total number of region pipelines by outcome
///
/// Labels:
/// - `outcome`: `success` or the failing reason code
pub static REGIONS_COMPLETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_regions_completed_total"),
        "Total number of region pipelines by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Drift Metrics
// ============================================================================

/// Total number of times an existing policy was found diverging from its intended document
///
/// Labels:
/// - `policy`: Policy name
pub static POLICY_DRIFT_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_policy_drift_total"),
        "Existing identity policies whose stored document differs from the intended one",
    );
    let counter = CounterVec::new(opts, &["policy"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record an external operation
///
/// # Arguments
/// * `boundary` - External tool or API (e.g., `helm`)
/// * `operation` - Sub-command or verb (e.g., `upgrade`)
/// * `outcome` - `success` or `error`
/// * `duration` - Wall-clock duration of the call
pub fn record_external_operation(
    boundary: &str,
    operation: &str,
    outcome: &str,
    duration: Duration,
) {
    EXTERNAL_OPERATIONS_TOTAL
        .with_label_values(&[boundary, operation, outcome])
        .inc();
    EXTERNAL_OPERATION_DURATION_SECONDS
        .with_label_values(&[boundary])
        .observe(duration.as_secs_f64());
}

/// Record a finished region pipeline
pub fn record_region_outcome(outcome: &str) {
    REGIONS_COMPLETED_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record policy drift for a shared policy
pub fn record_policy_drift(policy: &str) {
    POLICY_DRIFT_TOTAL.with_label_values(&[policy]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

/// Write the text exposition to `path`
///
/// # Errors
/// Returns error if encoding or writing fails
pub async fn write_metrics_file(path: &Path) -> anyhow::Result<()> {
    let text = gather_metrics()?;
    tokio::fs::write(path, text).await?;
    Ok(())
}
