// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Pi-hole operator.
//!
//! All metrics carry the namespace prefix `pihole_operator_`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Reconcile outcomes, durations and requeues
//! - **DNS Record Metrics** - Records created, updated and deleted in Pi-hole
//! - **Error Metrics** - Errors by kind and stable reason label
//!
//! # Example
//!
//! ```rust,ignore
//! use pihole_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("Ingress", std::time::Duration::from_millis(40));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics
const METRICS_NAMESPACE: &str = "pihole_operator";

/// `operation` label value for a newly bound hostname
pub const OPERATION_CREATED: &str = "created";

/// `operation` label value for a hostname rebound to a new address
pub const OPERATION_UPDATED: &str = "updated";

/// `operation` label value for a removed hostname
pub const OPERATION_DELETED: &str = "deleted";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry, exposed via the `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by kind and status
///
/// Labels:
/// - `kind`: Routing object kind (e.g., `Ingress`, `HTTPRoute`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by kind and status",
    );
    let counter = CounterVec::new(opts, &["kind", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `kind`: Routing object kind
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by kind",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of scheduled requeues
///
/// Labels:
/// - `kind`: Routing object kind
/// - `reason`: Error reason that caused the requeue
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeue operations by kind and reason",
    );
    let counter = CounterVec::new(opts, &["kind", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// DNS Record Metrics
// ============================================================================

/// Total number of Pi-hole record mutations
///
/// Labels:
/// - `kind`: Routing object kind that owns the hostname
/// - `operation`: `created`, `updated` or `deleted`
pub static DNS_RECORDS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_dns_records_total"),
        "Total number of Pi-hole local DNS record mutations by kind and operation",
    );
    let counter = CounterVec::new(opts, &["kind", "operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by kind and reason
///
/// Labels:
/// - `kind`: Routing object kind
/// - `reason`: Stable error label (e.g., `PiholeTimeout`, `KubernetesConflict`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by kind and reason",
    );
    let counter = CounterVec::new(opts, &["kind", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(kind: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[kind, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(kind: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[kind, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

/// Record a scheduled requeue
pub fn record_requeue(kind: &str, reason: &str) {
    REQUEUE_TOTAL.with_label_values(&[kind, reason]).inc();
}

/// Record a Pi-hole record mutation
///
/// # Arguments
/// * `kind` - Routing object kind that owns the hostname
/// * `operation` - One of [`OPERATION_CREATED`], [`OPERATION_UPDATED`], [`OPERATION_DELETED`]
pub fn record_dns_record(kind: &str, operation: &str) {
    DNS_RECORDS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

/// Record an error
pub fn record_error(kind: &str, reason: &str) {
    ERRORS_TOTAL.with_label_values(&[kind, reason]).inc();
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
