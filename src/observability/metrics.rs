//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `pagerduty_operator_reconciliations_total{kind}` - Reconcile passes started
//! - `pagerduty_operator_reconciliation_errors_total{kind}` - Reconcile passes that returned an error
//! - `pagerduty_operator_reconciliation_duration_seconds{kind}` - Reconcile pass duration
//! - `pagerduty_operator_requeues_total{reason}` - Requeues by reason
//! - `pagerduty_operator_api_requests_total{resource,operation,outcome}` - PagerDuty API calls
//! - `pagerduty_operator_api_request_duration_seconds{resource,operation}` - PagerDuty API call duration
//! - `pagerduty_operator_remote_deletes_total{resource,outcome}` - Remote cleanup deletes

use anyhow::Result;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pagerduty_operator_reconciliations_total",
            "Total number of reconciliations",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pagerduty_operator_reconciliation_errors_total",
            "Total number of reconciliation errors",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pagerduty_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pagerduty_operator_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static API_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pagerduty_operator_api_requests_total",
            "Total number of PagerDuty API requests",
        ),
        &["resource", "operation", "outcome"],
    )
    .expect("Failed to create API_REQUESTS_TOTAL metric - this should never happen")
});

static API_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pagerduty_operator_api_request_duration_seconds",
            "Duration of PagerDuty API requests in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        &["resource", "operation"],
    )
    .expect("Failed to create API_REQUEST_DURATION metric - this should never happen")
});

static REMOTE_DELETES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pagerduty_operator_remote_deletes_total",
            "Total number of remote deletes issued during cleanup",
        ),
        &["resource", "outcome"],
    )
    .expect("Failed to create REMOTE_DELETES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(REMOTE_DELETES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

/// Record one PagerDuty API call. `outcome` is `success`, `not_found` or `error`.
pub fn record_api_request(resource: &str, operation: &str, outcome: &str, duration: f64) {
    API_REQUESTS_TOTAL
        .with_label_values(&[resource, operation, outcome])
        .inc();
    API_REQUEST_DURATION
        .with_label_values(&[resource, operation])
        .observe(duration);
}

/// `outcome` is `deleted`, `already_gone` or `error`
pub fn increment_remote_deletes(resource: &str, outcome: &str) {
    REMOTE_DELETES_TOTAL
        .with_label_values(&[resource, outcome])
        .inc();
}
