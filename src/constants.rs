//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! command-line flags or environment variables where applicable.

/// Finalizer placed on every PagerdutyService
pub const SERVICE_FINALIZER: &str = "pagerdutyservice.core.strateos.com";

/// Finalizer placed on every PagerdutyRuleset
pub const RULESET_FINALIZER: &str = "pagerdutyruleset.core.strateos.com";

/// Default PagerDuty REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.pagerduty.com";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Fixed requeue delay when required configuration cannot be resolved (seconds)
pub const DEFAULT_REQUEUE_DELAY_SECS: u64 = 30;

/// Periodic resync after a successful reconcile (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Fibonacci backoff lower bound for reconcile errors (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Fibonacci backoff upper bound for reconcile errors (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Timeout applied to each PagerDuty HTTP request (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Reporter name attached to Kubernetes events
pub const EVENT_REPORTER: &str = "pagerduty-operator";

/// Label path inspected by generated routing-rule conditions
pub const FIRING_LABELS_PATH: &str = "details.firing";
