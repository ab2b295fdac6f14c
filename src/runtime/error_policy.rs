//! # Error Policy
//!
//! Reconcile errors requeue with a per-object Fibonacci backoff. The backoff
//! is reset by the reconcilers on the next successful pass.

use crate::controller::reconciler::{backoff_key, Reconciler, ReconcilerError};
use crate::observability;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per object so one failing resource does not slow
/// down the others.
pub fn handle_reconciliation_error<K>(
    obj: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.kind = kind.as_ref(),
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {} {}/{}: {}", kind, namespace, name, error);
    observability::metrics::increment_reconciliation_errors(&kind);

    let (backoff_seconds, error_count) = ctx.next_backoff(&backoff_key(&kind, &namespace, &name));
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));

    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}, next retry: {})",
        backoff_seconds,
        error_count,
        next_trigger_time.to_rfc3339()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}
