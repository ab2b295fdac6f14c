//! # PagerdutyService Reconciler
//!
//! Active objects: ensure the finalizer, resolve and verify the escalation
//! policy, create or update the remote service, then its routing rule in the
//! shared ruleset. Status is written on every exit.
//!
//! Remote creates are made recoverable across failed status writes: the
//! generated service name is stored before the service is created and the
//! service ID before the rule is touched. A retry finds the service by that
//! name and the rule by its route target instead of creating duplicates.
//!
//! Terminating objects: delete the rule, then the service (both tolerate
//! 404), then release the finalizer.

mod escalation;
mod remote;
mod routing;

pub use escalation::resolve_escalation_policy_id;
pub use remote::{
    create_remote_service, generate_service_name, get_service_by_name, recover_or_create_service,
    update_remote_service,
};
pub use routing::{apply_rule_spec, build_conditions, reconcile_routing_rule};

use crate::constants::SERVICE_FINALIZER;
use crate::controller::events::{actions, reasons};
use crate::controller::finalizer::{add_finalizer, has_finalizer, remove_finalizer};
use crate::controller::reconciler::status::persist_status;
use crate::controller::reconciler::store::{backoff_key, object_key};
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::{PagerdutyService, PagerdutyServiceStatus};
use crate::observability::metrics;
use crate::provider::{PagerdutyError, PagerdutyResult, Service};
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

pub const KIND: &str = "PagerdutyService";

/// Reconcile one PagerdutyService
pub async fn reconcile(
    obj: Arc<PagerdutyService>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let span = info_span!(
        "reconcile",
        resource.kind = KIND,
        resource.namespace = obj.namespace().as_deref().unwrap_or("unknown"),
        resource.name = obj.name_any().as_str()
    );
    metrics::increment_reconciliations(KIND);
    let start = Instant::now();

    let result = async {
        if obj.metadata.deletion_timestamp.is_some() {
            cleanup(&obj, &ctx).await
        } else {
            apply(&obj, &ctx).await
        }
    }
    .instrument(span)
    .await;

    metrics::observe_reconciliation_duration(KIND, start.elapsed().as_secs_f64());
    result
}

async fn apply(obj: &PagerdutyService, ctx: &Reconciler) -> Result<Action, ReconcilerError> {
    let (namespace, name) = object_key(obj)?;

    let mut current = obj.clone();
    if add_finalizer(&mut current.metadata, SERVICE_FINALIZER) {
        current = ctx.services.replace(&current).await?;
    }

    let mut observed = current.status.clone();
    let mut status = current.status_or_default();

    let escalation_policy_id = match verified_escalation_policy(&current, &namespace, ctx).await {
        Ok(id) => id,
        Err(e) if e.is_missing_configuration() => {
            warn!("Escalation policy unresolved for {}/{}: {}", namespace, name, e);
            status.record_outcome(Err(&e));
            persist_status(ctx.services.as_ref(), &current, observed.as_ref(), &status).await?;
            ctx.publish_event(
                &current.object_ref(&()),
                EventType::Warning,
                reasons::ESCALATION_POLICY_UNRESOLVED,
                actions::RECONCILE,
                e.to_string(),
            )
            .await;
            metrics::increment_requeues_total("missing-configuration");
            return Ok(Action::requeue(ctx.settings.requeue_delay));
        }
        Err(e) => return Err(fail(ctx, &current, observed.as_ref(), status, e).await),
    };

    let service = match ensure_service(
        ctx,
        &current,
        &name,
        &escalation_policy_id,
        &mut status,
        &mut observed,
    )
    .await
    {
        Ok(service) => service,
        Err(e) => return Err(fail(ctx, &current, observed.as_ref(), status, e).await),
    };

    let Some(service_id) = service.id.clone() else {
        let e = PagerdutyError::EmptyResponse("service id").into();
        return Err(fail(ctx, &current, observed.as_ref(), status, e).await);
    };
    let created_service = status.service_id() != Some(service_id.as_str());
    status.service_id = Some(service_id.clone());
    status.service_name = Some(service.name);
    if created_service {
        // the rule step must never run before the service ID is stored
        if let Err(e) =
            persist_status(ctx.services.as_ref(), &current, observed.as_ref(), &status).await
        {
            return Err(fail(ctx, &current, observed.as_ref(), status, e).await);
        }
        observed = Some(status.clone());
    }

    let rule_id = match reconcile_routing_rule(
        ctx.pagerduty.as_ref(),
        &ctx.settings.ruleset_id,
        status.rule_id(),
        &current.spec.match_labels,
        &service_id,
    )
    .await
    {
        Ok(rule_id) => rule_id,
        Err(e) => return Err(fail(ctx, &current, observed.as_ref(), status, e).await),
    };
    let created_rule = status.rule_id() != Some(rule_id.as_str());
    status.rule_id = Some(rule_id);
    status.record_outcome::<ReconcilerError>(Ok(()));

    persist_status(ctx.services.as_ref(), &current, observed.as_ref(), &status).await?;

    if created_service || created_rule {
        ctx.publish_event(
            &current.object_ref(&()),
            EventType::Normal,
            reasons::SERVICE_SYNCED,
            actions::RECONCILE,
            format!(
                "Synced PagerDuty service {} (ID: {}) with routing rule {}",
                status.service_name.as_deref().unwrap_or_default(),
                service_id,
                status.rule_id.as_deref().unwrap_or_default()
            ),
        )
        .await;
    }

    if ctx.reset_backoff(&backoff_key(KIND, &namespace, &name)) {
        info!("Backoff reset for {}/{} after successful reconcile", namespace, name);
    }
    info!("Reconciled {}/{} (service {})", namespace, name, service_id);
    Ok(ctx.settings.success_action())
}

/// Update the recorded service, or create one under a name stored in status first
async fn ensure_service(
    ctx: &Reconciler,
    obj: &PagerdutyService,
    name: &str,
    escalation_policy_id: &str,
    status: &mut PagerdutyServiceStatus,
    observed: &mut Option<PagerdutyServiceStatus>,
) -> Result<Service, ReconcilerError> {
    let client = ctx.pagerduty.as_ref();
    if let Some(id) = status.service_id() {
        return update_remote_service(client, id, &obj.spec, escalation_policy_id).await;
    }
    if let Some(recorded) = status.service_name() {
        return recover_or_create_service(client, recorded, &obj.spec, escalation_policy_id).await;
    }

    let settings = &ctx.settings;
    let generated =
        generate_service_name(&settings.service_prefix, name, settings.service_suffix_length);
    status.service_name = Some(generated.clone());
    persist_status(ctx.services.as_ref(), obj, observed.as_ref(), status).await?;
    *observed = Some(status.clone());

    create_remote_service(client, &generated, &obj.spec, escalation_policy_id).await
}

/// Resolve the policy ID and check that it exists remotely
async fn verified_escalation_policy(
    obj: &PagerdutyService,
    namespace: &str,
    ctx: &Reconciler,
) -> Result<String, ReconcilerError> {
    let id = resolve_escalation_policy_id(&obj.spec, namespace, ctx.secrets.as_ref()).await?;
    match ctx.pagerduty.get_escalation_policy(&id).await {
        Ok(_) => Ok(id),
        Err(e) if e.is_not_found() => Err(ReconcilerError::EscalationPolicyUnavailable(id)),
        Err(e) => Err(e.into()),
    }
}

/// Record a failed pass in status and events; returns the error to surface
async fn fail(
    ctx: &Reconciler,
    obj: &PagerdutyService,
    observed: Option<&PagerdutyServiceStatus>,
    mut status: PagerdutyServiceStatus,
    error: ReconcilerError,
) -> ReconcilerError {
    status.record_outcome(Err(&error));
    if let Err(e) = persist_status(ctx.services.as_ref(), obj, observed, &status).await {
        warn!("Failed to record error status: {}", e);
    }
    ctx.publish_event(
        &obj.object_ref(&()),
        EventType::Warning,
        reasons::SERVICE_FAILED,
        actions::RECONCILE,
        error.to_string(),
    )
    .await;
    error
}

async fn cleanup(obj: &PagerdutyService, ctx: &Reconciler) -> Result<Action, ReconcilerError> {
    let (namespace, name) = object_key(obj)?;
    if !has_finalizer(&obj.metadata, SERVICE_FINALIZER) {
        return Ok(Action::await_change());
    }

    info!("Cleaning up PagerDuty resources for {}/{}", namespace, name);
    if let Err(e) = destroy(obj, ctx).await {
        let mut status = obj.status_or_default();
        status.record_outcome(Err(&e));
        if let Err(pe) =
            persist_status(ctx.services.as_ref(), obj, obj.status.as_ref(), &status).await
        {
            warn!("Failed to record cleanup error status: {}", pe);
        }
        ctx.publish_event(
            &obj.object_ref(&()),
            EventType::Warning,
            reasons::CLEANUP_FAILED,
            actions::CLEANUP,
            e.to_string(),
        )
        .await;
        return Err(e);
    }

    let mut current = obj.clone();
    remove_finalizer(&mut current.metadata, SERVICE_FINALIZER);
    ctx.services.replace(&current).await?;
    ctx.reset_backoff(&backoff_key(KIND, &namespace, &name));

    ctx.publish_event(
        &obj.object_ref(&()),
        EventType::Normal,
        reasons::CLEANUP_SUCCEEDED,
        actions::CLEANUP,
        "Removed routing rule and PagerDuty service".to_string(),
    )
    .await;
    Ok(Action::await_change())
}

/// Delete the rule, then the service.
///
/// A service whose ID never reached status is found through the name recorded
/// before its creation, and its rule through the route target.
async fn destroy(obj: &PagerdutyService, ctx: &Reconciler) -> Result<(), ReconcilerError> {
    let status = obj.status_or_default();
    let ruleset_id = &ctx.settings.ruleset_id;

    let service_id = match (status.service_id(), status.service_name()) {
        (Some(id), _) => Some(id.to_string()),
        (None, Some(recorded)) => match get_service_by_name(ctx.pagerduty.as_ref(), recorded).await {
            Ok(service) => service.id,
            Err(ReconcilerError::Pagerduty(e)) if e.is_not_found() => None,
            Err(e) => return Err(e),
        },
        (None, None) => None,
    };

    if let Some(rule_id) = status.rule_id() {
        let result = ctx.pagerduty.delete_rule(ruleset_id, rule_id).await;
        tolerate_not_found("rule", rule_id, result)?;
    } else if let Some(service_id) = service_id.as_deref() {
        let rules = match ctx.pagerduty.list_rules(ruleset_id).await {
            Ok(rules) => rules,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        for rule_id in rules
            .iter()
            .filter(|rule| rule.route_target() == Some(service_id))
            .filter_map(|rule| rule.id.as_deref())
        {
            let result = ctx.pagerduty.delete_rule(ruleset_id, rule_id).await;
            tolerate_not_found("rule", rule_id, result)?;
        }
    }

    if let Some(service_id) = service_id.as_deref() {
        let result = ctx.pagerduty.delete_service(service_id).await;
        tolerate_not_found("service", service_id, result)?;
    }

    Ok(())
}

pub(crate) fn tolerate_not_found(
    resource: &'static str,
    id: &str,
    result: PagerdutyResult<()>,
) -> Result<(), ReconcilerError> {
    match result {
        Ok(()) => {
            metrics::increment_remote_deletes(resource, "deleted");
            info!("Deleted {} {}", resource, id);
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            metrics::increment_remote_deletes(resource, "already_gone");
            info!("{} {} already deleted", resource, id);
            Ok(())
        }
        Err(e) => {
            metrics::increment_remote_deletes(resource, "error");
            Err(e.into())
        }
    }
}
