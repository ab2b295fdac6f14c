//! # PagerdutyRuleset Reconciler
//!
//! The first pass adopts or creates the remote ruleset and records its ID.
//! Later passes only confirm that the recorded ruleset still exists; they
//! never re-adopt or recreate. On deletion the remote ruleset is removed only
//! when this operator created it.
//!
//! `created: true` is written to status before the create call. A pass that
//! finds no recorded ID but a claimed creation treats a ruleset found by name
//! as its own, so a lost status write never turns a created ruleset into an
//! adopted one.

mod adopt;

pub use adopt::{create_named_ruleset, find_ruleset_by_name};

use crate::constants::RULESET_FINALIZER;
use crate::controller::events::{actions, reasons};
use crate::controller::finalizer::{add_finalizer, has_finalizer, remove_finalizer};
use crate::controller::reconciler::service::tolerate_not_found;
use crate::controller::reconciler::status::persist_status;
use crate::controller::reconciler::store::{backoff_key, object_key};
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::{PagerdutyRuleset, PagerdutyRulesetStatus};
use crate::observability::metrics;
use crate::provider::{PagerdutyError, Ruleset};
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};

pub const KIND: &str = "PagerdutyRuleset";

/// Reconcile one PagerdutyRuleset
pub async fn reconcile(
    obj: Arc<PagerdutyRuleset>,
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

async fn apply(obj: &PagerdutyRuleset, ctx: &Reconciler) -> Result<Action, ReconcilerError> {
    let (namespace, name) = object_key(obj)?;

    let mut current = obj.clone();
    if add_finalizer(&mut current.metadata, RULESET_FINALIZER) {
        current = ctx.rulesets.replace(&current).await?;
    }
    let observed = current.status.clone().unwrap_or_default();

    if let Some(ruleset_id) = observed.ruleset_id() {
        if let Err(e) = ctx.pagerduty.get_ruleset(ruleset_id).await {
            ctx.publish_event(
                &current.object_ref(&()),
                EventType::Warning,
                reasons::FETCH_RULESET,
                actions::RECONCILE,
                format!("Unable to fetch ruleset {ruleset_id}: {e}"),
            )
            .await;
            return Err(e.into());
        }
        debug!("Ruleset {} still present", ruleset_id);
    } else {
        let (ruleset, created) = match resolve_ruleset(ctx, &current, &name, &observed).await {
            Ok(outcome) => outcome,
            Err(e) => {
                ctx.publish_event(
                    &current.object_ref(&()),
                    EventType::Warning,
                    reasons::CREATE_RULESET,
                    actions::RECONCILE,
                    format!("Unable to adopt or create ruleset {name}: {e}"),
                )
                .await;
                return Err(e);
            }
        };
        let ruleset_id = ruleset
            .id
            .ok_or(PagerdutyError::EmptyResponse("ruleset id"))?;

        let status = PagerdutyRulesetStatus {
            ruleset_id: Some(ruleset_id.clone()),
            created,
            adopted: !created,
        };
        persist_status(
            ctx.rulesets.as_ref(),
            &current,
            current.status.as_ref(),
            &status,
        )
        .await?;

        let (reason, verb) = if created {
            (reasons::CREATE_RULESET, "Created")
        } else {
            (reasons::ADOPT_RULESET, "Adopted")
        };
        ctx.publish_event(
            &current.object_ref(&()),
            EventType::Normal,
            reason,
            actions::RECONCILE,
            format!("{verb} ruleset {name} (ID: {ruleset_id})"),
        )
        .await;
    }

    ctx.reset_backoff(&backoff_key(KIND, &namespace, &name));
    Ok(ctx.settings.success_action())
}

/// Adopt the ruleset named `name` or create it, claiming the creation in
/// status first. The flag is `true` when this operator owns the ruleset.
async fn resolve_ruleset(
    ctx: &Reconciler,
    obj: &PagerdutyRuleset,
    name: &str,
    observed: &PagerdutyRulesetStatus,
) -> Result<(Ruleset, bool), ReconcilerError> {
    let client = ctx.pagerduty.as_ref();
    if let Some(existing) = find_ruleset_by_name(client, name).await? {
        if observed.created {
            info!("Recovered ruleset {} ({:?}) from an interrupted create", name, existing.id);
        } else {
            info!("Adopting existing ruleset {} ({:?})", name, existing.id);
        }
        return Ok((existing, observed.created));
    }

    let claim = PagerdutyRulesetStatus {
        ruleset_id: None,
        created: true,
        adopted: false,
    };
    persist_status(ctx.rulesets.as_ref(), obj, obj.status.as_ref(), &claim).await?;
    let created = create_named_ruleset(client, name).await?;
    Ok((created, true))
}

/// The ruleset to delete on cleanup, if this operator owns one
async fn owned_ruleset_id(
    ctx: &Reconciler,
    status: &PagerdutyRulesetStatus,
    name: &str,
) -> Result<Option<String>, ReconcilerError> {
    if status.owns_remote() {
        return Ok(status.ruleset_id().map(str::to_string));
    }
    if status.ruleset_id().is_none() && status.created {
        // creation claimed but the ID was never recorded
        let found = find_ruleset_by_name(ctx.pagerduty.as_ref(), name).await?;
        return Ok(found.and_then(|ruleset| ruleset.id));
    }
    Ok(None)
}

async fn cleanup(obj: &PagerdutyRuleset, ctx: &Reconciler) -> Result<Action, ReconcilerError> {
    let (namespace, name) = object_key(obj)?;
    if !has_finalizer(&obj.metadata, RULESET_FINALIZER) {
        return Ok(Action::await_change());
    }

    let status = obj.status.clone().unwrap_or_default();
    let owned = match owned_ruleset_id(ctx, &status, &name).await {
        Ok(owned) => owned,
        Err(e) => {
            cleanup_failed(ctx, obj, format!("Unable to look up ruleset {name}: {e}")).await;
            return Err(e);
        }
    };
    match (owned, status.ruleset_id()) {
        (Some(ruleset_id), _) => {
            let result = ctx.pagerduty.delete_ruleset(&ruleset_id).await;
            if let Err(e) = tolerate_not_found("ruleset", &ruleset_id, result) {
                cleanup_failed(ctx, obj, format!("Unable to delete ruleset {ruleset_id}: {e}"))
                    .await;
                return Err(e);
            }
            ctx.publish_event(
                &obj.object_ref(&()),
                EventType::Normal,
                reasons::CLEANUP_SUCCEEDED,
                actions::CLEANUP,
                format!("Deleted ruleset {name} (ID: {ruleset_id})"),
            )
            .await;
        }
        (None, Some(ruleset_id)) => {
            info!("Leaving adopted ruleset {} ({}) in place", name, ruleset_id);
        }
        (None, None) => debug!("No ruleset recorded for {}/{}, nothing to clean up", namespace, name),
    }

    let mut current = obj.clone();
    remove_finalizer(&mut current.metadata, RULESET_FINALIZER);
    ctx.rulesets.replace(&current).await?;
    ctx.reset_backoff(&backoff_key(KIND, &namespace, &name));
    Ok(Action::await_change())
}

async fn cleanup_failed(ctx: &Reconciler, obj: &PagerdutyRuleset, note: String) {
    ctx.publish_event(
        &obj.object_ref(&()),
        EventType::Warning,
        reasons::CLEANUP_FAILED,
        actions::CLEANUP,
        note,
    )
    .await;
}
