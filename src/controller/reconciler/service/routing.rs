//! # Routing Rule
//!
//! Each PagerdutyService owns exactly one rule in the shared ruleset. The
//! rule matches when every label pair appears in the alert's firing labels,
//! and routes to the service.
//!
//! PagerDuty's rule engine only offers substring tests on event fields, so
//! each pair becomes a `contains` test for the literal `key = value` on
//! `details.firing`, all joined with `and`.

use crate::constants::FIRING_LABELS_PATH;
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::LabelMatch;
use crate::provider::{
    ApiReference, ConditionParameter, PagerdutyError, RuleActionParameter, RuleActions,
    RuleConditions, RuleSubcondition, RulesetClient, RulesetRule, RulesetRuleClient,
};
use tracing::{debug, info};

pub fn build_conditions(match_labels: &[LabelMatch]) -> RuleConditions {
    RuleConditions {
        operator: "and".to_string(),
        subconditions: match_labels
            .iter()
            .map(|label| RuleSubcondition {
                operator: "contains".to_string(),
                parameters: ConditionParameter {
                    path: FIRING_LABELS_PATH.to_string(),
                    value: format!("{} = {}", label.key, label.value),
                },
            })
            .collect(),
    }
}

/// Point `rule` at `service_id` with conditions derived from `match_labels`
pub fn apply_rule_spec(
    mut rule: RulesetRule,
    ruleset_id: &str,
    match_labels: &[LabelMatch],
    service_id: &str,
) -> RulesetRule {
    rule.conditions = Some(build_conditions(match_labels));
    rule.actions = Some(RuleActions {
        route: Some(RuleActionParameter {
            value: service_id.to_string(),
        }),
    });
    rule.ruleset = Some(ApiReference::ruleset(ruleset_id));
    rule
}

/// Create or update the service's rule in the shared ruleset; returns the rule ID
pub async fn reconcile_routing_rule<C>(
    client: &C,
    ruleset_id: &str,
    existing_rule_id: Option<&str>,
    match_labels: &[LabelMatch],
    service_id: &str,
) -> Result<String, ReconcilerError>
where
    C: RulesetClient + RulesetRuleClient + ?Sized,
{
    client.get_ruleset(ruleset_id).await?;

    let Some(rule_id) = existing_rule_id else {
        // a rule created by an earlier pass whose ID never made it into status
        let orphan = client
            .list_rules(ruleset_id)
            .await?
            .into_iter()
            .find_map(|rule| {
                let id = rule.id.clone()?;
                (rule.route_target() == Some(service_id)).then_some((id, rule))
            });
        if let Some((id, existing)) = orphan {
            let rule = apply_rule_spec(existing, ruleset_id, match_labels, service_id);
            client.update_rule(ruleset_id, &id, &rule).await?;
            info!("Recovered routing rule {} in ruleset {} for service {}", id, ruleset_id, service_id);
            return Ok(id);
        }

        let rule = apply_rule_spec(RulesetRule::default(), ruleset_id, match_labels, service_id);
        let created = client.create_rule(ruleset_id, &rule).await?;
        let id = created.id.ok_or(PagerdutyError::EmptyResponse("rule id"))?;
        info!("Created routing rule {} in ruleset {} for service {}", id, ruleset_id, service_id);
        return Ok(id);
    };

    let existing = match client.get_rule(ruleset_id, rule_id).await {
        Ok(rule) => rule,
        Err(e) if e.is_not_found() => {
            return Err(ReconcilerError::RemoteRuleMissing(rule_id.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let rule = apply_rule_spec(existing, ruleset_id, match_labels, service_id);
    client.update_rule(ruleset_id, rule_id, &rule).await?;
    debug!("Updated routing rule {} in ruleset {}", rule_id, ruleset_id);
    Ok(rule_id.to_string())
}
