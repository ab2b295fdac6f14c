//! # Request Types
//!
//! PagerDuty wraps every request body in an envelope named after the resource.

use crate::provider::{Ruleset, RulesetRule, Service};
use serde::Serialize;

/// Body for `POST /services` and `PUT /services/{id}`
#[derive(Debug, Serialize)]
pub struct ServiceRequest<'a> {
    pub service: &'a Service,
}

/// Body for `POST /rulesets` and `PUT /rulesets/{id}`
#[derive(Debug, Serialize)]
pub struct RulesetRequest<'a> {
    pub ruleset: &'a Ruleset,
}

/// Body for `POST /rulesets/{id}/rules` and `PUT /rulesets/{id}/rules/{rule_id}`
#[derive(Debug, Serialize)]
pub struct RuleRequest<'a> {
    pub rule: &'a RulesetRule,
}
