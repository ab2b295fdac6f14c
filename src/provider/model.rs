//! # PagerDuty Resources
//!
//! Representations of the remote objects the operator manages. They double as
//! the JSON bodies sent to and received from the REST API, so field names
//! follow the PagerDuty v2 schema.
//!
//! API Reference: https://developer.pagerduty.com/api-reference/

use serde::{Deserialize, Serialize};

/// Reference to another remote object (`{"id": .., "type": ..}`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiReference {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl ApiReference {
    pub fn escalation_policy(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "escalation_policy_reference".to_string(),
        }
    }

    pub fn ruleset(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: String::new(),
        }
    }
}

/// Escalation policy; only its identity matters to the operator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_policy: Option<ApiReference>,
}

/// Event ruleset
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ruleset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routing_keys: Vec<String>,
}

impl Ruleset {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Rule inside an event ruleset
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RulesetRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<RuleConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<RuleActions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruleset: Option<ApiReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleConditions {
    pub operator: String,
    #[serde(default)]
    pub subconditions: Vec<RuleSubcondition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSubcondition {
    pub operator: String,
    pub parameters: ConditionParameter,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConditionParameter {
    pub path: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleActions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RuleActionParameter>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleActionParameter {
    pub value: String,
}

impl RulesetRule {
    /// Service this rule routes to, if any
    pub fn route_target(&self) -> Option<&str> {
        self.actions
            .as_ref()
            .and_then(|a| a.route.as_ref())
            .map(|r| r.value.as_str())
    }
}
