//! # PagerdutyService
//!
//! Desired state of a PagerDuty service and the routing rule that sends
//! matching alerts to it.

use serde::{Deserialize, Serialize};

/// Value written to `status.status` after a fully successful reconcile
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// PagerdutyService Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: core.strateos.com/v1
/// kind: PagerdutyService
/// metadata:
///   name: test-service
///   namespace: default
/// spec:
///   description: Testing the operator
///   escalationPolicySecret:
///     name: pagerduty-policies
///     key: platform
///   matchLabels:
///     - key: foo
///       value: bar
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema, PartialEq,
)]
#[kube(
    kind = "PagerdutyService",
    group = "core.strateos.com",
    version = "v1",
    namespaced,
    status = "crate::crd::PagerdutyServiceStatus",
    shortname = "pds",
    printcolumn = r#"{"name":"Service", "type":"string", "jsonPath":".status.serviceName"}, {"name":"Status", "type":"string", "jsonPath":".status.status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PagerdutyServiceSpec {
    /// Human-readable description copied onto the remote service
    #[serde(default)]
    pub description: String,
    /// Literal escalation policy ID. Takes precedence over `escalationPolicySecret`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_policy: Option<String>,
    /// Secret in the same namespace holding the escalation policy ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_policy_secret: Option<EscalationPolicySecretRef>,
    /// Alerts are routed to this service when every pair matches a firing label
    #[schemars(length(min = 1))]
    pub match_labels: Vec<LabelMatch>,
}

/// Pointer to one key of a Secret
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema, PartialEq, Eq)]
pub struct EscalationPolicySecretRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
}

/// One `key = value` label match
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema, PartialEq, Eq)]
pub struct LabelMatch {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl LabelMatch {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Observed state of a PagerdutyService
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema, PartialEq, Eq)]
pub struct PagerdutyServiceStatus {
    /// Remote service ID
    #[serde(rename = "serviceID", default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// Remote service name (prefix and suffix included)
    #[serde(rename = "serviceName", default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// ID of the routing rule owned by this service in the shared ruleset
    #[serde(rename = "ruleID", default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Outcome of the last reconcile: `SUCCESS` or `ERROR: <message>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PagerdutyServiceStatus {
    pub fn service_id(&self) -> Option<&str> {
        super::non_empty(self.service_id.as_ref())
    }

    /// Recorded before the remote service is created, so it can be set without an ID
    pub fn service_name(&self) -> Option<&str> {
        super::non_empty(self.service_name.as_ref())
    }

    pub fn rule_id(&self) -> Option<&str> {
        super::non_empty(self.rule_id.as_ref())
    }

    /// Record the outcome of an operation in the free-text status field
    pub fn record_outcome<E: std::fmt::Display>(&mut self, outcome: Result<(), E>) {
        self.status = Some(match outcome {
            Ok(()) => STATUS_SUCCESS.to_string(),
            Err(e) => format!("ERROR: {e}"),
        });
    }
}

impl PagerdutyService {
    pub fn status_or_default(&self) -> PagerdutyServiceStatus {
        self.status.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcome_success_and_error() {
        let mut status = PagerdutyServiceStatus::default();
        status.record_outcome::<String>(Ok(()));
        assert_eq!(status.status.as_deref(), Some("SUCCESS"));

        status.record_outcome(Err("secret missing"));
        assert_eq!(status.status.as_deref(), Some("ERROR: secret missing"));
    }

    #[test]
    fn test_empty_ids_are_unset() {
        let status = PagerdutyServiceStatus {
            service_id: Some(String::new()),
            rule_id: Some("R1".to_string()),
            ..Default::default()
        };
        assert_eq!(status.service_id(), None);
        assert_eq!(status.rule_id(), Some("R1"));
    }

    #[test]
    fn test_status_field_names() {
        let status = PagerdutyServiceStatus {
            service_id: Some("S1".to_string()),
            service_name: Some("whatever-test".to_string()),
            rule_id: Some("R1".to_string()),
            status: Some(STATUS_SUCCESS.to_string()),
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["serviceID"], "S1");
        assert_eq!(value["serviceName"], "whatever-test");
        assert_eq!(value["ruleID"], "R1");
        assert_eq!(value["status"], "SUCCESS");
    }
}
