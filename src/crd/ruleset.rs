//! # PagerdutyRuleset
//!
//! A remote ruleset identified by the resource name. Existing rulesets with
//! the same name are adopted instead of duplicated.

use serde::{Deserialize, Serialize};

/// PagerdutyRuleset Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: core.strateos.com/v1
/// kind: PagerdutyRuleset
/// metadata:
///   name: production-alerts
///   namespace: default
/// spec:
///   catchallService: platform-oncall
/// ```
#[derive(
    kube::CustomResource,
    Debug,
    Clone,
    Default,
    Deserialize,
    Serialize,
    schemars::JsonSchema,
    PartialEq,
)]
#[kube(
    kind = "PagerdutyRuleset",
    group = "core.strateos.com",
    version = "v1",
    namespaced,
    status = "crate::crd::PagerdutyRulesetStatus",
    shortname = "pdrs",
    printcolumn = r#"{"name":"Ruleset", "type":"string", "jsonPath":".status.rulesetID"}, {"name":"Adopted", "type":"boolean", "jsonPath":".status.adopted"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PagerdutyRulesetSpec {
    /// Service that should receive unmatched alerts.
    /// Carried for future catch-all routing; not acted on yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catchall_service: Option<String>,
}

/// Observed state of a PagerdutyRuleset
///
/// `rulesetID` never changes once set. `created`/`adopted` are decided on the
/// first successful resolution and never flipped afterwards.
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema, PartialEq, Eq)]
pub struct PagerdutyRulesetStatus {
    #[serde(rename = "rulesetID", default, skip_serializing_if = "Option::is_none")]
    pub ruleset_id: Option<String>,
    /// The operator created the remote ruleset and owns its deletion
    #[serde(default)]
    pub created: bool,
    /// The remote ruleset already existed; it is never deleted by the operator
    #[serde(default)]
    pub adopted: bool,
}

impl PagerdutyRulesetStatus {
    pub fn ruleset_id(&self) -> Option<&str> {
        super::non_empty(self.ruleset_id.as_ref())
    }

    /// Only rulesets this operator created are deleted on cleanup
    pub fn owns_remote(&self) -> bool {
        self.ruleset_id().is_some() && self.created && !self.adopted
    }
}
