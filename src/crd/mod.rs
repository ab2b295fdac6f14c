//! # Custom Resource Definitions
//!
//! CRD types for the PagerDuty operator.
//!
//! ## Module Structure
//!
//! - `service.rs` - `PagerdutyService`: a remote service plus its routing rule
//! - `ruleset.rs` - `PagerdutyRuleset`: a remote ruleset, adopted or created by name

mod ruleset;
mod service;

pub use ruleset::{PagerdutyRuleset, PagerdutyRulesetSpec, PagerdutyRulesetStatus};
pub use service::{
    EscalationPolicySecretRef, LabelMatch, PagerdutyService, PagerdutyServiceSpec,
    PagerdutyServiceStatus, STATUS_SUCCESS,
};

/// API group shared by both custom resources
pub const API_GROUP: &str = "core.strateos.com";

/// Treat `Some("")` the same as `None`; both mean "not set yet"
pub(crate) fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}
