//! # Response Types
//!
//! PagerDuty REST API response envelopes. A missing payload is reported as
//! `PagerdutyError::EmptyResponse` by the caller.

use crate::provider::{EscalationPolicy, Ruleset, RulesetRule, Service};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ServiceResponse {
    pub service: Option<Service>,
}

#[derive(Debug, Deserialize)]
pub struct RulesetResponse {
    pub ruleset: Option<Ruleset>,
}

#[derive(Debug, Deserialize)]
pub struct RuleResponse {
    pub rule: Option<RulesetRule>,
}

#[derive(Debug, Deserialize)]
pub struct EscalationPolicyResponse {
    pub escalation_policy: Option<EscalationPolicy>,
}

/// Offset pagination fields shared by list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub more: bool,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
}

impl Pagination {
    /// Offset of the following page, or `None` on the last page
    pub fn next_offset(&self, page_len: usize) -> Option<u32> {
        if !self.more || page_len == 0 {
            return None;
        }
        let step = if self.limit > 0 {
            self.limit
        } else {
            u32::try_from(page_len).unwrap_or(u32::MAX)
        };
        Some(self.offset.saturating_add(step))
    }
}

#[derive(Debug, Deserialize)]
pub struct RulesetListResponse {
    #[serde(default)]
    pub rulesets: Vec<Ruleset>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct RuleListResponse {
    #[serde(default)]
    pub rules: Vec<RulesetRule>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct ServiceListResponse {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

/// Error body: `{"error": {"message": .., "code": .., "errors": [..]}}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ErrorBody {
    pub fn describe(&self) -> String {
        if self.errors.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.message, self.errors.join(", "))
        }
    }
}
