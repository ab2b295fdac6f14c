//! # PagerDuty Providers
//!
//! Narrow capability traits, one per remote resource family, so reconcilers
//! and tests can substitute each independently.
//!
//! Implementations:
//! - `pagerduty::PagerdutyREST` - the PagerDuty REST API v2
//! - `memory::InMemoryPagerduty` - keyed in-memory store with generated IDs

use async_trait::async_trait;

mod error;
pub mod memory;
mod model;
pub mod pagerduty;

pub use error::PagerdutyError;
pub use memory::InMemoryPagerduty;
pub use model::*;
pub use pagerduty::PagerdutyREST;

pub type PagerdutyResult<T> = Result<T, PagerdutyError>;

#[async_trait]
pub trait EscalationPolicyClient: Send + Sync {
    async fn get_escalation_policy(&self, id: &str) -> PagerdutyResult<EscalationPolicy>;
}

#[async_trait]
pub trait ServiceClient: Send + Sync {
    async fn get_service(&self, id: &str) -> PagerdutyResult<Service>;

    async fn create_service(&self, service: &Service) -> PagerdutyResult<Service>;

    /// Full replace of the remote representation
    async fn update_service(&self, id: &str, service: &Service) -> PagerdutyResult<Service>;

    async fn delete_service(&self, id: &str) -> PagerdutyResult<()>;

    /// Services whose name matches `query` (server-side search, may be fuzzy)
    async fn list_services(&self, query: &str) -> PagerdutyResult<Vec<Service>>;
}

#[async_trait]
pub trait RulesetClient: Send + Sync {
    /// Every ruleset in the account, all pages
    async fn list_rulesets(&self) -> PagerdutyResult<Vec<Ruleset>>;

    async fn get_ruleset(&self, id: &str) -> PagerdutyResult<Ruleset>;

    async fn create_ruleset(&self, ruleset: &Ruleset) -> PagerdutyResult<Ruleset>;

    async fn update_ruleset(&self, id: &str, ruleset: &Ruleset) -> PagerdutyResult<Ruleset>;

    async fn delete_ruleset(&self, id: &str) -> PagerdutyResult<()>;
}

#[async_trait]
pub trait RulesetRuleClient: Send + Sync {
    /// Every rule of `ruleset_id`, all pages
    async fn list_rules(&self, ruleset_id: &str) -> PagerdutyResult<Vec<RulesetRule>>;

    async fn get_rule(&self, ruleset_id: &str, rule_id: &str) -> PagerdutyResult<RulesetRule>;

    async fn create_rule(&self, ruleset_id: &str, rule: &RulesetRule)
        -> PagerdutyResult<RulesetRule>;

    async fn update_rule(
        &self,
        ruleset_id: &str,
        rule_id: &str,
        rule: &RulesetRule,
    ) -> PagerdutyResult<RulesetRule>;

    async fn delete_rule(&self, ruleset_id: &str, rule_id: &str) -> PagerdutyResult<()>;
}

/// Everything the reconcilers need from PagerDuty
pub trait PagerdutyClient:
    EscalationPolicyClient + ServiceClient + RulesetClient + RulesetRuleClient
{
}

impl<T> PagerdutyClient for T where
    T: EscalationPolicyClient + ServiceClient + RulesetClient + RulesetRuleClient
{
}
