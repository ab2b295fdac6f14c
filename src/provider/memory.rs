//! # In-Memory PagerDuty
//!
//! Keyed in-memory implementation of every capability trait. Identifiers are
//! generated the way PagerDuty shapes them (`P` followed by six characters).
//! Missing objects yield `PagerdutyError::NotFound`, and service names are
//! unique across the store just like in a real account. Ruleset names are not
//! unique, which is what makes ambiguous adoption observable.

use crate::provider::{
    ApiReference, EscalationPolicy, EscalationPolicyClient, PagerdutyError, PagerdutyResult,
    Ruleset, RulesetClient, RulesetRule, RulesetRuleClient, Service, ServiceClient,
};
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct InMemoryPagerduty {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    escalation_policies: BTreeMap<String, EscalationPolicy>,
    services: BTreeMap<String, Service>,
    rulesets: BTreeMap<String, Ruleset>,
    /// ruleset ID -> rule ID -> rule
    rules: BTreeMap<String, BTreeMap<String, RulesetRule>>,
}

impl State {
    fn generate_id(&self) -> String {
        loop {
            let suffix: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(6)
                .map(char::from)
                .collect();
            let id = format!("P{}", suffix.to_uppercase());
            let taken = self.escalation_policies.contains_key(&id)
                || self.services.contains_key(&id)
                || self.rulesets.contains_key(&id)
                || self.rules.values().any(|rules| rules.contains_key(&id));
            if !taken {
                return id;
            }
        }
    }
}

impl InMemoryPagerduty {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_escalation_policy(self, id: &str) -> Self {
        self.insert_escalation_policy(id);
        self
    }

    pub fn insert_escalation_policy(&self, id: &str) {
        self.lock().escalation_policies.insert(
            id.to_string(),
            EscalationPolicy {
                id: id.to_string(),
                name: format!("policy {id}"),
            },
        );
    }

    /// Seed a ruleset that already exists remotely; returns its ID
    pub fn insert_ruleset(&self, name: &str) -> String {
        let mut state = self.lock();
        let id = state.generate_id();
        state.rulesets.insert(
            id.clone(),
            Ruleset {
                id: Some(id.clone()),
                name: name.to_string(),
                routing_keys: Vec::new(),
            },
        );
        state.rules.insert(id.clone(), BTreeMap::new());
        id
    }

    /// Seed a ruleset under a fixed ID (e.g. the shared routing ruleset)
    pub fn insert_ruleset_with_id(&self, id: &str, name: &str) {
        let mut state = self.lock();
        state.rulesets.insert(
            id.to_string(),
            Ruleset {
                id: Some(id.to_string()),
                name: name.to_string(),
                routing_keys: Vec::new(),
            },
        );
        state.rules.entry(id.to_string()).or_default();
    }

    pub fn ruleset_count(&self) -> usize {
        self.lock().rulesets.len()
    }

    pub fn service_count(&self) -> usize {
        self.lock().services.len()
    }

    pub fn rules(&self, ruleset_id: &str) -> Vec<RulesetRule> {
        self.lock()
            .rules
            .get(ruleset_id)
            .map(|rules| rules.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EscalationPolicyClient for InMemoryPagerduty {
    async fn get_escalation_policy(&self, id: &str) -> PagerdutyResult<EscalationPolicy> {
        self.lock()
            .escalation_policies
            .get(id)
            .cloned()
            .ok_or_else(|| PagerdutyError::not_found("escalation policy", id))
    }
}

#[async_trait]
impl ServiceClient for InMemoryPagerduty {
    async fn get_service(&self, id: &str) -> PagerdutyResult<Service> {
        self.lock()
            .services
            .get(id)
            .cloned()
            .ok_or_else(|| PagerdutyError::not_found("service", id))
    }

    async fn create_service(&self, service: &Service) -> PagerdutyResult<Service> {
        let mut state = self.lock();
        if state.services.values().any(|s| s.name == service.name) {
            return Err(PagerdutyError::Api {
                status: 400,
                message: format!("Invalid Input Provided: Name {} has already been taken", service.name),
            });
        }
        let id = state.generate_id();
        let created = Service {
            id: Some(id.clone()),
            ..service.clone()
        };
        state.services.insert(id, created.clone());
        Ok(created)
    }

    async fn update_service(&self, id: &str, service: &Service) -> PagerdutyResult<Service> {
        let mut state = self.lock();
        let stored = state
            .services
            .get_mut(id)
            .ok_or_else(|| PagerdutyError::not_found("service", id))?;
        *stored = Service {
            id: Some(id.to_string()),
            ..service.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_service(&self, id: &str) -> PagerdutyResult<()> {
        self.lock()
            .services
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PagerdutyError::not_found("service", id))
    }

    async fn list_services(&self, query: &str) -> PagerdutyResult<Vec<Service>> {
        Ok(self
            .lock()
            .services
            .values()
            .filter(|s| s.name.contains(query))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RulesetClient for InMemoryPagerduty {
    async fn list_rulesets(&self) -> PagerdutyResult<Vec<Ruleset>> {
        Ok(self.lock().rulesets.values().cloned().collect())
    }

    async fn get_ruleset(&self, id: &str) -> PagerdutyResult<Ruleset> {
        self.lock()
            .rulesets
            .get(id)
            .cloned()
            .ok_or_else(|| PagerdutyError::not_found("ruleset", id))
    }

    async fn create_ruleset(&self, ruleset: &Ruleset) -> PagerdutyResult<Ruleset> {
        let mut state = self.lock();
        let id = state.generate_id();
        let created = Ruleset {
            id: Some(id.clone()),
            ..ruleset.clone()
        };
        state.rulesets.insert(id.clone(), created.clone());
        state.rules.insert(id, BTreeMap::new());
        Ok(created)
    }

    async fn update_ruleset(&self, id: &str, ruleset: &Ruleset) -> PagerdutyResult<Ruleset> {
        let mut state = self.lock();
        let stored = state
            .rulesets
            .get_mut(id)
            .ok_or_else(|| PagerdutyError::not_found("ruleset", id))?;
        *stored = Ruleset {
            id: Some(id.to_string()),
            ..ruleset.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_ruleset(&self, id: &str) -> PagerdutyResult<()> {
        let mut state = self.lock();
        state
            .rulesets
            .remove(id)
            .ok_or_else(|| PagerdutyError::not_found("ruleset", id))?;
        state.rules.remove(id);
        Ok(())
    }
}

#[async_trait]
impl RulesetRuleClient for InMemoryPagerduty {
    async fn list_rules(&self, ruleset_id: &str) -> PagerdutyResult<Vec<RulesetRule>> {
        self.lock()
            .rules
            .get(ruleset_id)
            .map(|rules| rules.values().cloned().collect())
            .ok_or_else(|| PagerdutyError::not_found("ruleset", ruleset_id))
    }

    async fn get_rule(&self, ruleset_id: &str, rule_id: &str) -> PagerdutyResult<RulesetRule> {
        self.lock()
            .rules
            .get(ruleset_id)
            .and_then(|rules| rules.get(rule_id))
            .cloned()
            .ok_or_else(|| PagerdutyError::not_found("rule", rule_id))
    }

    async fn create_rule(
        &self,
        ruleset_id: &str,
        rule: &RulesetRule,
    ) -> PagerdutyResult<RulesetRule> {
        let mut state = self.lock();
        if !state.rulesets.contains_key(ruleset_id) {
            return Err(PagerdutyError::not_found("ruleset", ruleset_id));
        }
        let id = state.generate_id();
        let created = RulesetRule {
            id: Some(id.clone()),
            ruleset: Some(ApiReference::ruleset(ruleset_id)),
            ..rule.clone()
        };
        state
            .rules
            .entry(ruleset_id.to_string())
            .or_default()
            .insert(id, created.clone());
        Ok(created)
    }

    async fn update_rule(
        &self,
        ruleset_id: &str,
        rule_id: &str,
        rule: &RulesetRule,
    ) -> PagerdutyResult<RulesetRule> {
        let mut state = self.lock();
        let stored = state
            .rules
            .get_mut(ruleset_id)
            .and_then(|rules| rules.get_mut(rule_id))
            .ok_or_else(|| PagerdutyError::not_found("rule", rule_id))?;
        *stored = RulesetRule {
            id: Some(rule_id.to_string()),
            ruleset: Some(ApiReference::ruleset(ruleset_id)),
            ..rule.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_rule(&self, ruleset_id: &str, rule_id: &str) -> PagerdutyResult<()> {
        self.lock()
            .rules
            .get_mut(ruleset_id)
            .and_then(|rules| rules.remove(rule_id))
            .map(|_| ())
            .ok_or_else(|| PagerdutyError::not_found("rule", rule_id))
    }
}
