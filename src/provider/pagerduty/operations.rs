//! # CRUD Operations
//!
//! Implementation of the capability traits for the PagerDuty REST API.
//! Every call runs in a `pagerduty.<resource>.<operation>` span and is
//! counted in the API request metrics.

use super::{
    EscalationPolicyResponse, PagerdutyREST, RuleListResponse, RuleRequest, RuleResponse,
    RulesetListResponse,
    RulesetRequest, RulesetResponse, ServiceListResponse, ServiceRequest, ServiceResponse,
};
use crate::observability::metrics;
use crate::provider::{
    EscalationPolicy, EscalationPolicyClient, PagerdutyError, PagerdutyResult, Ruleset,
    RulesetClient, RulesetRule, RulesetRuleClient, Service, ServiceClient,
};
use async_trait::async_trait;
use reqwest::Method;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, debug_span, Instrument};

/// Time a remote call and record its outcome
async fn track<T, F>(resource: &str, operation: &str, call: F) -> PagerdutyResult<T>
where
    F: Future<Output = PagerdutyResult<T>>,
{
    let start = Instant::now();
    let result = call.await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(e) if e.is_not_found() => "not_found",
        Err(_) => "error",
    };
    metrics::record_api_request(resource, operation, outcome, start.elapsed().as_secs_f64());
    result
}

#[async_trait]
impl EscalationPolicyClient for PagerdutyREST {
    async fn get_escalation_policy(&self, id: &str) -> PagerdutyResult<EscalationPolicy> {
        let span = debug_span!("pagerduty.escalation_policy.get", escalation_policy.id = id);
        track("escalation_policy", "get", async {
            let request = self.make_request(Method::GET, &format!("/escalation_policies/{id}"));
            let response: EscalationPolicyResponse =
                self.execute(request, "escalation policy", id).await?;
            response
                .escalation_policy
                .ok_or(PagerdutyError::EmptyResponse("escalation_policy"))
        })
        .instrument(span)
        .await
    }
}

#[async_trait]
impl ServiceClient for PagerdutyREST {
    async fn get_service(&self, id: &str) -> PagerdutyResult<Service> {
        let span = debug_span!("pagerduty.service.get", service.id = id);
        track("service", "get", async {
            let request = self.make_request(Method::GET, &format!("/services/{id}"));
            let response: ServiceResponse = self.execute(request, "service", id).await?;
            response
                .service
                .ok_or(PagerdutyError::EmptyResponse("service"))
        })
        .instrument(span)
        .await
    }

    async fn create_service(&self, service: &Service) -> PagerdutyResult<Service> {
        let span = debug_span!("pagerduty.service.create", service.name = %service.name);
        track("service", "create", async {
            let request = self
                .make_request(Method::POST, "/services")
                .json(&ServiceRequest { service });
            let response: ServiceResponse =
                self.execute(request, "service", &service.name).await?;
            let created = response
                .service
                .ok_or(PagerdutyError::EmptyResponse("service"))?;
            debug!("Created service {} ({:?})", created.name, created.id);
            Ok(created)
        })
        .instrument(span)
        .await
    }

    async fn update_service(&self, id: &str, service: &Service) -> PagerdutyResult<Service> {
        let span = debug_span!("pagerduty.service.update", service.id = id);
        track("service", "update", async {
            let request = self
                .make_request(Method::PUT, &format!("/services/{id}"))
                .json(&ServiceRequest { service });
            let response: ServiceResponse = self.execute(request, "service", id).await?;
            response
                .service
                .ok_or(PagerdutyError::EmptyResponse("service"))
        })
        .instrument(span)
        .await
    }

    async fn delete_service(&self, id: &str) -> PagerdutyResult<()> {
        let span = debug_span!("pagerduty.service.delete", service.id = id);
        track("service", "delete", async {
            let request = self.make_request(Method::DELETE, &format!("/services/{id}"));
            self.execute_empty(request, "service", id).await
        })
        .instrument(span)
        .await
    }

    async fn list_services(&self, query: &str) -> PagerdutyResult<Vec<Service>> {
        let span = debug_span!("pagerduty.service.list", query = query);
        track("service", "list", async {
            let mut services = Vec::new();
            let mut offset = 0u32;
            loop {
                let mut request = self
                    .make_request(Method::GET, "/services")
                    .query(&[("query", query)]);
                if offset > 0 {
                    request = request.query(&[("offset", offset)]);
                }
                let page: ServiceListResponse = self.execute(request, "services", query).await?;
                let next = page.pagination.next_offset(page.services.len());
                services.extend(page.services);
                match next {
                    Some(n) => offset = n,
                    None => break,
                }
            }
            Ok(services)
        })
        .instrument(span)
        .await
    }
}

#[async_trait]
impl RulesetClient for PagerdutyREST {
    async fn list_rulesets(&self) -> PagerdutyResult<Vec<Ruleset>> {
        let span = debug_span!("pagerduty.ruleset.list");
        track("ruleset", "list", async {
            let mut rulesets = Vec::new();
            let mut offset = 0u32;
            loop {
                let mut request = self.make_request(Method::GET, "/rulesets");
                if offset > 0 {
                    request = request.query(&[("offset", offset)]);
                }
                let page: RulesetListResponse = self.execute(request, "rulesets", "").await?;
                let next = page.pagination.next_offset(page.rulesets.len());
                rulesets.extend(page.rulesets);
                match next {
                    Some(n) => offset = n,
                    None => break,
                }
            }
            debug!("Listed {} rulesets", rulesets.len());
            Ok(rulesets)
        })
        .instrument(span)
        .await
    }

    async fn get_ruleset(&self, id: &str) -> PagerdutyResult<Ruleset> {
        let span = debug_span!("pagerduty.ruleset.get", ruleset.id = id);
        track("ruleset", "get", async {
            let request = self.make_request(Method::GET, &format!("/rulesets/{id}"));
            let response: RulesetResponse = self.execute(request, "ruleset", id).await?;
            response
                .ruleset
                .ok_or(PagerdutyError::EmptyResponse("ruleset"))
        })
        .instrument(span)
        .await
    }

    async fn create_ruleset(&self, ruleset: &Ruleset) -> PagerdutyResult<Ruleset> {
        let span = debug_span!("pagerduty.ruleset.create", ruleset.name = %ruleset.name);
        track("ruleset", "create", async {
            let request = self
                .make_request(Method::POST, "/rulesets")
                .json(&RulesetRequest { ruleset });
            let response: RulesetResponse =
                self.execute(request, "ruleset", &ruleset.name).await?;
            response
                .ruleset
                .ok_or(PagerdutyError::EmptyResponse("ruleset"))
        })
        .instrument(span)
        .await
    }

    async fn update_ruleset(&self, id: &str, ruleset: &Ruleset) -> PagerdutyResult<Ruleset> {
        let span = debug_span!("pagerduty.ruleset.update", ruleset.id = id);
        track("ruleset", "update", async {
            let request = self
                .make_request(Method::PUT, &format!("/rulesets/{id}"))
                .json(&RulesetRequest { ruleset });
            let response: RulesetResponse = self.execute(request, "ruleset", id).await?;
            response
                .ruleset
                .ok_or(PagerdutyError::EmptyResponse("ruleset"))
        })
        .instrument(span)
        .await
    }

    async fn delete_ruleset(&self, id: &str) -> PagerdutyResult<()> {
        let span = debug_span!("pagerduty.ruleset.delete", ruleset.id = id);
        track("ruleset", "delete", async {
            let request = self.make_request(Method::DELETE, &format!("/rulesets/{id}"));
            self.execute_empty(request, "ruleset", id).await
        })
        .instrument(span)
        .await
    }
}

#[async_trait]
impl RulesetRuleClient for PagerdutyREST {
    async fn list_rules(&self, ruleset_id: &str) -> PagerdutyResult<Vec<RulesetRule>> {
        let span = debug_span!("pagerduty.rule.list", ruleset.id = ruleset_id);
        track("rule", "list", async {
            let path = format!("/rulesets/{ruleset_id}/rules");
            let mut rules = Vec::new();
            let mut offset = 0u32;
            loop {
                let mut request = self.make_request(Method::GET, &path);
                if offset > 0 {
                    request = request.query(&[("offset", offset)]);
                }
                let page: RuleListResponse = self.execute(request, "ruleset", ruleset_id).await?;
                let next = page.pagination.next_offset(page.rules.len());
                rules.extend(page.rules);
                match next {
                    Some(n) => offset = n,
                    None => break,
                }
            }
            debug!("Listed {} rules in ruleset {}", rules.len(), ruleset_id);
            Ok(rules)
        })
        .instrument(span)
        .await
    }

    async fn get_rule(&self, ruleset_id: &str, rule_id: &str) -> PagerdutyResult<RulesetRule> {
        let span = debug_span!("pagerduty.rule.get", ruleset.id = ruleset_id, rule.id = rule_id);
        track("rule", "get", async {
            let request = self.make_request(
                Method::GET,
                &format!("/rulesets/{ruleset_id}/rules/{rule_id}"),
            );
            let response: RuleResponse = self.execute(request, "rule", rule_id).await?;
            response.rule.ok_or(PagerdutyError::EmptyResponse("rule"))
        })
        .instrument(span)
        .await
    }

    async fn create_rule(
        &self,
        ruleset_id: &str,
        rule: &RulesetRule,
    ) -> PagerdutyResult<RulesetRule> {
        let span = debug_span!("pagerduty.rule.create", ruleset.id = ruleset_id);
        track("rule", "create", async {
            let request = self
                .make_request(Method::POST, &format!("/rulesets/{ruleset_id}/rules"))
                .json(&RuleRequest { rule });
            let response: RuleResponse = self.execute(request, "ruleset", ruleset_id).await?;
            response.rule.ok_or(PagerdutyError::EmptyResponse("rule"))
        })
        .instrument(span)
        .await
    }

    async fn update_rule(
        &self,
        ruleset_id: &str,
        rule_id: &str,
        rule: &RulesetRule,
    ) -> PagerdutyResult<RulesetRule> {
        let span = debug_span!("pagerduty.rule.update", ruleset.id = ruleset_id, rule.id = rule_id);
        track("rule", "update", async {
            let request = self
                .make_request(
                    Method::PUT,
                    &format!("/rulesets/{ruleset_id}/rules/{rule_id}"),
                )
                .json(&RuleRequest { rule });
            let response: RuleResponse = self.execute(request, "rule", rule_id).await?;
            response.rule.ok_or(PagerdutyError::EmptyResponse("rule"))
        })
        .instrument(span)
        .await
    }

    async fn delete_rule(&self, ruleset_id: &str, rule_id: &str) -> PagerdutyResult<()> {
        let span = debug_span!("pagerduty.rule.delete", ruleset.id = ruleset_id, rule.id = rule_id);
        track("rule", "delete", async {
            let request = self.make_request(
                Method::DELETE,
                &format!("/rulesets/{ruleset_id}/rules/{rule_id}"),
            );
            self.execute_empty(request, "rule", rule_id).await
        })
        .instrument(span)
        .await
    }
}
