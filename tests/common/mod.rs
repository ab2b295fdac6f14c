//! Common test utilities
//!
//! rustls setup for the Pact tests, and in-memory stand-ins for the
//! Kubernetes API used by the reconciler integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::error::ErrorResponse;
use kube::runtime::events::EventType;
use kube::Resource;
use pagerduty_operator::controller::events::EventPublisher;
use pagerduty_operator::controller::reconciler::{
    object_key, ObjectStore, Reconciler, ReconcilerError, ReconcilerSettings, SecretReader,
};
use pagerduty_operator::crd::{PagerdutyRuleset, PagerdutyService};
use pagerduty_operator::provider::{
    EscalationPolicy, EscalationPolicyClient, InMemoryPagerduty, PagerdutyClient, PagerdutyError,
    PagerdutyResult, Ruleset, RulesetClient, RulesetRule, RulesetRuleClient, Service,
    ServiceClient,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, Once};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` so it is only installed once per test binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Objects of one kind keyed by `(namespace, name)`
///
/// `replace` drops an object once it is marked for deletion and carries no
/// finalizers, like the API server does.
pub struct MemoryStore<K> {
    objects: Mutex<HashMap<(String, String), K>>,
    /// (status patches still allowed, status patches to reject after that)
    status_failures: Mutex<(usize, usize)>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            status_failures: Mutex::new((0, 0)),
        }
    }
}

impl<K> MemoryStore<K> {
    /// Let `allowed` status patches through, then reject the next `count`
    pub fn fail_status_patches(&self, allowed: usize, count: usize) {
        *self.status_failures.lock().unwrap() = (allowed, count);
    }

    fn take_status_failure(&self) -> bool {
        let mut failures = self.status_failures.lock().unwrap();
        match *failures {
            (0, 0) => false,
            (0, count) => {
                failures.1 = count - 1;
                true
            }
            (allowed, count) => {
                *failures = (allowed - 1, count);
                false
            }
        }
    }
}

impl<K: Resource + Clone> MemoryStore<K> {
    pub fn insert(&self, obj: K) {
        let key = object_key(&obj).expect("test objects are namespaced and named");
        self.objects.lock().unwrap().insert(key, obj);
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Mark the stored object for deletion, as `kubectl delete` would
    pub fn mark_deleted(&self, namespace: &str, name: &str) {
        let mut objects = self.objects.lock().unwrap();
        let obj = objects
            .get_mut(&(namespace.to_string(), name.to_string()))
            .expect("object to delete exists");
        obj.meta_mut().deletion_timestamp = Some(Time(chrono::Utc::now()));
    }
}

#[async_trait]
impl<K> ObjectStore<K> for MemoryStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn replace(&self, obj: &K) -> Result<K, ReconcilerError> {
        let key = object_key(obj)?;
        let mut objects = self.objects.lock().unwrap();
        let meta = obj.meta();
        let finalizers_empty = meta.finalizers.as_ref().is_none_or(Vec::is_empty);
        if meta.deletion_timestamp.is_some() && finalizers_empty {
            objects.remove(&key);
        } else {
            objects.insert(key, obj.clone());
        }
        Ok(obj.clone())
    }

    async fn patch_status(&self, obj: &K, status: serde_json::Value) -> Result<K, ReconcilerError> {
        let key = object_key(obj)?;
        if self.take_status_failure() {
            return Err(ReconcilerError::Kube(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: "the server is currently unable to handle the request".to_string(),
                reason: "ServiceUnavailable".to_string(),
                code: 503,
            })));
        }
        let mut objects = self.objects.lock().unwrap();
        let stored = objects
            .get_mut(&key)
            .unwrap_or_else(|| panic!("status patch for missing object {key:?}"));

        let mut value = serde_json::to_value(&*stored)?;
        let current = value
            .as_object_mut()
            .expect("custom resources serialize to objects")
            .entry("status")
            .or_insert_with(|| serde_json::json!({}));
        if let (Some(current), Some(patch)) = (current.as_object_mut(), status.as_object()) {
            for (field, patched) in patch {
                if patched.is_null() {
                    current.remove(field);
                } else {
                    current.insert(field.clone(), patched.clone());
                }
            }
        }

        *stored = serde_json::from_value(value)?;
        Ok(stored.clone())
    }
}

/// Secrets keyed by `(namespace, name)`
#[derive(Default)]
pub struct MemorySecrets {
    secrets: Mutex<HashMap<(String, String), BTreeMap<String, Vec<u8>>>>,
}

impl MemorySecrets {
    pub fn insert(&self, namespace: &str, name: &str, key: &str, value: &str) {
        self.secrets
            .lock()
            .unwrap()
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value.as_bytes().to_vec());
    }
}

#[async_trait]
impl SecretReader for MemorySecrets {
    async fn read_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>, ReconcilerError> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub type_: EventType,
    pub reason: String,
    pub note: Option<String>,
}

/// Keeps every published event for later assertions
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    pub fn reasons(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.reason.clone())
            .collect()
    }

    pub fn last(&self) -> Option<RecordedEvent> {
        self.events.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl EventPublisher for RecordingEvents {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        self.events.lock().unwrap().push(RecordedEvent {
            type_,
            reason: reason.to_string(),
            note,
        });
    }
}

pub const NAMESPACE: &str = "default";
pub const SHARED_RULESET: &str = "PSHARED";
pub const ESCALATION_POLICY: &str = "PPOLICY";

/// Everything a reconciler test needs, sharing state with the context
pub struct Harness {
    pub pagerduty: Arc<InMemoryPagerduty>,
    pub services: Arc<MemoryStore<PagerdutyService>>,
    pub rulesets: Arc<MemoryStore<PagerdutyRuleset>>,
    pub secrets: Arc<MemorySecrets>,
    pub events: Arc<RecordingEvents>,
    pub ctx: Arc<Reconciler>,
}

/// Build a reconciler over in-memory stores. The shared ruleset and the
/// escalation policy already exist remotely.
pub fn harness(settings: ReconcilerSettings) -> Harness {
    let pagerduty = Arc::new(InMemoryPagerduty::new().with_escalation_policy(ESCALATION_POLICY));
    pagerduty.insert_ruleset_with_id(SHARED_RULESET, "shared");

    let services = Arc::new(MemoryStore::default());
    let rulesets = Arc::new(MemoryStore::default());
    let secrets = Arc::new(MemorySecrets::default());
    let events = Arc::new(RecordingEvents::default());

    let ctx = Arc::new(Reconciler::new(
        Arc::clone(&pagerduty) as Arc<dyn PagerdutyClient>,
        Arc::clone(&services) as Arc<dyn ObjectStore<PagerdutyService>>,
        Arc::clone(&rulesets) as Arc<dyn ObjectStore<PagerdutyRuleset>>,
        Arc::clone(&secrets) as Arc<dyn SecretReader>,
        Arc::clone(&events) as Arc<dyn EventPublisher>,
        settings,
    ));

    Harness {
        pagerduty,
        services,
        rulesets,
        secrets,
        events,
        ctx,
    }
}

impl Harness {
    /// Same stores and settings, PagerDuty reached through `client`
    pub fn with_pagerduty(&self, client: Arc<dyn PagerdutyClient>) -> Arc<Reconciler> {
        Arc::new(Reconciler::new(
            client,
            Arc::clone(&self.services) as Arc<dyn ObjectStore<PagerdutyService>>,
            Arc::clone(&self.rulesets) as Arc<dyn ObjectStore<PagerdutyRuleset>>,
            Arc::clone(&self.secrets) as Arc<dyn SecretReader>,
            Arc::clone(&self.events) as Arc<dyn EventPublisher>,
            self.ctx.settings.clone(),
        ))
    }
}

fn server_error() -> PagerdutyError {
    PagerdutyError::Api {
        status: 500,
        message: "internal".to_string(),
    }
}

/// Delegates to an in-memory store, answering selected calls with HTTP 500
pub struct FaultyPagerduty {
    pub inner: Arc<InMemoryPagerduty>,
    pub fail_escalation_policy: bool,
    pub fail_delete_service: bool,
}

impl FaultyPagerduty {
    pub fn new(inner: Arc<InMemoryPagerduty>) -> Self {
        Self {
            inner,
            fail_escalation_policy: false,
            fail_delete_service: false,
        }
    }
}

#[async_trait]
impl EscalationPolicyClient for FaultyPagerduty {
    async fn get_escalation_policy(&self, id: &str) -> PagerdutyResult<EscalationPolicy> {
        if self.fail_escalation_policy {
            return Err(server_error());
        }
        self.inner.get_escalation_policy(id).await
    }
}

#[async_trait]
impl ServiceClient for FaultyPagerduty {
    async fn get_service(&self, id: &str) -> PagerdutyResult<Service> {
        self.inner.get_service(id).await
    }

    async fn create_service(&self, service: &Service) -> PagerdutyResult<Service> {
        self.inner.create_service(service).await
    }

    async fn update_service(&self, id: &str, service: &Service) -> PagerdutyResult<Service> {
        self.inner.update_service(id, service).await
    }

    async fn delete_service(&self, id: &str) -> PagerdutyResult<()> {
        if self.fail_delete_service {
            return Err(server_error());
        }
        self.inner.delete_service(id).await
    }

    async fn list_services(&self, query: &str) -> PagerdutyResult<Vec<Service>> {
        self.inner.list_services(query).await
    }
}

#[async_trait]
impl RulesetClient for FaultyPagerduty {
    async fn list_rulesets(&self) -> PagerdutyResult<Vec<Ruleset>> {
        self.inner.list_rulesets().await
    }

    async fn get_ruleset(&self, id: &str) -> PagerdutyResult<Ruleset> {
        self.inner.get_ruleset(id).await
    }

    async fn create_ruleset(&self, ruleset: &Ruleset) -> PagerdutyResult<Ruleset> {
        self.inner.create_ruleset(ruleset).await
    }

    async fn update_ruleset(&self, id: &str, ruleset: &Ruleset) -> PagerdutyResult<Ruleset> {
        self.inner.update_ruleset(id, ruleset).await
    }

    async fn delete_ruleset(&self, id: &str) -> PagerdutyResult<()> {
        self.inner.delete_ruleset(id).await
    }
}

#[async_trait]
impl RulesetRuleClient for FaultyPagerduty {
    async fn list_rules(&self, ruleset_id: &str) -> PagerdutyResult<Vec<RulesetRule>> {
        self.inner.list_rules(ruleset_id).await
    }

    async fn get_rule(&self, ruleset_id: &str, rule_id: &str) -> PagerdutyResult<RulesetRule> {
        self.inner.get_rule(ruleset_id, rule_id).await
    }

    async fn create_rule(
        &self,
        ruleset_id: &str,
        rule: &RulesetRule,
    ) -> PagerdutyResult<RulesetRule> {
        self.inner.create_rule(ruleset_id, rule).await
    }

    async fn update_rule(
        &self,
        ruleset_id: &str,
        rule_id: &str,
        rule: &RulesetRule,
    ) -> PagerdutyResult<RulesetRule> {
        self.inner.update_rule(ruleset_id, rule_id, rule).await
    }

    async fn delete_rule(&self, ruleset_id: &str, rule_id: &str) -> PagerdutyResult<()> {
        self.inner.delete_rule(ruleset_id, rule_id).await
    }
}

pub fn settings() -> ReconcilerSettings {
    ReconcilerSettings::new(SHARED_RULESET)
}
