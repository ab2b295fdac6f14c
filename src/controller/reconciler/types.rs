//! # Reconciler Types
//!
//! Shared context, settings, and errors for both reconcilers.

use crate::config::OperatorConfig;
use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_REQUEUE_DELAY_SECS,
    DEFAULT_RESYNC_INTERVAL_SECS,
};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::events::EventPublisher;
use crate::controller::reconciler::store::{ObjectStore, SecretReader};
use crate::crd::{PagerdutyRuleset, PagerdutyService};
use crate::provider::{PagerdutyClient, PagerdutyError};
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },

    #[error("key {key} not found in secret {namespace}/{name}")]
    SecretKeyNotFound {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("Unable to get the escalation policy {0}")]
    EscalationPolicyUnavailable(String),

    #[error("found {count} remote {resource}s named {name}, refusing to pick one")]
    AmbiguousName {
        resource: &'static str,
        name: String,
        count: usize,
    },

    #[error("service {0} recorded in status no longer exists in PagerDuty")]
    RemoteServiceMissing(String),

    #[error("routing rule {0} recorded in status no longer exists in PagerDuty")]
    RemoteRuleMissing(String),

    #[error(transparent)]
    Pagerduty(#[from] PagerdutyError),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Failed to serialize status: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("object is missing its name or namespace")]
    MissingObjectKey,
}

impl ReconcilerError {
    /// Configuration a human has to fix; requeued after a fixed delay instead of backing off
    pub fn is_missing_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::SecretNotFound { .. }
                | Self::SecretKeyNotFound { .. }
                | Self::EscalationPolicyUnavailable(_)
        )
    }
}

/// Per-resource backoff state
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.backoff.reset();
        self.error_count = 0;
    }
}

/// Process-wide settings injected into both reconcilers
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Shared ruleset receiving every routing rule
    pub ruleset_id: String,
    pub service_prefix: String,
    pub service_suffix_length: usize,
    pub requeue_delay: Duration,
    pub resync_interval: Option<Duration>,
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,
}

impl ReconcilerSettings {
    pub fn new(ruleset_id: impl Into<String>) -> Self {
        Self {
            ruleset_id: ruleset_id.into(),
            service_prefix: String::new(),
            service_suffix_length: 0,
            requeue_delay: Duration::from_secs(DEFAULT_REQUEUE_DELAY_SECS),
            resync_interval: Some(Duration::from_secs(DEFAULT_RESYNC_INTERVAL_SECS)),
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
        }
    }

    /// Action after a successful pass
    pub fn success_action(&self) -> Action {
        match self.resync_interval {
            Some(interval) => Action::requeue(interval),
            None => Action::await_change(),
        }
    }
}

impl From<&OperatorConfig> for ReconcilerSettings {
    fn from(config: &OperatorConfig) -> Self {
        Self {
            ruleset_id: config.ruleset_id.clone(),
            service_prefix: config.service_prefix.clone(),
            service_suffix_length: config.service_suffix_length,
            requeue_delay: config.requeue_delay(),
            resync_interval: config.resync_interval(),
            backoff_min_secs: config.backoff_min_secs,
            backoff_max_secs: config.backoff_max_secs,
        }
    }
}

/// Reconciler context shared by every reconcile invocation
pub struct Reconciler {
    pub pagerduty: Arc<dyn PagerdutyClient>,
    pub services: Arc<dyn ObjectStore<PagerdutyService>>,
    pub rulesets: Arc<dyn ObjectStore<PagerdutyRuleset>>,
    pub secrets: Arc<dyn SecretReader>,
    pub events: Arc<dyn EventPublisher>,
    pub settings: ReconcilerSettings,
    /// Backoff state keyed by `kind/namespace/name`.
    /// Uses std::sync::Mutex; never held across an await.
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        pagerduty: Arc<dyn PagerdutyClient>,
        services: Arc<dyn ObjectStore<PagerdutyService>>,
        rulesets: Arc<dyn ObjectStore<PagerdutyRuleset>>,
        secrets: Arc<dyn SecretReader>,
        events: Arc<dyn EventPublisher>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            pagerduty,
            services,
            rulesets,
            secrets,
            events,
            settings,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Context over one store that serves both kinds and Secrets
    pub fn with_store<S>(
        pagerduty: Arc<dyn PagerdutyClient>,
        store: Arc<S>,
        events: Arc<dyn EventPublisher>,
        settings: ReconcilerSettings,
    ) -> Self
    where
        S: ObjectStore<PagerdutyService> + ObjectStore<PagerdutyRuleset> + SecretReader + 'static,
    {
        Self::new(
            pagerduty,
            Arc::<S>::clone(&store),
            Arc::<S>::clone(&store),
            store,
            events,
            settings,
        )
    }

    /// Next error backoff for `key`, as (seconds, error count)
    pub fn next_backoff(&self, key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.to_string()).or_insert_with(|| {
                    BackoffState::new(self.settings.backoff_min_secs, self.settings.backoff_max_secs)
                });
                state.increment_error();
                (state.backoff.next_backoff_seconds(), state.error_count)
            }
            Err(_) => (self.settings.backoff_max_secs, 0),
        }
    }

    /// Forget the error history of `key`; returns whether it had errors
    pub fn reset_backoff(&self, key: &str) -> bool {
        self.backoff_states
            .lock()
            .map(|mut states| states.remove(key).is_some_and(|s| s.error_count > 0))
            .unwrap_or(false)
    }

    pub async fn publish_event(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: String,
    ) {
        self.events
            .publish(resource_ref, type_, reason, action, Some(note))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_configuration_classification() {
        assert!(ReconcilerError::MissingField("escalationPolicySecret").is_missing_configuration());
        assert!(ReconcilerError::SecretNotFound {
            namespace: "default".to_string(),
            name: "some-secret".to_string(),
        }
        .is_missing_configuration());
        assert!(ReconcilerError::EscalationPolicyUnavailable("P1".to_string())
            .is_missing_configuration());
        assert!(!ReconcilerError::AmbiguousName {
            resource: "ruleset",
            name: "foo".to_string(),
            count: 2
        }
        .is_missing_configuration());
        assert!(!ReconcilerError::from(PagerdutyError::EmptyResponse("rule"))
            .is_missing_configuration());
    }

    #[test]
    fn test_escalation_policy_message() {
        let err = ReconcilerError::EscalationPolicyUnavailable("PDAVWNR".to_string());
        assert_eq!(err.to_string(), "Unable to get the escalation policy PDAVWNR");
    }

    #[test]
    fn test_success_action() {
        let mut settings = ReconcilerSettings::new("WJGIH");
        assert_eq!(
            settings.success_action(),
            Action::requeue(Duration::from_secs(300))
        );
        settings.resync_interval = None;
        assert_eq!(settings.success_action(), Action::await_change());
    }

    #[test]
    fn test_backoff_state_reset() {
        let mut state = BackoffState::new(5, 300);
        state.increment_error();
        state.backoff.next_backoff_seconds();
        state.reset();
        assert_eq!(state.error_count, 0);
        assert_eq!(state.backoff.next_backoff_seconds(), 5);
    }

    struct SharedStore;

    #[async_trait::async_trait]
    impl<K: Clone + Send + Sync + 'static> ObjectStore<K> for SharedStore {
        async fn replace(&self, obj: &K) -> Result<K, ReconcilerError> {
            Ok(obj.clone())
        }

        async fn patch_status(
            &self,
            obj: &K,
            _status: serde_json::Value,
        ) -> Result<K, ReconcilerError> {
            Ok(obj.clone())
        }
    }

    #[async_trait::async_trait]
    impl SecretReader for SharedStore {
        async fn read_secret(
            &self,
            _namespace: &str,
            _name: &str,
        ) -> Result<Option<std::collections::BTreeMap<String, Vec<u8>>>, ReconcilerError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_with_store_shares_one_store() {
        let store = Arc::new(SharedStore);
        let ctx = Reconciler::with_store(
            Arc::new(crate::provider::InMemoryPagerduty::new()),
            Arc::clone(&store),
            Arc::new(crate::controller::events::NoopEventPublisher),
            ReconcilerSettings::new("WJGIH"),
        );

        assert_eq!(Arc::strong_count(&store), 4);
        assert!(ctx.secrets.read_secret("default", "x").await.unwrap().is_none());
        let ruleset = PagerdutyRuleset::new("foo", Default::default());
        assert!(ctx.rulesets.replace(&ruleset).await.is_ok());
    }
}
