//! # Kubernetes Events
//!
//! Trait-based wrapper over `kube::runtime::events::Recorder` so reconcilers
//! can emit events visible via `kubectl describe`, and tests can swap in a
//! recorder of their own.
//!
//! Publishing is fire-and-forget: failures are logged and never surface as
//! reconcile errors.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event about `resource_ref`
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Publisher backed by the Kubernetes events API
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventPublisher").finish_non_exhaustive()
    }
}

impl KubeEventPublisher {
    /// `controller_name` is reported as the event's reporting component
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(reason, action, error = %e, "Failed to publish Kubernetes event");
        }
    }
}

/// Drops every event
#[derive(Debug, Default)]
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Event reasons, shown in the REASON column of `kubectl get events`
pub mod reasons {
    pub const CREATE_RULESET: &str = "CreateRuleset";
    pub const ADOPT_RULESET: &str = "AdoptRuleset";
    pub const FETCH_RULESET: &str = "FetchRuleset";
    pub const CLEANUP_FAILED: &str = "CleanupFailed";
    pub const CLEANUP_SUCCEEDED: &str = "CleanupSucceeded";
    pub const SERVICE_SYNCED: &str = "ServiceSynced";
    pub const SERVICE_FAILED: &str = "ServiceFailed";
    pub const ESCALATION_POLICY_UNRESOLVED: &str = "EscalationPolicyUnresolved";
}

/// Event actions
pub mod actions {
    pub const RECONCILE: &str = "Reconcile";
    pub const CLEANUP: &str = "Cleanup";
}
