//! # Escalation Policy Resolution
//!
//! The policy ID comes either straight from `spec.escalationPolicy` or from a key of a
//! Secret in the object's namespace.

use crate::controller::reconciler::store::SecretReader;
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::PagerdutyServiceSpec;
use tracing::debug;

/// Resolve the escalation policy ID for `spec`.
///
/// A literal `escalationPolicy` wins and is returned without remote validation.
pub async fn resolve_escalation_policy_id(
    spec: &PagerdutyServiceSpec,
    namespace: &str,
    secrets: &dyn SecretReader,
) -> Result<String, ReconcilerError> {
    if let Some(policy) = spec.escalation_policy.as_deref().filter(|p| !p.is_empty()) {
        return Ok(policy.to_string());
    }

    let secret_ref = spec
        .escalation_policy_secret
        .as_ref()
        .ok_or(ReconcilerError::MissingField("escalationPolicy or escalationPolicySecret"))?;
    if secret_ref.name.is_empty() {
        return Err(ReconcilerError::MissingField("escalationPolicySecret.name"));
    }
    if secret_ref.key.is_empty() {
        return Err(ReconcilerError::MissingField("escalationPolicySecret.key"));
    }

    debug!(
        "Reading escalation policy from secret {}/{} key {}",
        namespace, secret_ref.name, secret_ref.key
    );

    let data = secrets
        .read_secret(namespace, &secret_ref.name)
        .await?
        .ok_or_else(|| ReconcilerError::SecretNotFound {
            namespace: namespace.to_string(),
            name: secret_ref.name.clone(),
        })?;

    let value = data
        .get(&secret_ref.key)
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ReconcilerError::SecretKeyNotFound {
            namespace: namespace.to_string(),
            name: secret_ref.name.clone(),
            key: secret_ref.key.clone(),
        })?;

    Ok(value)
}
