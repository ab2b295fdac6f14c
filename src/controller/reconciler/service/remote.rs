//! # Remote Service
//!
//! Create-or-update of the PagerDuty service backing a PagerdutyService.

use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::PagerdutyServiceSpec;
use crate::provider::{ApiReference, PagerdutyError, Service, ServiceClient};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

/// `[prefix-]name[-suffix]`, where the suffix is `suffix_length` random
/// alphanumerics. Service names are global in a PagerDuty account, so the
/// suffix lets the same object name exist in several clusters.
pub fn generate_service_name(prefix: &str, name: &str, suffix_length: usize) -> String {
    let mut generated = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}-{name}")
    };
    if suffix_length > 0 {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(suffix_length)
            .map(char::from)
            .collect();
        generated.push('-');
        generated.push_str(&suffix);
    }
    generated
}

/// Bring the service recorded in status in line with `spec`.
///
/// A recorded service that no longer exists remotely is an error rather than
/// a reason to create a replacement.
pub async fn update_remote_service<C>(
    client: &C,
    id: &str,
    spec: &PagerdutyServiceSpec,
    escalation_policy_id: &str,
) -> Result<Service, ReconcilerError>
where
    C: ServiceClient + ?Sized,
{
    let mut service = match client.get_service(id).await {
        Ok(service) => service,
        Err(e) if e.is_not_found() => {
            return Err(ReconcilerError::RemoteServiceMissing(id.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    service.description = spec.description.clone();
    service.escalation_policy = Some(ApiReference::escalation_policy(escalation_policy_id));

    let mut updated = client.update_service(id, &service).await?;
    if updated.id.is_none() {
        updated.id = Some(id.to_string());
    }
    debug!("Updated PagerDuty service {} ({})", updated.name, id);
    Ok(updated)
}

pub async fn create_remote_service<C>(
    client: &C,
    name: &str,
    spec: &PagerdutyServiceSpec,
    escalation_policy_id: &str,
) -> Result<Service, ReconcilerError>
where
    C: ServiceClient + ?Sized,
{
    let service = Service {
        id: None,
        name: name.to_string(),
        description: spec.description.clone(),
        escalation_policy: Some(ApiReference::escalation_policy(escalation_policy_id)),
    };
    let created = client.create_service(&service).await?;
    info!("Created PagerDuty service {} ({:?})", created.name, created.id);
    Ok(created)
}

/// Create the service under a name already recorded in status.
///
/// The name is recorded before the first create, so a service found under it
/// was created by an earlier pass that failed to record the ID. That service
/// is updated and returned instead of attempting a duplicate.
pub async fn recover_or_create_service<C>(
    client: &C,
    name: &str,
    spec: &PagerdutyServiceSpec,
    escalation_policy_id: &str,
) -> Result<Service, ReconcilerError>
where
    C: ServiceClient + ?Sized,
{
    match get_service_by_name(client, name).await {
        Ok(existing) => {
            let id = existing
                .id
                .ok_or(PagerdutyError::EmptyResponse("service id"))?;
            info!("Recovered PagerDuty service {} ({}) from an interrupted create", name, id);
            update_remote_service(client, &id, spec, escalation_policy_id).await
        }
        Err(ReconcilerError::Pagerduty(e)) if e.is_not_found() => {
            create_remote_service(client, name, spec, escalation_policy_id).await
        }
        Err(e) => Err(e),
    }
}

/// Exact-name lookup over the server-side name search
pub async fn get_service_by_name<C>(client: &C, name: &str) -> Result<Service, ReconcilerError>
where
    C: ServiceClient + ?Sized,
{
    let mut matches: Vec<Service> = client
        .list_services(name)
        .await?
        .into_iter()
        .filter(|service| service.name == name)
        .collect();

    match matches.len() {
        0 => Err(PagerdutyError::not_found("service", name).into()),
        1 => Ok(matches.remove(0)),
        count => Err(ReconcilerError::AmbiguousName {
            resource: "service",
            name: name.to_string(),
            count,
        }),
    }
}
