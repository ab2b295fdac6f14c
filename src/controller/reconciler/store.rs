//! # Kubernetes Access
//!
//! The reconcilers only need to replace an object (finalizer changes, with
//! optimistic concurrency), merge-patch its status, and read Secrets. Those
//! three calls sit behind traits so integration tests can run against
//! in-memory stores.

use crate::controller::reconciler::types::ReconcilerError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Persistence for one custom resource kind
#[async_trait]
pub trait ObjectStore<K>: Send + Sync {
    /// Write the whole object back; fails on a stale `resourceVersion`
    async fn replace(&self, obj: &K) -> Result<K, ReconcilerError>;

    /// Merge `status` into the status subresource
    async fn patch_status(&self, obj: &K, status: serde_json::Value)
        -> Result<K, ReconcilerError>;
}

#[async_trait]
pub trait SecretReader: Send + Sync {
    /// Decoded data of a Secret, `None` when the Secret does not exist
    async fn read_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>, ReconcilerError>;
}

/// `(namespace, name)` of a namespaced object
pub fn object_key<K: Resource>(obj: &K) -> Result<(String, String), ReconcilerError> {
    let namespace = obj.namespace().ok_or(ReconcilerError::MissingObjectKey)?;
    let name = obj
        .meta()
        .name
        .clone()
        .ok_or(ReconcilerError::MissingObjectKey)?;
    Ok((namespace, name))
}

/// Key for per-object error backoff: `kind/namespace/name`
pub fn backoff_key(kind: &str, namespace: &str, name: &str) -> String {
    format!("{kind}/{namespace}/{name}")
}

/// Store backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn replace(&self, obj: &K) -> Result<K, ReconcilerError> {
        let (namespace, name) = object_key(obj)?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        Ok(api.replace(&name, &PostParams::default(), obj).await?)
    }

    async fn patch_status(
        &self,
        obj: &K,
        status: serde_json::Value,
    ) -> Result<K, ReconcilerError> {
        let (namespace, name) = object_key(obj)?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        let patch = json!({ "status": status });
        Ok(api
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }
}

#[async_trait]
impl SecretReader for KubeStore {
    async fn read_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>, ReconcilerError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api.get_opt(name).await?;
        Ok(secret.map(|secret| {
            secret
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, value.0))
                .collect()
        }))
    }
}
