//! # Status Updates
//!
//! Status goes through the status subresource as a merge patch, and only
//! when it differs from what the object already carries, so an unchanged
//! pass does not trigger another watch event.

use crate::controller::reconciler::store::ObjectStore;
use crate::controller::reconciler::types::ReconcilerError;
use serde::Serialize;
use tracing::debug;

pub async fn persist_status<K, S>(
    store: &dyn ObjectStore<K>,
    obj: &K,
    observed: Option<&S>,
    desired: &S,
) -> Result<(), ReconcilerError>
where
    S: Serialize + PartialEq + Sync,
    K: Sync,
{
    if observed == Some(desired) {
        debug!("Status unchanged, skipping update");
        return Ok(());
    }
    store
        .patch_status(obj, serde_json::to_value(desired)?)
        .await?;
    Ok(())
}
