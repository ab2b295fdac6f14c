//! # Reconcilers
//!
//! - `service` - PagerdutyService: remote service plus routing rule
//! - `ruleset` - PagerdutyRuleset: adopt-or-create of a remote ruleset
//! - `store` - Kubernetes access behind traits
//! - `types` - shared context and errors

pub mod ruleset;
pub mod service;
mod status;
pub mod store;
mod types;

pub use status::persist_status;
pub use store::{backoff_key, object_key, KubeStore, ObjectStore, SecretReader};
pub use types::{BackoffState, Reconciler, ReconcilerError, ReconcilerSettings};
