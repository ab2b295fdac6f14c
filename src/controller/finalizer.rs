//! # Finalizers
//!
//! Idempotent add/remove of a finalizer key. Only the in-memory list is
//! touched; persisting the object is up to the caller.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Append `key` if absent. Returns `true` when the list changed.
pub fn ensure_exists(finalizers: &mut Vec<String>, key: &str) -> bool {
    if finalizers.iter().any(|f| f == key) {
        return false;
    }
    finalizers.push(key.to_string());
    true
}

/// Remove the first occurrence of `key`, keeping the order of the rest.
/// Returns `true` when the list changed.
pub fn ensure_removed(finalizers: &mut Vec<String>, key: &str) -> bool {
    match finalizers.iter().position(|f| f == key) {
        Some(index) => {
            finalizers.remove(index);
            true
        }
        None => false,
    }
}

pub fn has_finalizer(meta: &ObjectMeta, key: &str) -> bool {
    meta.finalizers
        .as_ref()
        .is_some_and(|finalizers| finalizers.iter().any(|f| f == key))
}

pub fn add_finalizer(meta: &mut ObjectMeta, key: &str) -> bool {
    ensure_exists(meta.finalizers.get_or_insert_with(Vec::new), key)
}

pub fn remove_finalizer(meta: &mut ObjectMeta, key: &str) -> bool {
    meta.finalizers
        .as_mut()
        .is_some_and(|finalizers| ensure_removed(finalizers, key))
}
