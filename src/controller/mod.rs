//! # Controller
//!
//! Core controller logic: finalizers, error backoff, events, the probe
//! server, and the two reconcilers.

pub mod backoff;
pub mod events;
pub mod finalizer;
pub mod reconciler;
pub mod server;
