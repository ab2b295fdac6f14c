//! # Runtime
//!
//! Startup, the controller watch loops, and the error policy shared by both
//! controllers.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
