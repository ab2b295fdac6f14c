//! PagerDuty Operator Library
//!
//! Kubernetes operator that keeps PagerDuty services, rulesets and routing
//! rules in sync with `PagerdutyService` and `PagerdutyRuleset` resources.
//!
//! ## Quick Start
//!
//! ```rust
//! use pagerduty_operator::prelude::*;
//! ```

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
