//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use pagerduty_operator::prelude::*;
//! ```

pub use crate::crd::*;

pub use crate::provider::{
    EscalationPolicyClient, InMemoryPagerduty, PagerdutyClient, PagerdutyError, PagerdutyREST,
    RulesetClient, RulesetRuleClient, ServiceClient,
};

pub use crate::controller::events::{EventPublisher, KubeEventPublisher, NoopEventPublisher};
pub use crate::controller::reconciler::{
    BackoffState, KubeStore, ObjectStore, Reconciler, ReconcilerError, ReconcilerSettings,
    SecretReader,
};

pub use crate::config::{ConfigError, OperatorConfig};
