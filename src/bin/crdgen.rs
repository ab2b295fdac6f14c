//! # CRD Generator
//!
//! Prints the `PagerdutyService` and `PagerdutyRuleset`
//! CustomResourceDefinitions as one multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/crds.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use pagerduty_operator::crd::{PagerdutyRuleset, PagerdutyService};

fn main() -> anyhow::Result<()> {
    let service = serde_yaml::to_string(&PagerdutyService::crd())?;
    let ruleset = serde_yaml::to_string(&PagerdutyRuleset::crd())?;
    print!("{service}---\n{ruleset}");
    Ok(())
}
