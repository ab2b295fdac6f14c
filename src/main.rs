//! # PagerDuty Operator
//!
//! Watches `PagerdutyService` and `PagerdutyRuleset` resources and mirrors
//! them into PagerDuty: one remote service plus one routing rule in a shared
//! ruleset per `PagerdutyService`, and an adopted or created ruleset per
//! `PagerdutyRuleset`.
//!
//! Configuration comes from flags or their environment variables; run with
//! `--help` for the full list.

use anyhow::Result;
use pagerduty_operator::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(init).await
}
