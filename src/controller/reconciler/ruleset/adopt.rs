//! # Adopt or Create
//!
//! Rulesets are matched by exact name. One match is adopted, none is
//! created, and more than one is refused: picking one would be a guess.

use crate::controller::reconciler::types::ReconcilerError;
use crate::provider::{Ruleset, RulesetClient};
use tracing::info;

/// The single ruleset called `name`, if any
pub async fn find_ruleset_by_name<C>(
    client: &C,
    name: &str,
) -> Result<Option<Ruleset>, ReconcilerError>
where
    C: RulesetClient + ?Sized,
{
    let mut matches: Vec<Ruleset> = client
        .list_rulesets()
        .await?
        .into_iter()
        .filter(|ruleset| ruleset.name == name)
        .collect();

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        count => Err(ReconcilerError::AmbiguousName {
            resource: "ruleset",
            name: name.to_string(),
            count,
        }),
    }
}

pub async fn create_named_ruleset<C>(client: &C, name: &str) -> Result<Ruleset, ReconcilerError>
where
    C: RulesetClient + ?Sized,
{
    let created = client.create_ruleset(&Ruleset::named(name)).await?;
    info!("Created ruleset {} ({:?})", name, created.id);
    Ok(created)
}
