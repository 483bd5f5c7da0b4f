use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use traq_core::lifecycle::TicketLifecycle;
use traq_core::store::StateStore;
use traq_core::TraqError;

pub fn run(
    dir: &Path,
    ticket_id: &str,
    requirements: Vec<String>,
    by: Option<String>,
    sponsor: Option<String>,
    json: bool,
) -> anyhow::Result<i32> {
    let store = StateStore::discover(dir).context("failed to locate worktree state")?;
    let lifecycle = TicketLifecycle::new(&store);
    let by = super::agent_identity(by);

    match lifecycle.claim(ticket_id, requirements, &by, sponsor) {
        Ok(claim) => {
            if json {
                print_json(&claim)?;
            } else {
                println!("Claimed {} (by {})", claim.id, claim.claimed_by);
                if !claim.requirements.is_empty() {
                    println!("Requirements: {}", claim.requirements.join(", "));
                }
            }
            Ok(0)
        }
        Err(e @ TraqError::AlreadyClaimed { .. }) => {
            eprintln!("error: {e}");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}
