use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use traq_core::lifecycle::TicketLifecycle;
use traq_core::store::StateStore;

pub fn run(
    dir: &Path,
    ticket_id: &str,
    reason: &str,
    requirements: Vec<String>,
    by: Option<String>,
    json: bool,
) -> anyhow::Result<i32> {
    let store = StateStore::discover(dir).context("failed to locate worktree state")?;
    let lifecycle = TicketLifecycle::new(&store);
    let by = super::agent_identity(by);

    let previous = lifecycle.current()?;
    let claim = lifecycle.switch(ticket_id, reason, requirements, &by)?;

    if json {
        print_json(&claim)?;
    } else {
        match previous {
            Some(prev) => println!("Switched {} -> {}", prev.id, claim.id),
            None => println!("Claimed {}", claim.id),
        }
    }
    Ok(0)
}
