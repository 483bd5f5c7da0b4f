use crate::output::print_json;
use crate::StatusFormat;
use anyhow::Context;
use std::path::Path;
use traq_core::lifecycle::TicketLifecycle;
use traq_core::store::StateStore;

/// Exit codes: 0 active claim, 1 nothing claimed, 2 no state document yet.
pub fn run(dir: &Path, format: StatusFormat) -> anyhow::Result<i32> {
    let store = StateStore::discover(dir).context("failed to locate worktree state")?;
    if !store.exists() {
        eprintln!("no workflow state in this worktree yet: run 'traq claim <ticket-id>'");
        return Ok(2);
    }

    let lifecycle = TicketLifecycle::new(&store);
    let Some(claim) = lifecycle.current()? else {
        eprintln!("no active ticket: run 'traq claim <ticket-id>'");
        return Ok(1);
    };

    match format {
        StatusFormat::Json => print_json(&claim)?,
        StatusFormat::Id => println!("{}", claim.id),
        StatusFormat::Human => {
            println!("Active ticket: {}", claim.id);
            println!("Claimed by:    {}", claim.claimed_by);
            println!("Claimed at:    {}", claim.claimed_at.to_rfc3339());
            if !claim.requirements.is_empty() {
                println!("Requirements:  {}", claim.requirements.join(", "));
            }
            if let Some(sponsor) = store.load()?.sponsor {
                println!("Sponsor:       {sponsor}");
            }
        }
    }
    Ok(0)
}
