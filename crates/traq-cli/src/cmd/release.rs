use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use traq_core::lifecycle::{ReleaseOutcome, TicketLifecycle};
use traq_core::store::StateStore;

pub fn run(dir: &Path, reason: &str, pr: Option<String>, json: bool) -> anyhow::Result<i32> {
    let store = StateStore::discover(dir).context("failed to locate worktree state")?;
    let lifecycle = TicketLifecycle::new(&store);

    let mut extra = BTreeMap::new();
    if let Some(pr) = pr {
        extra.insert("pr".to_string(), pr);
    }

    match lifecycle.release(reason, extra)? {
        ReleaseOutcome::Released(ticket_id) => {
            if json {
                crate::output::print_json(&serde_json::json!({ "released": ticket_id }))?;
            } else {
                println!("Released {ticket_id}");
            }
        }
        ReleaseOutcome::NothingClaimed => {
            // Soft outcome: releasing an empty worktree never blocks anyone.
            eprintln!("warning: no active ticket to release");
        }
    }
    Ok(0)
}
