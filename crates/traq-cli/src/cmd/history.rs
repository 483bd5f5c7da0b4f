use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use traq_core::store::StateStore;

pub fn run(dir: &Path, limit: usize, json: bool) -> anyhow::Result<i32> {
    let store = StateStore::discover(dir).context("failed to locate worktree state")?;
    let state = store.load()?;

    let start = state.history.len().saturating_sub(limit);
    let entries = &state.history[start..];

    if json {
        print_json(&entries)?;
        return Ok(0);
    }

    if entries.is_empty() {
        println!("No workflow history in this worktree yet.");
        return Ok(0);
    }

    for entry in entries {
        let details = entry
            .details
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        if details.is_empty() {
            println!(
                "{}  {:<16} {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.action.as_str(),
                entry.ticket_id
            );
        } else {
            println!(
                "{}  {:<16} {}  ({details})",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.action.as_str(),
                entry.ticket_id
            );
        }
    }
    Ok(0)
}
