use anyhow::Context;
use std::path::Path;
use traq_core::lifecycle::TicketLifecycle;
use traq_core::policy::Policy;
use traq_core::store::StateStore;

/// Pre-commit gate: an active claim must exist before committing. The
/// emergency bypass converts the failure into an allowed, audited commit,
/// never a silent one.
pub fn run(dir: &Path) -> anyhow::Result<i32> {
    let policy = Policy::from_env();
    let store = StateStore::discover(dir).context("failed to locate worktree state")?;
    let lifecycle = TicketLifecycle::new(&store);

    if lifecycle.current()?.is_some() {
        return Ok(0);
    }

    if policy.emergency_bypass {
        lifecycle.record_bypass("commit without active ticket claim")?;
        eprintln!(
            "warning: emergency bypass in effect, committing without an active ticket (recorded for audit)"
        );
        return Ok(0);
    }

    eprintln!("error: no active ticket claim in this worktree");
    eprintln!("  fix: traq claim <ticket-id>");
    Ok(1)
}
