use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use traq_core::gate;
use traq_core::lifecycle::TicketLifecycle;
use traq_core::policy::Policy;
use traq_core::refs;
use traq_core::store::StateStore;

/// Commit-msg gate: validate the candidate message against the active
/// claim and enforcement policy. All violations are printed in one pass;
/// exit 1 only if at least one enabled check fails.
pub fn run(dir: &Path, msg_path: &Path) -> anyhow::Result<i32> {
    let message = std::fs::read_to_string(msg_path)
        .with_context(|| format!("failed to read commit message file {}", msg_path.display()))?;

    let policy = Policy::from_env();
    let store = StateStore::discover(dir).context("failed to locate worktree state")?;
    let lifecycle = TicketLifecycle::new(&store);
    let active = lifecycle.current()?;

    let violations = gate::validate(&message, active.as_ref(), &policy);
    for v in &violations {
        let tag = if v.is_blocking(&policy) { "error" } else { "warning" };
        eprintln!("{tag}: {}", v.message());
        eprintln!("  fix: {}", v.remediation());
    }

    if gate::has_blocking(&violations, &policy) {
        if policy.emergency_bypass {
            lifecycle.record_bypass("commit gate violations bypassed")?;
            eprintln!(
                "warning: emergency bypass in effect, commit allowed despite violations (recorded for audit)"
            );
            return Ok(0);
        }
        return Ok(1);
    }

    // Allowed commit against the active ticket: record it for the audit
    // trail, unless the message references some other ticket.
    if let Some(active) = &active {
        let referenced = refs::ticket_ref(&message);
        if referenced.as_deref().map_or(true, |t| t == active.id) {
            let mut details = BTreeMap::new();
            details.insert("subject".to_string(), subject_line(&message));
            let reqs = refs::unique_requirement_refs(&message);
            if !reqs.is_empty() {
                details.insert("requirements".to_string(), reqs.join(","));
            }
            lifecycle.record_commit(&active.id, details)?;
        }
    }

    Ok(0)
}

fn subject_line(message: &str) -> String {
    let first = message.lines().next().unwrap_or("").trim();
    if first.chars().count() > 80 {
        let short: String = first.chars().take(77).collect();
        format!("{short}...")
    } else {
        first.to_string()
    }
}
