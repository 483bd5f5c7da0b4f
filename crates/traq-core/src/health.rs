use crate::error::Result;
use crate::git::GitTopology;
use chrono::{Duration, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// HealthStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthStatus {
    Protected,
    Detached,
    Merged,
    SquashMerged,
    Diverged,
    Stale,
    Healthy,
    Error,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protected => "protected",
            Self::Detached => "detached",
            Self::Merged => "merged",
            Self::SquashMerged => "squash-merged",
            Self::Diverged => "diverged",
            Self::Stale => "stale",
            Self::Healthy => "healthy",
            Self::Error => "error",
        }
    }

    /// Process exit code for the `branch-health` command.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Healthy => 0,
            Self::Merged => 1,
            Self::SquashMerged => 2,
            Self::Stale => 3,
            Self::Diverged => 4,
            Self::Error | Self::Protected | Self::Detached => 5,
        }
    }

    /// Fatal states hard-stop new work; advisory states warn and continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Merged | Self::SquashMerged | Self::Protected | Self::Detached | Self::Error
        )
    }
}

// ---------------------------------------------------------------------------
// BranchHealth / HealthOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BranchHealth {
    pub status: HealthStatus,
    pub branch: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    pub fatal: bool,
}

impl BranchHealth {
    fn new(
        status: HealthStatus,
        branch: Option<String>,
        message: String,
        remediation: Option<String>,
    ) -> Self {
        Self {
            fatal: status.is_fatal(),
            status,
            branch,
            message,
            remediation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthOptions {
    /// Branch to analyze; defaults to the branch HEAD resolves to.
    pub branch: Option<String>,
    /// Age threshold for the stale check, in days.
    pub stale_days: u32,
}

pub const DEFAULT_STALE_DAYS: u32 = 14;

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            branch: None,
            stale_days: DEFAULT_STALE_DAYS,
        }
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Diagnose branch health. Always returns a result: precondition failures
/// and git errors become the `error` status rather than a propagated Err,
/// because "health unknown" is itself a reportable terminal state.
///
/// Precedence (first match wins): error, detached, protected, merged,
/// squash-merged, diverged, stale, healthy.
pub fn analyze(topo: &dyn GitTopology, opts: &HealthOptions) -> BranchHealth {
    match evaluate(topo, opts) {
        Ok(health) => health,
        Err(e) => BranchHealth::new(HealthStatus::Error, None, e.to_string(), None),
    }
}

fn evaluate(topo: &dyn GitTopology, opts: &HealthOptions) -> Result<BranchHealth> {
    if !topo.is_inside_work_tree() {
        return Ok(BranchHealth::new(
            HealthStatus::Error,
            None,
            "not inside a git working tree".to_string(),
            None,
        ));
    }

    let branch = match &opts.branch {
        Some(b) => b.clone(),
        None => match topo.head_branch()? {
            Some(b) => b,
            None => {
                return Ok(BranchHealth::new(
                    HealthStatus::Detached,
                    None,
                    "HEAD is detached; commits here are easy to lose".to_string(),
                    Some("git checkout -b <branch-name>".to_string()),
                ))
            }
        },
    };

    let default = topo.default_branch()?;
    if branch == default {
        return Ok(BranchHealth::new(
            HealthStatus::Protected,
            Some(branch.clone()),
            format!("'{branch}' is the protected default branch; do not commit to it directly"),
            Some("git checkout -b <feature-branch>".to_string()),
        ));
    }

    // Mainline tip: the remote's default-branch tip, falling back to the
    // local default branch in remoteless repositories.
    let mainline = match topo.remote_tip(&default)? {
        Some(tip) => Some(tip),
        None => topo.resolve(&default)?,
    };

    if let Some(mainline) = &mainline {
        if topo.is_ancestor(&branch, mainline)? {
            return Ok(BranchHealth::new(
                HealthStatus::Merged,
                Some(branch.clone()),
                format!("'{branch}' is fully merged into '{default}'"),
                Some(format!("git checkout {default} && git branch -d {branch}")),
            ));
        }
        if let Some(base) = topo.merge_base(mainline, &branch)? {
            let ahead = topo.rev_list_count(&format!("{base}..{branch}"))?;
            if ahead >= 1 && topo.diff_empty(mainline, &branch)? {
                return Ok(BranchHealth::new(
                    HealthStatus::SquashMerged,
                    Some(branch.clone()),
                    format!(
                        "'{branch}' was squash-merged into '{default}' (content present, no merge commit)"
                    ),
                    Some(format!("git checkout {default} && git branch -D {branch}")),
                ));
            }
        }
    }

    // A branch with no same-named tracking ref skips the diverged check.
    if let Some(remote) = topo.remote_tip(&branch)? {
        let (ahead, behind) = topo.ahead_behind(&branch, &remote)?;
        if ahead > 0 && behind > 0 {
            return Ok(BranchHealth::new(
                HealthStatus::Diverged,
                Some(branch.clone()),
                format!(
                    "'{branch}' has diverged from origin/{branch} ({ahead} ahead, {behind} behind)"
                ),
                Some(format!("git pull --rebase origin {branch}")),
            ));
        }
    }

    let last = topo.last_commit_time(&branch)?;
    let age = Utc::now().signed_duration_since(last);
    if age > Duration::days(i64::from(opts.stale_days)) {
        return Ok(BranchHealth::new(
            HealthStatus::Stale,
            Some(branch.clone()),
            format!(
                "last commit on '{branch}' is {} days old (threshold {})",
                age.num_days(),
                opts.stale_days
            ),
            Some(format!("git fetch origin && git rebase origin/{default}")),
        ));
    }

    Ok(BranchHealth::new(
        HealthStatus::Healthy,
        Some(branch.clone()),
        format!("'{branch}' is healthy"),
        None,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
