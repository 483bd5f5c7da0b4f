use crate::error::{Result, TraqError};
use std::path::{Path, PathBuf};
use std::process::Command;

// ---------------------------------------------------------------------------
// File name constants
// ---------------------------------------------------------------------------

pub const STATE_FILE: &str = "traq-state.json";
pub const BACKUP_FILE: &str = "traq-state.json.bak";
pub const BACKUP2_FILE: &str = "traq-state.json.bak2";
pub const LOCK_FILE: &str = "traq-state.lock";

// ---------------------------------------------------------------------------
// StatePaths
// ---------------------------------------------------------------------------

/// Locations of the state document and its siblings inside one worktree's
/// private git metadata directory. Two worktrees of the same repository get
/// distinct directories, so they never share a document.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub state: PathBuf,
    pub backup: PathBuf,
    pub backup2: PathBuf,
    pub lock: PathBuf,
}

impl StatePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            state: dir.join(STATE_FILE),
            backup: dir.join(BACKUP_FILE),
            backup2: dir.join(BACKUP2_FILE),
            lock: dir.join(LOCK_FILE),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Resolve the worktree's private git metadata directory for `dir`.
///
/// For a plain checkout this is `.git/`; for a linked worktree it is
/// `.git/worktrees/<name>/`. Resolved fresh on every invocation, never
/// cached across processes. Bare repositories and detached-HEAD checkouts
/// are rejected: neither is a worktree a ticket claim can bind to.
pub fn discover_git_dir(dir: &Path) -> Result<PathBuf> {
    if rev_parse(dir, "--is-bare-repository")? == "true" {
        return Err(TraqError::BareRepository(dir.display().to_string()));
    }
    if rev_parse(dir, "--is-inside-work-tree")? != "true" {
        return Err(TraqError::NotAGitRepository);
    }
    let head = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["symbolic-ref", "--quiet", "HEAD"])
        .output()?;
    if !head.status.success() {
        return Err(TraqError::DetachedHead);
    }
    Ok(PathBuf::from(rev_parse(dir, "--absolute-git-dir")?))
}

/// Resolve the hooks directory for the worktree at `dir`, honoring
/// `core.hooksPath` and linked-worktree layouts.
pub fn discover_hooks_dir(dir: &Path) -> Result<PathBuf> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["rev-parse", "--git-path", "hooks"])
        .output()?;
    if !output.status.success() {
        return Err(TraqError::NotAGitRepository);
    }
    let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(dir.join(path))
    }
}

fn rev_parse(dir: &Path, flag: &str) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["rev-parse", flag])
        .output()
        .map_err(TraqError::Io)?;
    if !output.status.success() {
        return Err(TraqError::NotAGitRepository);
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
