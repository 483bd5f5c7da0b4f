use crate::error::{Result, TraqError};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::process::Command;

// ---------------------------------------------------------------------------
// GitTopology
// ---------------------------------------------------------------------------

/// The narrow set of history-topology queries the branch-health analyzer
/// needs. A trait so the precedence logic is unit-testable against fake
/// topology data without a real repository.
pub trait GitTopology {
    fn is_inside_work_tree(&self) -> bool;
    /// Current branch name; `None` when HEAD is detached.
    fn head_branch(&self) -> Result<Option<String>>;
    /// Resolved default branch name (`main`/`master` or the remote's
    /// symbolic HEAD target).
    fn default_branch(&self) -> Result<String>;
    /// Commit id a revision resolves to, or `None` if it does not exist.
    fn resolve(&self, rev: &str) -> Result<Option<String>>;
    /// Commit id of `refs/remotes/origin/<branch>`, if the tracking ref
    /// exists.
    fn remote_tip(&self, branch: &str) -> Result<Option<String>>;
    /// True if `ancestor` is reachable from `descendant`.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;
    /// Merge base of two revisions; `None` when histories are unrelated.
    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>>;
    /// Commit count for a revision range like `base..branch`.
    fn rev_list_count(&self, range: &str) -> Result<u32>;
    /// (ahead, behind) of `left` relative to `right`.
    fn ahead_behind(&self, left: &str, right: &str) -> Result<(u32, u32)>;
    /// True if the content diff between two revisions is empty.
    fn diff_empty(&self, a: &str, b: &str) -> Result<bool>;
    /// Committer time of the most recent commit on `rev`.
    fn last_commit_time(&self, rev: &str) -> Result<DateTime<Utc>>;
}

// ---------------------------------------------------------------------------
// GitCli
// ---------------------------------------------------------------------------

/// `GitTopology` backed by the `git` binary. Read-only: nothing here ever
/// mutates refs, the object store, or the working tree.
pub struct GitCli {
    dir: PathBuf,
}

impl GitCli {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn output(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new("git")
            .arg("-C")
            .arg(&self.dir)
            .args(args)
            .output()
            .map_err(TraqError::Io)
    }

    /// Run git and return trimmed stdout; a non-zero exit is an error.
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(TraqError::GitCommand {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run git where exit 0 / exit 1 encode a boolean answer.
    fn run_bool(&self, args: &[&str]) -> Result<bool> {
        let output = self.output(args)?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(TraqError::GitCommand {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn local_branch_exists(&self, branch: &str) -> bool {
        self.output(&[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/heads/{branch}"),
        ])
        .map(|o| o.status.success())
        .unwrap_or(false)
    }
}

impl GitTopology for GitCli {
    fn is_inside_work_tree(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out == "true")
            .unwrap_or(false)
    }

    fn head_branch(&self) -> Result<Option<String>> {
        let output = self.output(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if output.status.success() {
            Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            ))
        } else {
            // symbolic-ref fails when HEAD is detached.
            Ok(None)
        }
    }

    fn default_branch(&self) -> Result<String> {
        let output = self.output(&["symbolic-ref", "--quiet", "--short", "refs/remotes/origin/HEAD"])?;
        if output.status.success() {
            let full = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if let Some(name) = full.strip_prefix("origin/") {
                return Ok(name.to_string());
            }
            return Ok(full);
        }
        // No remote symbolic HEAD: fall back to conventional names.
        for candidate in ["main", "master"] {
            if self.local_branch_exists(candidate) {
                return Ok(candidate.to_string());
            }
        }
        Ok("main".to_string())
    }

    fn resolve(&self, rev: &str) -> Result<Option<String>> {
        let output = self.output(&["rev-parse", "--verify", "--quiet", &format!("{rev}^{{commit}}")])?;
        if output.status.success() {
            Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            ))
        } else {
            Ok(None)
        }
    }

    fn remote_tip(&self, branch: &str) -> Result<Option<String>> {
        let output = self.output(&[
            "rev-parse",
            "--verify",
            "--quiet",
            &format!("refs/remotes/origin/{branch}"),
        ])?;
        if output.status.success() {
            Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            ))
        } else {
            // Missing tracking ref is an answer, not an error.
            Ok(None)
        }
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        self.run_bool(&["merge-base", "--is-ancestor", ancestor, descendant])
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let output = self.output(&["merge-base", a, b])?;
        match output.status.code() {
            Some(0) => Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            )),
            Some(1) => Ok(None),
            _ => Err(TraqError::GitCommand {
                command: format!("merge-base {a} {b}"),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn rev_list_count(&self, range: &str) -> Result<u32> {
        let out = self.run(&["rev-list", "--count", range])?;
        out.parse().map_err(|_| TraqError::GitCommand {
            command: format!("rev-list --count {range}"),
            stderr: format!("unparseable count: {out}"),
        })
    }

    fn ahead_behind(&self, left: &str, right: &str) -> Result<(u32, u32)> {
        let spec = format!("{left}...{right}");
        let out = self.run(&["rev-list", "--left-right", "--count", &spec])?;
        let mut parts = out.split_whitespace();
        let ahead = parts.next().and_then(|n| n.parse().ok());
        let behind = parts.next().and_then(|n| n.parse().ok());
        match (ahead, behind) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(TraqError::GitCommand {
                command: format!("rev-list --left-right --count {spec}"),
                stderr: format!("unparseable counts: {out}"),
            }),
        }
    }

    fn diff_empty(&self, a: &str, b: &str) -> Result<bool> {
        self.run_bool(&["diff", "--quiet", a, b])
    }

    fn last_commit_time(&self, rev: &str) -> Result<DateTime<Utc>> {
        let out = self.run(&["log", "-1", "--format=%ct", rev])?;
        let secs: i64 = out.parse().map_err(|_| TraqError::GitCommand {
            command: format!("log -1 --format=%ct {rev}"),
            stderr: format!("unparseable timestamp: {out}"),
        })?;
        DateTime::from_timestamp(secs, 0).ok_or_else(|| TraqError::GitCommand {
            command: format!("log -1 --format=%ct {rev}"),
            stderr: format!("timestamp out of range: {secs}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
