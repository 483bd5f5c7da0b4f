use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraqError {
    #[error("ticket {held} is already claimed in this worktree (requested {requested}): run 'traq release' or 'traq switch {requested}'")]
    AlreadyClaimed { held: String, requested: String },

    #[error("no active ticket in this worktree: run 'traq claim <ticket-id>'")]
    NoActiveTicket,

    #[error("not inside a git working tree")]
    NotAGitRepository,

    #[error("bare repository at {0}: traq state is per-worktree")]
    BareRepository(String),

    #[error("HEAD is detached: check out a branch before working with tickets")]
    DetachedHead,

    #[error("timed out waiting for state lock at {path} after {waited_ms}ms")]
    LockTimeout { path: String, waited_ms: u64 },

    #[error("git {command} failed: {stderr}")]
    GitCommand { command: String, stderr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TraqError>;
