mod cmd;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "traq",
    about = "Ticket-claim workflow gate: ties commits in this worktree to a claimed ticket",
    version,
    propagate_version = true
)]
struct Cli {
    /// Worktree directory to operate on (default: current directory)
    #[arg(long, global = true, env = "TRAQ_DIR")]
    dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFormat {
    Human,
    Json,
    Id,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HealthFormat {
    Human,
    Json,
    Status,
}

#[derive(Subcommand)]
enum Commands {
    /// Claim a ticket for this worktree
    Claim {
        /// Ticket identifier, e.g. CUR-399
        ticket_id: String,

        /// Requirement reference associated with the ticket (repeatable)
        #[arg(long = "req")]
        requirements: Vec<String>,

        /// Who is claiming (default: $TRAQ_AGENT, then $USER)
        #[arg(long)]
        by: Option<String>,

        /// Sponsor tag to record on the worktree state
        #[arg(long)]
        sponsor: Option<String>,
    },

    /// Release the active ticket claim
    Release {
        /// Free-form reason (e.g. "merged", "abandoned")
        reason: Option<String>,

        /// Pull request number or URL to record
        #[arg(long)]
        pr: Option<String>,
    },

    /// Atomically release the current claim and claim another ticket
    Switch {
        ticket_id: String,

        #[arg(long, default_value = "")]
        reason: String,

        #[arg(long = "req")]
        requirements: Vec<String>,

        #[arg(long)]
        by: Option<String>,
    },

    /// Show the active ticket claim
    Status {
        #[arg(long, value_enum, default_value = "human")]
        format: StatusFormat,
    },

    /// Pre-commit gate: require an active claim (honors emergency bypass)
    Precommit,

    /// Commit-msg gate: validate a commit message file against policy
    ValidateCommitMsg {
        /// Path to the commit message file (as passed by the git hook)
        path: PathBuf,
    },

    /// Diagnose branch health relative to upstream and mainline
    BranchHealth {
        /// Branch to analyze (default: the branch HEAD resolves to)
        #[arg(long)]
        branch: Option<String>,

        /// Stale threshold in days
        #[arg(long, default_value_t = traq_core::health::DEFAULT_STALE_DAYS)]
        stale_days: u32,

        #[arg(long, value_enum, default_value = "human")]
        format: HealthFormat,
    },

    /// Show recent workflow history entries
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Manage the git hooks that call back into traq
    Hooks {
        #[command(subcommand)]
        subcommand: cmd::hooks::HooksSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let dir = cli
        .dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let result = match cli.command {
        Commands::Claim {
            ticket_id,
            requirements,
            by,
            sponsor,
        } => cmd::claim::run(&dir, &ticket_id, requirements, by, sponsor, cli.json),
        Commands::Release { reason, pr } => {
            cmd::release::run(&dir, reason.as_deref().unwrap_or(""), pr, cli.json)
        }
        Commands::Switch {
            ticket_id,
            reason,
            requirements,
            by,
        } => cmd::switch::run(&dir, &ticket_id, &reason, requirements, by, cli.json),
        Commands::Status { format } => cmd::status::run(&dir, format),
        Commands::Precommit => cmd::precommit::run(&dir),
        Commands::ValidateCommitMsg { path } => cmd::validate::run(&dir, &path),
        Commands::BranchHealth {
            branch,
            stale_days,
            format,
        } => cmd::health::run(&dir, branch, stale_days, format),
        Commands::History { limit } => cmd::history::run(&dir, limit, cli.json),
        Commands::Hooks { subcommand } => cmd::hooks::run(&dir, subcommand),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
