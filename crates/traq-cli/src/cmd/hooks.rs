use anyhow::{Context as _, Result};
use clap::Subcommand;
use std::fs;
use std::path::Path;
use traq_core::paths::discover_hooks_dir;

const HOOK_MARKER: &str = "# traq-hook: managed";
const PRE_COMMIT_HOOK: &str = "pre-commit";
const COMMIT_MSG_HOOK: &str = "commit-msg";

#[derive(Subcommand)]
pub enum HooksSubcommand {
    /// Install the pre-commit and commit-msg hooks for this worktree
    Install,
}

pub fn run(dir: &Path, subcommand: HooksSubcommand) -> Result<i32> {
    match subcommand {
        HooksSubcommand::Install => install(dir),
    }
}

/// Contents of the `pre-commit` hook: enforce the active-claim precondition.
fn generate_pre_commit_hook() -> String {
    format!(
        "#!/bin/sh\n\
{HOOK_MARKER}\n\
if command -v traq >/dev/null 2>&1; then\n\
  traq precommit || exit 1\n\
else\n\
  echo \"warning: traq is not installed; skipping ticket-claim check\"\n\
fi\n"
    )
}

/// Contents of the `commit-msg` hook: validate the message against policy.
fn generate_commit_msg_hook() -> String {
    format!(
        "#!/bin/sh\n\
{HOOK_MARKER}\n\
if command -v traq >/dev/null 2>&1; then\n\
  traq validate-commit-msg \"$1\" || exit 1\n\
else\n\
  echo \"warning: traq is not installed; skipping commit message validation\"\n\
fi\n"
    )
}

/// Install hook scripts into the worktree's hooks directory.
///
/// Existing hooks are preserved by appending (unless the marker shows the
/// script is already installed), so this is safe to run repeatedly.
fn install(dir: &Path) -> Result<i32> {
    let hooks_dir = discover_hooks_dir(dir).context("failed to locate git hooks directory")?;
    fs::create_dir_all(&hooks_dir)
        .with_context(|| format!("failed to create hook directory {}", hooks_dir.display()))?;

    let mapping = [
        (PRE_COMMIT_HOOK, generate_pre_commit_hook()),
        (COMMIT_MSG_HOOK, generate_commit_msg_hook()),
    ];

    for (hook_name, hook_contents) in mapping {
        let hook_path = hooks_dir.join(hook_name);
        install_single_hook(&hook_path, &hook_contents)
            .with_context(|| format!("failed to install {hook_name}"))?;
    }

    println!("Installed traq git hooks:");
    println!("  - {}", hooks_dir.join(PRE_COMMIT_HOOK).display());
    println!("  - {}", hooks_dir.join(COMMIT_MSG_HOOK).display());
    Ok(0)
}

fn install_single_hook(path: &Path, hook_contents: &str) -> Result<()> {
    if path.exists() {
        let existing = fs::read_to_string(path)
            .with_context(|| format!("failed to read existing hook {}", path.display()))?;
        if existing.contains(HOOK_MARKER) {
            return Ok(());
        }
        let mut combined = existing;
        if !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push('\n');
        combined.push_str(hook_contents);
        fs::write(path, combined)
            .with_context(|| format!("failed to append to hook {}", path.display()))?;
    } else {
        fs::write(path, hook_contents)
            .with_context(|| format!("failed to write hook {}", path.display()))?;
    }

    make_executable(path)
        .with_context(|| format!("failed to make hook executable {}", path.display()))?;
    Ok(())
}

fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perm = fs::metadata(path)?.permissions();
        perm.set_mode(0o755);
        fs::set_permissions(path, perm)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_commit_hook_gates_on_claim() {
        let hook = generate_pre_commit_hook();
        assert!(hook.starts_with("#!/bin/sh"));
        assert!(hook.contains(HOOK_MARKER));
        assert!(hook.contains("traq precommit"));
        assert!(hook.contains("traq is not installed"));
    }

    #[test]
    fn commit_msg_hook_passes_message_path() {
        let hook = generate_commit_msg_hook();
        assert!(hook.contains("traq validate-commit-msg \"$1\""));
        assert!(hook.contains(HOOK_MARKER));
    }

    #[test]
    fn install_preserves_existing_hook() {
        let dir = tempfile::TempDir::new().unwrap();
        let hook_path = dir.path().join("pre-commit");
        fs::write(&hook_path, "#!/bin/sh\necho custom\n").unwrap();

        install_single_hook(&hook_path, &generate_pre_commit_hook()).unwrap();
        let content = fs::read_to_string(&hook_path).unwrap();
        assert!(content.contains("echo custom"));
        assert!(content.contains(HOOK_MARKER));
    }

    #[test]
    fn install_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let hook_path = dir.path().join("commit-msg");
        install_single_hook(&hook_path, &generate_commit_msg_hook()).unwrap();
        install_single_hook(&hook_path, &generate_commit_msg_hook()).unwrap();

        let content = fs::read_to_string(&hook_path).unwrap();
        assert_eq!(content.matches(HOOK_MARKER).count(), 1);
    }
}
