use crate::output::print_json;
use crate::HealthFormat;
use std::path::Path;
use traq_core::git::GitCli;
use traq_core::health::{self, HealthOptions};

pub fn run(
    dir: &Path,
    branch: Option<String>,
    stale_days: u32,
    format: HealthFormat,
) -> anyhow::Result<i32> {
    let topo = GitCli::new(dir);
    let opts = HealthOptions { branch, stale_days };
    let health = health::analyze(&topo, &opts);

    match format {
        HealthFormat::Json => print_json(&health)?,
        HealthFormat::Status => println!("{}", health.status.as_str()),
        HealthFormat::Human => {
            let severity = if health.fatal { "fatal" } else { "ok" };
            println!("[{}] {}", severity, health.message);
            if let Some(fix) = &health.remediation {
                println!("  fix: {fix}");
            }
        }
    }
    Ok(health.status.exit_code())
}
