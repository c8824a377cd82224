use colored::*;
use eyre::Result;
use std::time::Duration;

use crate::config::Config;
use crate::journey::connectivity::{Reachability, check_connectivity};

pub fn run(timeout: Option<u64>, config: &Config) -> Result<()> {
    let timeout = Duration::from_secs(timeout.unwrap_or(config.tracking.ping_timeout_secs).max(1));

    match check_connectivity(&config.tracking, timeout) {
        Reachability::Reachable { status, latency } => {
            println!(
                "{} Backend reachable (HTTP {}, {} ms)",
                "✓".green(),
                status,
                latency.as_millis()
            );
            Ok(())
        }
        Reachability::Unreachable { reason } => {
            println!("{} Backend unreachable: {}", "✗".red(), reason.dimmed());
            std::process::exit(1);
        }
        Reachability::NotConfigured => {
            println!("{} Tracking credentials not configured", "⚠".yellow());
            println!(
                "  Set {} and {}, or tracking.project_id / tracking.publishable_key",
                "JOURNEY_PROJECT_ID".cyan(),
                "JOURNEY_PUBLISHABLE_KEY".cyan()
            );
            std::process::exit(1);
        }
    }
}
