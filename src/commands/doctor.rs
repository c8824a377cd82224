//! Diagnose journey setup issues

use colored::*;
use eyre::Result;
use std::time::Duration;

use crate::config::{Config, SinkKind};
use crate::journey::connectivity::{Reachability, check_connectivity};
use crate::journey::context::{IdentityStore, SessionStore};
use crate::journey::store::{FileIdentityStore, FileSessionStore};

pub fn run(config: &Config) -> Result<()> {
    println!("{}", "Journey Doctor".bold());
    println!("{}", "═".repeat(50));
    println!();

    let mut issues = 0;

    // Check journey directory
    let journey_dir = Config::journey_dir();
    if journey_dir.exists() {
        println!("{} Journey directory: {}", "✓".green(), journey_dir.display());
    } else {
        println!("{} Journey directory missing: {}", "⚠".yellow(), journey_dir.display());
    }

    // Check config file
    let config_file = journey_dir.join("journey.yaml");
    if config_file.exists() {
        println!("{} Config file: {}", "✓".green(), config_file.display());
    } else {
        println!("{} Config file missing: {} (using defaults)", "⚠".yellow(), config_file.display());
    }

    println!();

    // Check credentials
    println!("{}", "Tracking:".bold());
    let credentials = config.tracking.credentials();
    match credentials {
        Some(ref creds) => println!("  {} Collector base URL: {}", "✓".green(), creds.base_url),
        None => {
            println!("  {} Project id / publishable key not configured", "✗".red());
            println!(
                "    Set {} and {} to enable collectors",
                "JOURNEY_PROJECT_ID".cyan(),
                "JOURNEY_PUBLISHABLE_KEY".cyan()
            );
            issues += 1;
        }
    }

    // Check sinks
    let enabled: Vec<_> = config.tracking.enabled_sinks().collect();
    if enabled.is_empty() {
        println!("  {} All sinks disabled; events go nowhere", "✗".red());
        issues += 1;
    }
    for sink in &config.tracking.sinks {
        let usable = sink.enabled && (sink.kind != SinkKind::Http || credentials.is_some());
        let marker = if usable {
            "✓".green()
        } else if sink.enabled {
            "✗".red()
        } else {
            "-".dimmed()
        };
        println!("  {} sink {} ({:?})", marker, sink.name, sink.kind);
    }

    println!();

    // Check local storage
    println!("{}", "Storage:".bold());
    let state_dir = config.state_dir();
    let session_store = FileSessionStore::new(&state_dir);
    match session_store.load() {
        Ok(Some(id)) => println!("  {} Session: {}", "✓".green(), id),
        Ok(None) => println!("  {} Session: none yet (created on first event)", "✓".green()),
        Err(e) => {
            println!("  {} Session slot unreadable: {}", "✗".red(), e);
            issues += 1;
        }
    }

    match FileIdentityStore::new(&state_dir).user_id() {
        Ok(Some(user)) => println!("  {} Identity: {}", "✓".green(), user),
        Ok(None) => println!("  {} Identity: anonymous", "✓".green()),
        Err(e) => {
            println!("  {} Identity file unreadable: {}", "✗".red(), e);
            println!("    Run {} to reset it", "journey identity clear".cyan());
            issues += 1;
        }
    }

    println!();

    // Check backend
    println!("{}", "Backend:".bold());
    if credentials.is_some() {
        let timeout = Duration::from_secs(config.tracking.ping_timeout_secs.max(1));
        match check_connectivity(&config.tracking, timeout) {
            Reachability::Reachable { status, latency } => {
                println!("  {} Reachable (HTTP {}, {} ms)", "✓".green(), status, latency.as_millis());
            }
            Reachability::Unreachable { reason } => {
                println!("  {} Unreachable: {}", "✗".red(), reason.dimmed());
                issues += 1;
            }
            Reachability::NotConfigured => {}
        }
    } else {
        println!("  {} Skipped (not configured)", "-".dimmed());
    }

    println!();

    if issues == 0 {
        println!("{} No issues found", "✓".green().bold());
    } else {
        println!("{} {} issue(s) found", "✗".red().bold(), issues);
    }

    Ok(())
}
