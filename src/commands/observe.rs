//! Live event observation command
//!
//! Tails the local journal written by file sinks, similar to `tail -f`.

use chrono::Local;
use colored::*;
use eyre::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::config::{Config, SinkKind};
use crate::journey::JourneyEvent;
use crate::journey::sink::journal_file;

/// Run the observe command
pub fn run(filter: Option<&str>, last: usize, include_metadata: bool, config: &Config) -> Result<()> {
    let journal_dir = config.journal_dir();

    if !config.tracking.enabled_sinks().any(|s| s.kind == SinkKind::File) {
        println!(
            "{} No file sink enabled; add one under tracking.sinks to populate {}",
            "⚠".yellow(),
            journal_dir.display()
        );
    }

    println!("{} Observing journey events (Ctrl+C to stop)...", "👁".blue());
    if let Some(f) = filter {
        println!("  Filter: {}", f.cyan());
    }
    println!();

    // Show last N events first
    if last > 0 {
        show_recent_events(&journal_dir, last, filter, include_metadata)?;
        println!("{}", "--- Live tail ---".dimmed());
        println!();
    }

    tail_events(&journal_dir, filter, include_metadata)
}

fn matches_filter(event: &JourneyEvent, filter: Option<&str>) -> bool {
    match filter {
        Some(f) => event.event_type.as_str().contains(&f.to_lowercase().replace('-', "_")),
        None => true,
    }
}

/// Read the events recorded yesterday and today, oldest first
fn recent_events(journal_dir: &Path, filter: Option<&str>) -> Vec<JourneyEvent> {
    let mut all_events = Vec::new();

    let today = Local::now();
    let yesterday = today - chrono::Duration::days(1);

    for date in [yesterday, today] {
        let log_file = journal_file(journal_dir, date);

        if log_file.exists()
            && let Ok(content) = fs::read_to_string(&log_file)
        {
            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(event) = serde_json::from_str::<JourneyEvent>(line)
                    && matches_filter(&event, filter)
                {
                    all_events.push(event);
                }
            }
        }
    }

    all_events
}

/// Show the last N events from recent journal files
fn show_recent_events(journal_dir: &Path, count: usize, filter: Option<&str>, include_metadata: bool) -> Result<()> {
    let all_events = recent_events(journal_dir, filter);

    let start = all_events.len().saturating_sub(count);
    for event in &all_events[start..] {
        print_event(event, include_metadata);
    }

    Ok(())
}

/// Tail the current day's journal file
fn tail_events(journal_dir: &Path, filter: Option<&str>, include_metadata: bool) -> Result<()> {
    loop {
        let today = Local::now();
        let log_file = journal_file(journal_dir, today);

        if !log_file.exists() {
            // Wait for file to be created
            thread::sleep(Duration::from_secs(1));
            continue;
        }

        let file = File::open(&log_file).context("Failed to open journal file")?;
        let mut reader = BufReader::new(file);

        reader.seek(SeekFrom::End(0))?;

        // Read new lines as they appear
        let mut line = String::new();
        loop {
            match reader.read_line(&mut line) {
                Ok(0) => {
                    thread::sleep(Duration::from_millis(100));

                    // Check if we've crossed midnight
                    let now = Local::now();
                    if now.format("%Y-%m-%d").to_string() != today.format("%Y-%m-%d").to_string() {
                        break;
                    }
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty()
                        && let Ok(event) = serde_json::from_str::<JourneyEvent>(trimmed)
                        && matches_filter(&event, filter)
                    {
                        print_event(&event, include_metadata);
                    }
                    line.clear();
                }
                Err(e) => {
                    log::warn!("Error reading journal file: {}", e);
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }
    }
}

/// Print a single event
fn print_event(event: &JourneyEvent, include_metadata: bool) {
    println!("{}", event.format_display());

    if include_metadata && event.metadata.as_object().is_some_and(|m| !m.is_empty()) {
        let pretty = serde_json::to_string_pretty(&event.metadata).unwrap_or_default();
        for line in pretty.lines() {
            println!("  {}", line.dimmed());
        }
    }
}
