//! Live instrumentation driven from stdin
//!
//! Each input line is one browser interaction:
//! - `/some/path` navigates (picked up by the route poller)
//! - `{"tag": "button", "id": "buy", ...}` clicks an element
//! - `width 800` resizes the viewport

use colored::*;
use eyre::{Context, Result};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cli::PageArgs;
use crate::config::Config;
use crate::journey::{ClickTarget, Dispatch, Emitter, SharedPage, init_journey_tracking};

use super::page_from_args;

/// One parsed stdin line
#[derive(Debug, PartialEq)]
enum Interaction {
    Navigate(String),
    Click(ClickTarget),
    Resize(u32),
}

fn parse_line(line: &str) -> Result<Option<Interaction>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if line.starts_with('/') {
        return Ok(Some(Interaction::Navigate(line.to_string())));
    }
    if line.starts_with('{') {
        let target: ClickTarget = serde_json::from_str(line).context("Invalid click JSON")?;
        return Ok(Some(Interaction::Click(target)));
    }
    if let Some(width) = line.strip_prefix("width ") {
        let width = width.trim().parse::<u32>().context("Invalid viewport width")?;
        return Ok(Some(Interaction::Resize(width)));
    }
    eyre::bail!("Unrecognized input: {}", line)
}

pub fn run(page_args: &PageArgs, interval_ms: Option<u64>, quiet: bool, config: &Config) -> Result<()> {
    let interval = Duration::from_millis(interval_ms.unwrap_or(config.tracking.poll_interval_ms).max(10));
    let page: SharedPage = page_from_args(page_args, config);
    let emitter = Arc::new(Emitter::from_config(config, Arc::new(page.clone())));

    if !quiet {
        println!("{} Tracking {} (Ctrl+D to stop)...", "●".green(), page_args.page.cyan());
        if emitter.is_inert() {
            println!("  {} No sinks configured; events will not be delivered", "⚠".yellow());
        }
    }

    let mut handle = init_journey_tracking(Arc::clone(&emitter), interval);
    let mut in_flight: Vec<Dispatch> = handle.take_initial_dispatch().into_iter().collect();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        match parse_line(&line) {
            Ok(Some(Interaction::Navigate(path))) => page.navigate(&path),
            Ok(Some(Interaction::Resize(width))) => page.resize(width),
            Ok(Some(Interaction::Click(target))) => in_flight.push(handle.click(&target)),
            Ok(None) => {}
            Err(e) => {
                log::warn!("Skipping input line: {}", e);
                if !quiet {
                    eprintln!("{} {}", "⚠".yellow(), e);
                }
            }
        }
    }

    // Give the poller one more tick to notice a final navigation
    thread::sleep(interval + Duration::from_millis(50));
    handle.shutdown();

    let delivered = in_flight
        .into_iter()
        .flat_map(Dispatch::wait)
        .filter(|o| {
            if !o.is_delivered() {
                log::debug!("Click delivery to {} failed", o.sink());
            }
            o.is_delivered()
        })
        .count();
    log::info!("Watch finished, {} direct deliveries confirmed", delivered);

    if !quiet {
        println!("{} Tracking stopped", "●".dimmed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_navigation() {
        assert_eq!(
            parse_line("  /products/oak-table ").unwrap(),
            Some(Interaction::Navigate("/products/oak-table".to_string()))
        );
    }

    #[test]
    fn test_parse_click() {
        match parse_line(r#"{"tag": "button", "id": "buy", "x": 1, "y": 2}"#).unwrap() {
            Some(Interaction::Click(target)) => {
                assert_eq!(target.identifier(), "buy");
                assert_eq!(target.x, 1);
            }
            other => panic!("expected click, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_resize_and_blank() {
        assert_eq!(parse_line("width 640").unwrap(), Some(Interaction::Resize(640)));
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# comment").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_line("jump").is_err());
        assert!(parse_line("{not json").is_err());
        assert!(parse_line("width wide").is_err());
    }
}
