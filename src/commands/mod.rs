pub mod completions;
pub mod config;
pub mod doctor;
pub mod emit;
pub mod identity;
pub mod observe;
pub mod ping;
pub mod session;
pub mod watch;

use colored::*;

use crate::cli::PageArgs;
use crate::config::Config;
use crate::journey::{PageSnapshot, SharedPage, SinkOutcome};

/// Page context from command-line flags, falling back to configured defaults
pub fn page_from_args(args: &PageArgs, config: &Config) -> SharedPage {
    SharedPage::new(PageSnapshot {
        path: args.page.clone(),
        referrer: args.referrer.clone(),
        viewport_width: args.viewport.unwrap_or(config.tracking.viewport_width),
    })
}

/// Print per-sink delivery results
pub fn print_outcomes(outcomes: &[SinkOutcome]) {
    for outcome in outcomes {
        match outcome {
            SinkOutcome::Delivered(receipt) => match receipt.id {
                Some(ref id) => println!("  {} {} (id {})", "✓".green(), receipt.sink, id.dimmed()),
                None => println!("  {} {}", "✓".green(), receipt.sink),
            },
            SinkOutcome::Failed { sink, reason } => {
                println!("  {} {} {}", "✗".red(), sink, reason.dimmed());
            }
        }
    }
}
