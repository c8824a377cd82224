//! One-shot event emission
//!
//! Handles both `journey emit` (raw type + name) and `journey track <action>` (typed wrappers).

use colored::*;
use eyre::{Context, Result};
use std::sync::Arc;

use crate::cli::{PageArgs, TrackAction};
use crate::config::Config;
use crate::journey::track::{CartItem, CartSnapshot, OrderSummary, ProductView};
use crate::journey::{Dispatch, Emitter, EventType};

use super::{page_from_args, print_outcomes};

fn parse_metadata(raw: Option<&str>) -> Result<Option<serde_json::Value>> {
    raw.map(|s| serde_json::from_str(s).context("Metadata must be valid JSON"))
        .transpose()
}

fn emitter_for(page: &PageArgs, config: &Config) -> Emitter {
    Emitter::from_config(config, Arc::new(page_from_args(page, config)))
}

/// Wait for delivery so the process does not exit with requests in flight
fn finish(dispatch: Dispatch, quiet: bool) -> Result<()> {
    let Some(event) = dispatch.event().cloned() else {
        if !quiet {
            println!("{} Event could not be assembled (see log)", "⚠".yellow());
        }
        return Ok(());
    };

    let nothing_sent = dispatch.is_empty();
    let outcomes = dispatch.wait();
    if quiet {
        return Ok(());
    }

    println!("{}", event.format_display());
    if nothing_sent {
        println!("  {} No sinks configured; event was not delivered", "⚠".yellow());
    }
    print_outcomes(&outcomes);
    Ok(())
}

pub fn run(event_type: &str, name: &str, metadata: Option<&str>, page: &PageArgs, quiet: bool, config: &Config) -> Result<()> {
    let event_type = EventType::from_str(event_type).ok_or_else(|| {
        let known: Vec<&str> = EventType::ALL.iter().map(|t| t.as_str()).collect();
        eyre::eyre!("Unknown event type '{}' (expected one of: {})", event_type, known.join(", "))
    })?;
    if name.trim().is_empty() {
        eyre::bail!("Event name must not be empty");
    }
    let metadata = parse_metadata(metadata)?;

    let emitter = emitter_for(page, config);
    let dispatch = emitter.emit(event_type, name, metadata);
    finish(dispatch, quiet)
}

pub fn track(action: TrackAction, page: &PageArgs, quiet: bool, config: &Config) -> Result<()> {
    let emitter = emitter_for(page, config);

    let dispatch = match action {
        TrackAction::PageView { page_name } => emitter.track_page_view(&page_name),
        TrackAction::ButtonClick { button_name, location } => emitter.track_button_click(&button_name, &location),
        TrackAction::FormSubmit { form_name, failed } => emitter.track_form_submit(&form_name, !failed),
        TrackAction::ProductView {
            product_id,
            product_name,
            price,
        } => emitter.track_product_view(&ProductView {
            product_id,
            product_name,
            price,
        }),
        TrackAction::AddToCart {
            product_id,
            product_name,
            price,
            quantity,
        } => emitter.track_add_to_cart(&CartItem {
            product_id,
            product_name,
            price,
            quantity,
        }),
        TrackAction::RemoveFromCart {
            product_id,
            product_name,
            price,
            quantity,
        } => emitter.track_remove_from_cart(&CartItem {
            product_id,
            product_name,
            price,
            quantity,
        }),
        TrackAction::CartCleared { item_count, cart_total } => emitter.track_cart_cleared(item_count, cart_total),
        TrackAction::CartAbandoned { items } => emitter.track_cart_abandoned(&CartSnapshot::from_items(items)),
        TrackAction::CheckoutStart { cart_total, item_count } => emitter.track_checkout_start(cart_total, item_count),
        TrackAction::CheckoutComplete {
            order_id,
            total,
            item_count,
        } => emitter.track_checkout_complete(&OrderSummary {
            order_id,
            total,
            item_count,
        }),
        TrackAction::Search { query, results } => emitter.track_search(&query, results),
        TrackAction::Filter { filter_type, value } => emitter.track_filter(&filter_type, &value),
        TrackAction::Signup { method } => emitter.track_signup(&method),
        TrackAction::Login { method } => emitter.track_login(&method),
        TrackAction::Logout => emitter.track_logout(),
        TrackAction::Custom { name, metadata } => {
            let metadata = parse_metadata(metadata.as_deref())?;
            emitter.track_custom(&name, metadata)
        }
    };

    finish(dispatch, quiet)
}
