use colored::*;
use eyre::{Context, Result};
use std::fs;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::{Config, LogLevel};

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
        ConfigAction::Set { key, value } => set(&key, &value, config),
    }
}

/// Hide all but the last four characters of a credential
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "Journey Configuration".bold());
            println!();

            println!("{}:", "paths".cyan());
            println!("  state: {}", config.paths.state.display());
            println!("  journal: {}", config.paths.journal.display());
            println!();

            println!("{}: {}", "log_level".cyan(), config.log_level.as_filter());
            println!();

            let tracking = &config.tracking;
            println!("{}:", "tracking".cyan());
            println!("  project_id: {}", tracking.project_id.as_deref().unwrap_or("(unset)"));
            println!(
                "  publishable_key: {}",
                tracking.publishable_key.as_deref().map(mask).unwrap_or_else(|| "(unset)".to_string())
            );
            match tracking.credentials() {
                Some(creds) => println!("  base_url: {}", creds.base_url),
                None => println!("  base_url: {}", "(collectors disabled)".dimmed()),
            }
            println!("  poll_interval_ms: {}", tracking.poll_interval_ms);
            println!("  ping_timeout_secs: {}", tracking.ping_timeout_secs);
            println!("  viewport_width: {}", tracking.viewport_width);
            println!("  sinks:");
            for sink in &tracking.sinks {
                let state = if sink.enabled { "enabled".green() } else { "disabled".dimmed() };
                match sink.path {
                    Some(ref path) => println!("    - {} ({:?}, {}) {}", sink.name, sink.kind, path, state),
                    None => println!("    - {} ({:?}) {}", sink.name, sink.kind, state),
                }
            }
        }
    }

    Ok(())
}

fn get(key: &str, config: &Config) -> Result<()> {
    let value = match key {
        "paths.state" => Some(config.paths.state.display().to_string()),
        "paths.journal" => Some(config.paths.journal.display().to_string()),
        "log_level" | "log-level" => Some(config.log_level.as_filter().to_string()),
        "tracking.project_id" => Some(config.tracking.project_id.clone().unwrap_or_default()),
        "tracking.base_url" => config.tracking.credentials().map(|c| c.base_url),
        "tracking.poll_interval_ms" => Some(config.tracking.poll_interval_ms.to_string()),
        "tracking.ping_timeout_secs" => Some(config.tracking.ping_timeout_secs.to_string()),
        "tracking.viewport_width" => Some(config.tracking.viewport_width.to_string()),
        _ => None,
    };

    match value {
        Some(v) => println!("{}", v),
        None => {
            eprintln!("{} Unknown or unset config key: {}", "✗".red(), key);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Apply one key to a config copy
fn apply(key: &str, value: &str, config: &mut Config) -> Result<()> {
    match key {
        "paths.state" => config.paths.state = value.into(),
        "paths.journal" => config.paths.journal = value.into(),
        "log_level" | "log-level" => {
            config.log_level =
                LogLevel::from_str(value).ok_or_else(|| eyre::eyre!("Invalid log level: {}", value))?;
        }
        "tracking.project_id" => config.tracking.project_id = Some(value.to_string()),
        "tracking.publishable_key" => config.tracking.publishable_key = Some(value.to_string()),
        "tracking.base_url" => config.tracking.base_url = Some(value.to_string()),
        "tracking.poll_interval_ms" => {
            config.tracking.poll_interval_ms = value.parse().context("Invalid interval (milliseconds)")?;
        }
        "tracking.ping_timeout_secs" => {
            config.tracking.ping_timeout_secs = value.parse().context("Invalid timeout (seconds)")?;
        }
        "tracking.viewport_width" => {
            config.tracking.viewport_width = value.parse().context("Invalid width (pixels)")?;
        }
        _ => {
            if let Some(name) = key.strip_prefix("tracking.sinks.").and_then(|k| k.strip_suffix(".enabled")) {
                let enabled: bool = value.parse().context("Invalid boolean value (use 'true' or 'false')")?;
                let sink = config
                    .tracking
                    .sinks
                    .iter_mut()
                    .find(|s| s.name == name)
                    .ok_or_else(|| eyre::eyre!("No sink named {}", name))?;
                sink.enabled = enabled;
            } else {
                eyre::bail!("Unknown config key: {}", key);
            }
        }
    }
    Ok(())
}

fn set(key: &str, value: &str, config: &Config) -> Result<()> {
    println!("{} Setting {} = {}", "→".blue(), key.cyan(), value.green());

    let mut new_config = config.clone();
    apply(key, value, &mut new_config)?;

    let config_path = Config::journey_dir().join("journey.yaml");
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml_str = serde_yaml::to_string(&new_config).context("Failed to serialize config")?;
    fs::write(&config_path, yaml_str).context("Failed to write config file")?;

    println!("  {} Saved to {}", "✓".green(), config_path.display());

    Ok(())
}
