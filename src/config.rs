use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main journey configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub log_level: LogLevel,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Session slot and identity file
    pub state: PathBuf,
    /// JSONL journal written by file sinks
    pub journal: PathBuf,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" => Some(LogLevel::Off),
            _ => None,
        }
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// POST to a collector under the backend base URL
    Http,
    /// Append to the local JSONL journal
    File,
    /// Print to stdout
    Stdout,
}

/// One delivery target
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SinkConfig {
    pub name: String,
    pub kind: SinkKind,
    /// Collector path relative to the base URL (http sinks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl SinkConfig {
    pub fn http(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SinkKind::Http,
            path: Some(path.to_string()),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Backend project identifier
    pub project_id: Option<String>,
    /// Non-secret bearer credential for the backend
    pub publishable_key: Option<String>,
    /// Overrides the base URL derived from the project id
    pub base_url: Option<String>,
    /// Delivery targets, dispatched concurrently
    pub sinks: Vec<SinkConfig>,
    /// Route-change poll cadence
    pub poll_interval_ms: u64,
    /// Bound on the connectivity probe
    pub ping_timeout_secs: u64,
    /// Viewport width assumed when the host does not report one
    pub viewport_width: u32,
}

/// Validated credentials for the HTTP sinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub base_url: String,
    pub publishable_key: String,
}

impl TrackingConfig {
    /// Credentials, or None when project id or key is missing
    pub fn credentials(&self) -> Option<Credentials> {
        let project_id = self.project_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let key = self.publishable_key.as_deref().map(str::trim).filter(|s| !s.is_empty())?;

        let base_url = match self.base_url.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.supabase.co/functions/v1", project_id),
        };

        Some(Credentials {
            base_url,
            publishable_key: key.to_string(),
        })
    }

    pub fn enabled_sinks(&self) -> impl Iterator<Item = &SinkConfig> {
        self.sinks.iter().filter(|s| s.enabled)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            log_level: LogLevel::Info,
            tracking: TrackingConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let journey_dir = Config::journey_dir();

        Self {
            state: journey_dir.join("state"),
            journal: journey_dir.join("journal"),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            publishable_key: None,
            base_url: None,
            sinks: vec![
                SinkConfig::http("current", "journey-events"),
                SinkConfig::http("legacy", "legacy/journey-events"),
            ],
            poll_interval_ms: 1000,
            ping_timeout_secs: 5,
            viewport_width: 1280,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file(config_path)?;
        config.apply_env();
        Ok(config)
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Check JOURNEY_CONFIG env var
        if let Ok(env_path) = std::env::var("JOURNEY_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from JOURNEY_CONFIG: {}", e);
                    }
                }
            }
        }

        // Try JOURNEY_DIR/journey.yaml, then ~/.config/journey/journey.yaml
        let path = Self::journey_dir().join("journey.yaml");
        if path.exists() {
            match Self::load_from_file(&path) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }

        // Try ./journey.yaml (for development)
        let local_config = PathBuf::from("journey.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Credentials from the environment win over the file
    fn apply_env(&mut self) {
        if let Ok(project_id) = std::env::var("JOURNEY_PROJECT_ID")
            && !project_id.trim().is_empty()
        {
            self.tracking.project_id = Some(project_id);
        }
        if let Ok(key) = std::env::var("JOURNEY_PUBLISHABLE_KEY")
            && !key.trim().is_empty()
        {
            self.tracking.publishable_key = Some(key);
        }
    }

    /// Get the journey directory (config, state and journal live here)
    pub fn journey_dir() -> PathBuf {
        std::env::var("JOURNEY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("journey"))
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }

    pub fn state_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.state)
    }

    pub fn journal_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.journal)
    }
}
