//! Delivery targets
//!
//! Every sink is independent: one failing never affects another. Sinks are built from
//! the configured descriptor list, so a collector can be retracted without code changes.

use chrono::{DateTime, Local};
use eyre::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::event::JourneyEvent;
use crate::config::{Config, Credentials, SinkConfig, SinkKind};

/// Longest response body excerpt kept in a failure message
const BODY_SNIPPET_LEN: usize = 200;

/// Proof of a successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub sink: String,
    /// Server-assigned identifier (collectors only)
    pub id: Option<String>,
}

/// A place events can be delivered to
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;
    fn deliver(&self, event: &JourneyEvent) -> Result<DeliveryReceipt>;
}

/// Collector reached over authenticated HTTP POST
pub struct HttpSink {
    name: String,
    url: String,
    publishable_key: String,
    agent: ureq::Agent,
}

impl HttpSink {
    pub fn new(name: &str, credentials: &Credentials, path: &str) -> Self {
        // Non-2xx statuses come back as responses so the body can be logged
        let config = ureq::Agent::config_builder().http_status_as_error(false).build();

        Self {
            name: name.to_string(),
            url: format!("{}/{}", credentials.base_url, path.trim_start_matches('/')),
            publishable_key: credentials.publishable_key.clone(),
            agent: config.into(),
        }
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_SNIPPET_LEN {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(BODY_SNIPPET_LEN).collect();
        format!("{}...", cut)
    }
}

impl Sink for HttpSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, event: &JourneyEvent) -> Result<DeliveryReceipt> {
        let body = serde_json::to_string(event).context("Failed to serialize event")?;

        let mut response = self
            .agent
            .post(&self.url)
            .header("Authorization", &format!("Bearer {}", self.publishable_key))
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .context(format!("HTTP request to {} failed", self.url))?;

        let status = response.status();
        let response_body = response
            .body_mut()
            .read_to_string()
            .context("Failed to read collector response")?;

        if !status.is_success() {
            eyre::bail!("Collector returned {}: {}", status.as_u16(), snippet(&response_body));
        }

        // A 2xx is a delivery; the receipt id is optional
        let id = match serde_json::from_str::<serde_json::Value>(&response_body) {
            Ok(parsed) => match &parsed["id"] {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            },
            Err(e) => {
                log::trace!("{} returned a non-JSON body: {}", self.name, e);
                None
            }
        };

        Ok(DeliveryReceipt {
            sink: self.name.clone(),
            id,
        })
    }
}

/// Journal file for a given day: `<journal>/YYYY-MM/YYYY-MM-DD.jsonl`
pub fn journal_file(journal_dir: &Path, date: DateTime<Local>) -> PathBuf {
    journal_dir
        .join(date.format("%Y-%m").to_string())
        .join(format!("{}.jsonl", date.format("%Y-%m-%d")))
}

/// Appends events to the local JSONL journal
pub struct FileSink {
    name: String,
    journal_dir: PathBuf,
    // Serializes appends from concurrent dispatch threads
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(name: &str, journal_dir: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            journal_dir,
            lock: Mutex::new(()),
        }
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, event: &JourneyEvent) -> Result<DeliveryReceipt> {
        let _guard = self.lock.lock().map_err(|_| eyre::eyre!("journal lock poisoned"))?;

        let log_file = journal_file(&self.journal_dir, Local::now());
        if let Some(month_dir) = log_file.parent() {
            fs::create_dir_all(month_dir).context("Failed to create journal directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context(format!("Failed to open {}", log_file.display()))?;

        let json = serde_json::to_string(event).context("Failed to serialize event")?;
        writeln!(file, "{}", json).context("Failed to append to journal")?;

        Ok(DeliveryReceipt {
            sink: self.name.clone(),
            id: None,
        })
    }
}

/// Prints events for interactive sessions
pub struct StdoutSink {
    name: String,
}

impl StdoutSink {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

impl Sink for StdoutSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, event: &JourneyEvent) -> Result<DeliveryReceipt> {
        println!("{}", event.format_display());
        Ok(DeliveryReceipt {
            sink: self.name.clone(),
            id: None,
        })
    }
}

/// Build the sink list from configuration
///
/// HTTP sinks are dropped when credentials are missing; that is reported once here.
pub fn build_sinks(config: &Config) -> Vec<Arc<dyn Sink>> {
    let credentials = config.tracking.credentials();
    let enabled: Vec<&SinkConfig> = config.tracking.enabled_sinks().collect();

    if credentials.is_none() && enabled.iter().any(|s| s.kind == SinkKind::Http) {
        log::warn!("Tracking project id or publishable key not configured; collector delivery disabled");
    }

    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();
    for descriptor in enabled {
        match descriptor.kind {
            SinkKind::Http => {
                let Some(ref creds) = credentials else {
                    continue;
                };
                let path = descriptor.path.as_deref().unwrap_or(descriptor.name.as_str());
                sinks.push(Arc::new(HttpSink::new(&descriptor.name, creds, path)));
            }
            SinkKind::File => {
                sinks.push(Arc::new(FileSink::new(&descriptor.name, config.journal_dir())));
            }
            SinkKind::Stdout => {
                sinks.push(Arc::new(StdoutSink::new(&descriptor.name)));
            }
        }
    }

    sinks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::event::{EventContext, EventType};
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn sample_event() -> JourneyEvent {
        JourneyEvent::new(
            EventType::AddToCart,
            "Added to Cart",
            Some(serde_json::json!({"productId": "p1", "quantity": 2})),
            EventContext {
                user_id: None,
                session_id: "session_1_abcdefghi".to_string(),
                page: "/products/p1".to_string(),
                referrer: None,
                viewport_width: 800,
            },
        )
    }

    fn creds(base_url: String) -> Credentials {
        Credentials {
            base_url,
            publishable_key: "pk_test".to_string(),
        }
    }

    #[test]
    fn test_http_sink_delivers_with_bearer_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/journey-events")
                .header("authorization", "Bearer pk_test")
                .header("apikey", "pk_test")
                .header("content-type", "application/json")
                .json_body_partial(r#"{"eventType": "add_to_cart", "metadata": {"productId": "p1"}}"#);
            then.status(201).json_body(serde_json::json!({"id": "evt_1"}));
        });

        let sink = HttpSink::new("current", &creds(server.base_url()), "journey-events");
        let receipt = sink.deliver(&sample_event()).unwrap();

        mock.assert();
        assert_eq!(receipt.sink, "current");
        assert_eq!(receipt.id, Some("evt_1".to_string()));
    }

    #[test]
    fn test_http_sink_numeric_id() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/journey-events");
            then.status(200).json_body(serde_json::json!({"id": 42}));
        });

        let sink = HttpSink::new("current", &creds(server.base_url()), "/journey-events");
        assert_eq!(sink.deliver(&sample_event()).unwrap().id, Some("42".to_string()));
    }

    #[test]
    fn test_http_sink_error_status_carries_snippet() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/journey-events");
            then.status(500).body("database unavailable");
        });

        let sink = HttpSink::new("current", &creds(server.base_url()), "journey-events");
        let err = sink.deliver(&sample_event()).unwrap_err().to_string();

        mock.assert_hits(1);
        assert!(err.contains("500"));
        assert!(err.contains("database unavailable"));
    }

    #[test]
    fn test_http_sink_success_without_json_has_no_id() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/journey-events");
            then.status(200).body("<html>ok</html>");
        });

        let sink = HttpSink::new("current", &creds(server.base_url()), "journey-events");
        let receipt = sink.deliver(&sample_event()).unwrap();
        assert_eq!(receipt.id, None);
    }

    #[test]
    fn test_http_sink_unreachable() {
        // Port 9 (discard) is not listening on test hosts
        let sink = HttpSink::new("current", &creds("http://127.0.0.1:9".to_string()), "journey-events");
        assert!(sink.deliver(&sample_event()).is_err());
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "x".repeat(500);
        let s = snippet(&long);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), BODY_SNIPPET_LEN + 3);
        assert_eq!(snippet("  short  "), "short");
    }

    #[test]
    fn test_file_sink_appends_jsonl() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::new("journal", temp.path().to_path_buf());

        sink.deliver(&sample_event()).unwrap();
        sink.deliver(&sample_event()).unwrap();

        let content = fs::read_to_string(journal_file(temp.path(), Local::now())).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: JourneyEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.event_type, EventType::AddToCart);
        assert_eq!(parsed.metadata["quantity"], 2);
    }

    #[test]
    fn test_build_sinks_without_credentials_keeps_local_only() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.journal = temp.path().to_path_buf();
        config.tracking.sinks.push(SinkConfig {
            name: "journal".to_string(),
            kind: SinkKind::File,
            path: None,
            enabled: true,
        });

        let sinks = build_sinks(&config);
        let names: Vec<&str> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["journal"]);
    }

    #[test]
    fn test_build_sinks_with_credentials() {
        let mut config = Config::default();
        config.tracking.project_id = Some("shop".to_string());
        config.tracking.publishable_key = Some("pk".to_string());
        config.tracking.sinks[1].enabled = false;

        let sinks = build_sinks(&config);
        let names: Vec<&str> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["current"]);
    }
}
