//! Backend reachability probe
//!
//! The only network call here with an explicit bound: a timeout counts as unreachable.

use std::time::{Duration, Instant};

use crate::config::TrackingConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// Any HTTP response came back, whatever the status
    Reachable { status: u16, latency: Duration },
    Unreachable { reason: String },
    NotConfigured,
}

/// Probe the backend base URL with a single bounded GET
pub fn check_connectivity(config: &TrackingConfig, timeout: Duration) -> Reachability {
    let Some(credentials) = config.credentials() else {
        log::warn!("Connectivity check skipped: tracking credentials not configured");
        return Reachability::NotConfigured;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into();

    let started = Instant::now();
    let result = agent
        .get(&credentials.base_url)
        .header("Authorization", &format!("Bearer {}", credentials.publishable_key))
        .header("apikey", &credentials.publishable_key)
        .call();

    match result {
        Ok(response) => {
            let latency = started.elapsed();
            let status = response.status().as_u16();
            log::info!("Backend {} answered {} in {:?}", credentials.base_url, status, latency);
            Reachability::Reachable { status, latency }
        }
        Err(e) => {
            log::debug!("Backend {} unreachable: {}", credentials.base_url, e);
            Reachability::Unreachable { reason: e.to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn tracking(base_url: String) -> TrackingConfig {
        TrackingConfig {
            project_id: Some("shop".to_string()),
            publishable_key: Some("pk_test".to_string()),
            base_url: Some(base_url),
            ..Default::default()
        }
    }

    #[test]
    fn test_not_configured() {
        let result = check_connectivity(&TrackingConfig::default(), Duration::from_secs(1));
        assert_eq!(result, Reachability::NotConfigured);
    }

    #[test]
    fn test_any_status_is_reachable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(404);
        });

        let result = check_connectivity(&tracking(server.url("/")), Duration::from_secs(2));
        match result {
            Reachability::Reachable { status, .. } => assert_eq!(status, 404),
            other => panic!("expected reachable, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_is_unreachable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_millis(1500));
        });

        let result = check_connectivity(&tracking(server.url("/slow")), Duration::from_millis(200));
        assert!(!matches!(result, Reachability::Reachable { .. }));
    }

    #[test]
    fn test_refused_is_unreachable() {
        let result = check_connectivity(&tracking("http://127.0.0.1:9".to_string()), Duration::from_secs(1));
        assert!(matches!(result, Reachability::Unreachable { .. }));
    }
}
