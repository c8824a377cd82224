//! Global instrumentation
//!
//! Starting tracking emits a page view right away, polls the current path on a fixed
//! cadence, and installs one click listener. Everything is owned by the returned
//! [`TrackingHandle`]; dropping it tears the subscription down.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::emitter::{Dispatch, Emitter};
use super::event::EventType;

/// Longest element text carried on a click event
pub const CLICK_TEXT_LIMIT: usize = 50;

/// The element a visitor clicked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickTarget {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "class")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl ClickTarget {
    /// Best-effort identifier: id, else first class, else tag
    pub fn identifier(&self) -> String {
        if let Some(id) = self.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            return id.to_string();
        }
        if let Some(class) = self.class_name.as_deref().and_then(|c| c.split_whitespace().next()) {
            return class.to_string();
        }
        self.element_type()
    }

    pub fn element_type(&self) -> String {
        let tag = self.tag.trim().to_lowercase();
        if tag.is_empty() { "unknown".to_string() } else { tag }
    }

    pub fn short_text(&self) -> String {
        self.text
            .as_deref()
            .map(|t| t.trim().chars().take(CLICK_TEXT_LIMIT).collect())
            .unwrap_or_default()
    }

    fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "elementId": self.identifier(),
            "elementType": self.element_type(),
            "text": self.short_text(),
            "x": self.x,
            "y": self.y,
        })
    }
}

fn page_view(emitter: &Emitter, path: &str, previous: Option<&str>) -> Dispatch {
    let mut metadata = serde_json::json!({ "path": path });
    if let Some(prev) = previous {
        metadata["from"] = serde_json::Value::String(prev.to_string());
    }
    emitter.emit(EventType::PageView, &format!("Page View: {}", path), Some(metadata))
}

/// Live instrumentation; tear down with [`TrackingHandle::shutdown`] or by dropping it
pub struct TrackingHandle {
    emitter: Arc<Emitter>,
    active: Arc<AtomicBool>,
    stop: Option<Sender<()>>,
    poller: Option<JoinHandle<()>>,
    initial: Option<Dispatch>,
}

impl TrackingHandle {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// The page view emitted at startup, for callers that want to wait on it
    pub fn take_initial_dispatch(&mut self) -> Option<Dispatch> {
        self.initial.take()
    }

    /// Deliver a click to the listener; ignored once torn down
    pub fn click(&self, target: &ClickTarget) -> Dispatch {
        if !self.is_active() {
            log::trace!("Click on {} after teardown ignored", target.element_type());
            return Dispatch::default();
        }
        self.emitter.emit(EventType::Click, "User Click", Some(target.metadata()))
    }

    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(poller) = self.poller.take()
            && poller.join().is_err()
        {
            log::error!("Route poller panicked");
        }
        log::debug!("Journey tracking stopped");
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Start tracking: one page view now, a path poller, and a click listener
pub fn init_journey_tracking(emitter: Arc<Emitter>, interval: Duration) -> TrackingHandle {
    let start_path = emitter.page().path();
    let initial = page_view(&emitter, &start_path, None);

    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let poll_emitter = Arc::clone(&emitter);

    let poller = thread::Builder::new().name("journey-route-poll".to_string()).spawn(move || {
        let mut last = start_path;
        let mut in_flight: Vec<Dispatch> = Vec::new();
        loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    in_flight.retain(|d| !d.is_finished());
                    let current = poll_emitter.page().path();
                    if current != last {
                        log::debug!("Route changed {} -> {}", last, current);
                        in_flight.push(page_view(&poll_emitter, &current, Some(&last)));
                        last = current;
                    }
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        // Let outstanding page views land before the poller exits
        for dispatch in in_flight {
            dispatch.wait();
        }
    });

    let poller = match poller {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::error!("Failed to start route poller: {}", e);
            None
        }
    };

    log::info!("Journey tracking started (poll every {:?})", interval);

    TrackingHandle {
        emitter,
        active: Arc::new(AtomicBool::new(true)),
        stop: Some(stop_tx),
        poller,
        initial: Some(initial),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::context::{PageSnapshot, SharedPage};
    use crate::journey::emitter::tests::{RecordingSink, emitter_with};
    use std::time::Instant;

    fn wait_for(sink: &RecordingSink, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while sink.recorded().len() < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn start(path: &str) -> (Arc<RecordingSink>, SharedPage, TrackingHandle) {
        let sink = RecordingSink::new("current");
        let page = SharedPage::new(PageSnapshot {
            path: path.to_string(),
            ..Default::default()
        });
        let emitter = Arc::new(emitter_with(vec![sink.clone()], page.clone()));
        let handle = init_journey_tracking(emitter, Duration::from_millis(20));
        (sink, page, handle)
    }

    #[test]
    fn test_initial_page_view() {
        let (sink, _page, mut handle) = start("/");
        handle.take_initial_dispatch().unwrap().wait();

        let events = sink.recorded();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::PageView);
        assert_eq!(events[0].metadata["path"], "/");
        handle.shutdown();
    }

    #[test]
    fn test_single_click_emits_one_click_event() {
        let (sink, _page, mut handle) = start("/");
        handle.take_initial_dispatch().unwrap().wait();

        let outcomes = handle
            .click(&ClickTarget {
                tag: "BUTTON".to_string(),
                text: Some("  Add to cart  ".to_string()),
                x: 10,
                y: 20,
                ..Default::default()
            })
            .wait();
        assert_eq!(outcomes.len(), 1);

        let clicks: Vec<_> = sink
            .recorded()
            .into_iter()
            .filter(|e| e.event_type == EventType::Click)
            .collect();
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].metadata["elementType"], "button");
        assert_eq!(clicks[0].metadata["elementId"], "button");
        assert_eq!(clicks[0].metadata["text"], "Add to cart");
        assert_eq!(clicks[0].metadata["x"], 10);
    }

    #[test]
    fn test_route_change_emits_page_view() {
        let (sink, page, mut handle) = start("/");
        handle.take_initial_dispatch().unwrap().wait();

        page.navigate("/products");
        wait_for(&sink, 2);

        let events = sink.recorded();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, EventType::PageView);
        assert_eq!(events[1].metadata["path"], "/products");
        assert_eq!(events[1].metadata["from"], "/");
        handle.shutdown();
    }

    #[test]
    fn test_unchanged_path_emits_nothing() {
        let (sink, _page, mut handle) = start("/");
        handle.take_initial_dispatch().unwrap().wait();

        thread::sleep(Duration::from_millis(100));
        assert_eq!(sink.recorded().len(), 1);
        handle.shutdown();
    }

    #[test]
    fn test_teardown_detaches_listener_and_poller() {
        let (sink, page, mut handle) = start("/");
        handle.take_initial_dispatch().unwrap().wait();

        let mut torn_down = handle;
        torn_down.teardown();
        assert!(!torn_down.is_active());

        assert!(torn_down.click(&ClickTarget::default()).is_empty());
        page.navigate("/cart");
        thread::sleep(Duration::from_millis(100));
        assert_eq!(sink.recorded().len(), 1);
    }

    #[test]
    fn test_click_identifier_fallbacks() {
        let mut target = ClickTarget {
            tag: "A".to_string(),
            id: Some("checkout-link".to_string()),
            class_name: Some("btn primary".to_string()),
            ..Default::default()
        };
        assert_eq!(target.identifier(), "checkout-link");

        target.id = Some("   ".to_string());
        assert_eq!(target.identifier(), "btn");

        target.class_name = None;
        assert_eq!(target.identifier(), "a");
    }

    #[test]
    fn test_click_text_truncated() {
        let target = ClickTarget {
            tag: "p".to_string(),
            text: Some("é".repeat(80)),
            ..Default::default()
        };
        assert_eq!(target.short_text().chars().count(), CLICK_TEXT_LIMIT);
    }

    #[test]
    fn test_click_target_from_json() {
        let target: ClickTarget =
            serde_json::from_str(r#"{"tag": "img", "class": "hero", "x": 3, "y": 4}"#).unwrap();
        assert_eq!(target.class_name.as_deref(), Some("hero"));
        assert_eq!(target.identifier(), "hero");
        assert_eq!(target.y, 4);
    }
}
