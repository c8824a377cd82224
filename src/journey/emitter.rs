//! Event emitter with fan-out delivery
//!
//! `emit` never fails and never blocks on delivery. Each sink gets its own thread; the
//! returned [`Dispatch`] can be dropped (fire-and-forget) or waited on.

use eyre::{Context, Result};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::context::{IdentityStore, PageContext, SessionStore};
use super::event::{EventContext, EventType, JourneyEvent};
use super::session::SessionResolver;
use super::sink::{DeliveryReceipt, Sink, build_sinks};
use super::store::{FileIdentityStore, FileSessionStore};
use crate::config::Config;

/// What happened at one sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Delivered(DeliveryReceipt),
    Failed { sink: String, reason: String },
}

impl SinkOutcome {
    pub fn sink(&self) -> &str {
        match self {
            SinkOutcome::Delivered(receipt) => &receipt.sink,
            SinkOutcome::Failed { sink, .. } => sink,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, SinkOutcome::Delivered(_))
    }
}

/// In-flight deliveries for one event
#[derive(Debug, Default)]
pub struct Dispatch {
    event: Option<JourneyEvent>,
    pending: Vec<(String, JoinHandle<SinkOutcome>)>,
}

impl Dispatch {
    /// The assembled event, if assembly succeeded
    pub fn event(&self) -> Option<&JourneyEvent> {
        self.event.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True once every sink has finished, without blocking
    pub fn is_finished(&self) -> bool {
        self.pending.iter().all(|(_, handle)| handle.is_finished())
    }

    /// Block until every sink has finished
    pub fn wait(self) -> Vec<SinkOutcome> {
        self.pending
            .into_iter()
            .map(|(sink, handle)| match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => SinkOutcome::Failed {
                    sink,
                    reason: "delivery thread panicked".to_string(),
                },
            })
            .collect()
    }
}

/// Builds journey events and fans them out to sinks
pub struct Emitter {
    sinks: Vec<Arc<dyn Sink>>,
    session: SessionResolver,
    identity: Arc<dyn IdentityStore>,
    page: Arc<dyn PageContext>,
}

impl Emitter {
    pub fn new(
        sinks: Vec<Arc<dyn Sink>>,
        session_store: Arc<dyn SessionStore>,
        identity: Arc<dyn IdentityStore>,
        page: Arc<dyn PageContext>,
    ) -> Self {
        Self {
            sinks,
            session: SessionResolver::new(session_store),
            identity,
            page,
        }
    }

    /// Wire the emitter to the configured sinks and the file-backed stores
    pub fn from_config(config: &Config, page: Arc<dyn PageContext>) -> Self {
        let state_dir = config.state_dir();
        Self::new(
            build_sinks(config),
            Arc::new(FileSessionStore::new(&state_dir)),
            Arc::new(FileIdentityStore::new(&state_dir)),
            page,
        )
    }

    pub fn page(&self) -> &Arc<dyn PageContext> {
        &self.page
    }

    /// True when no sink would receive anything
    pub fn is_inert(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn session_id(&self) -> Result<String> {
        self.session.session_id()
    }

    /// Build an event and deliver it to every sink
    pub fn emit(&self, event_type: EventType, event_name: &str, metadata: Option<serde_json::Value>) -> Dispatch {
        match self.assemble(event_type, event_name, metadata) {
            Ok(event) => self.dispatch(event),
            Err(e) => {
                log::error!("Failed to track {} event '{}': {:#}", event_type, event_name, e);
                Dispatch::default()
            }
        }
    }

    fn assemble(
        &self,
        event_type: EventType,
        event_name: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<JourneyEvent> {
        let user_id = self.identity.user_id().context("Failed to read stored identity")?;
        let session_id = self.session.session_id().context("Failed to resolve session id")?;

        let context = EventContext {
            user_id,
            session_id,
            page: self.page.path(),
            referrer: self.page.referrer(),
            viewport_width: self.page.viewport_width(),
        };

        Ok(JourneyEvent::new(event_type, event_name, metadata, context))
    }

    /// Start one delivery per sink without waiting on any of them
    pub fn dispatch(&self, event: JourneyEvent) -> Dispatch {
        log::debug!(
            "Dispatching {} '{}' to {} sink(s)",
            event.event_type,
            event.event_name,
            self.sinks.len()
        );

        let shared = Arc::new(event);
        let mut pending = Vec::with_capacity(self.sinks.len());

        for sink in &self.sinks {
            let sink = Arc::clone(sink);
            let event = Arc::clone(&shared);
            let name = sink.name().to_string();

            let spawned = thread::Builder::new()
                .name(format!("journey-{}", name))
                .spawn(move || deliver(sink.as_ref(), &event));

            match spawned {
                Ok(handle) => pending.push((name, handle)),
                Err(e) => log::debug!("Could not start delivery to {}: {}", name, e),
            }
        }

        Dispatch {
            event: Some((*shared).clone()),
            pending,
        }
    }
}

fn deliver(sink: &dyn Sink, event: &JourneyEvent) -> SinkOutcome {
    match sink.deliver(event) {
        Ok(receipt) => {
            log::trace!("{} accepted {} (id={:?})", receipt.sink, event.event_type, receipt.id);
            SinkOutcome::Delivered(receipt)
        }
        Err(e) => {
            log::debug!("Delivery of {} to {} failed: {:#}", event.event_type, sink.name(), e);
            SinkOutcome::Failed {
                sink: sink.name().to_string(),
                reason: format!("{:#}", e),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::journey::context::{PageSnapshot, SharedPage};
    use crate::journey::session::MemorySessionStore;
    use std::sync::Mutex;

    /// Visitor who never signed in
    pub(crate) struct Anonymous;

    impl IdentityStore for Anonymous {
        fn user_id(&self) -> Result<Option<String>> {
            Ok(None)
        }
    }

    struct KnownUser(String);

    impl IdentityStore for KnownUser {
        fn user_id(&self) -> Result<Option<String>> {
            Ok(Some(self.0.clone()))
        }
    }

    /// Sink that records what it was given
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub name: String,
        pub fail: bool,
        pub events: Mutex<Vec<JourneyEvent>>,
    }

    impl RecordingSink {
        pub fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                ..Default::default()
            })
        }

        pub fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fail: true,
                ..Default::default()
            })
        }

        pub fn recorded(&self) -> Vec<JourneyEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Sink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        fn deliver(&self, event: &JourneyEvent) -> Result<DeliveryReceipt> {
            self.events.lock().unwrap().push(event.clone());
            if self.fail {
                eyre::bail!("collector unavailable");
            }
            Ok(DeliveryReceipt {
                sink: self.name.clone(),
                id: Some("rec".to_string()),
            })
        }
    }

    struct PanickingSink;

    impl Sink for PanickingSink {
        fn name(&self) -> &str {
            "panicky"
        }
        fn deliver(&self, _event: &JourneyEvent) -> Result<DeliveryReceipt> {
            panic!("sink bug");
        }
    }

    struct DeniedIdentity;

    impl IdentityStore for DeniedIdentity {
        fn user_id(&self) -> Result<Option<String>> {
            eyre::bail!("storage access denied")
        }
    }

    pub(crate) fn emitter_with(sinks: Vec<Arc<dyn Sink>>, page: SharedPage) -> Emitter {
        Emitter::new(sinks, Arc::new(MemorySessionStore::new()), Arc::new(Anonymous), Arc::new(page))
    }

    #[test]
    fn test_emit_reaches_every_sink() {
        let a = RecordingSink::new("current");
        let b = RecordingSink::new("legacy");
        let emitter = emitter_with(vec![a.clone(), b.clone()], SharedPage::default());

        let outcomes = emitter
            .emit(
                EventType::AddToCart,
                "Added to Cart",
                Some(serde_json::json!({"productId": "p1", "quantity": 2})),
            )
            .wait();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(SinkOutcome::is_delivered));
        for sink in [&a, &b] {
            let events = sink.recorded();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].event_type, EventType::AddToCart);
            assert_eq!(events[0].metadata["productId"], "p1");
            assert!(!events[0].session_id.is_empty());
        }
    }

    #[test]
    fn test_one_failing_sink_does_not_affect_other() {
        let bad = RecordingSink::failing("current");
        let good = RecordingSink::new("legacy");
        let emitter = emitter_with(vec![bad.clone(), good.clone()], SharedPage::default());

        let outcomes = emitter.emit(EventType::Search, "Search", None).wait();

        assert_eq!(bad.recorded().len(), 1);
        assert_eq!(good.recorded().len(), 1);
        let failed: Vec<&str> = outcomes.iter().filter(|o| !o.is_delivered()).map(|o| o.sink()).collect();
        assert_eq!(failed, vec!["current"]);
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let good = RecordingSink::new("legacy");
        let emitter = emitter_with(vec![Arc::new(PanickingSink), good.clone()], SharedPage::default());

        let outcomes = emitter.emit(EventType::Login, "Login", None).wait();

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].is_delivered());
        assert!(outcomes[1].is_delivered());
    }

    #[test]
    fn test_no_sinks_is_a_no_op() {
        let emitter = emitter_with(vec![], SharedPage::default());
        assert!(emitter.is_inert());

        let dispatch = emitter.emit(EventType::PageView, "Page View: Home", None);
        assert!(dispatch.is_empty());
        assert!(dispatch.wait().is_empty());
    }

    #[test]
    fn test_session_is_stable_across_events() {
        let sink = RecordingSink::new("current");
        let emitter = emitter_with(vec![sink.clone()], SharedPage::default());

        for _ in 0..3 {
            emitter.emit(EventType::Click, "Click", None).wait();
        }

        let events = sink.recorded();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.session_id == events[0].session_id));
        assert_eq!(emitter.session_id().unwrap(), events[0].session_id);
    }

    #[test]
    fn test_anonymous_visitor_has_no_user_id() {
        let sink = RecordingSink::new("current");
        let emitter = emitter_with(vec![sink.clone()], SharedPage::default());

        let outcomes = emitter.emit(EventType::PageView, "Page View", None).wait();

        assert!(outcomes[0].is_delivered());
        let json = serde_json::to_value(&sink.recorded()[0]).unwrap();
        assert!(json.get("userId").is_none());
    }

    #[test]
    fn test_known_user_and_page_context() {
        let sink = RecordingSink::new("current");
        let page = SharedPage::new(PageSnapshot {
            path: "/cart".to_string(),
            referrer: Some("/products".to_string()),
            viewport_width: 600,
        });
        let emitter = Emitter::new(
            vec![sink.clone()],
            Arc::new(MemorySessionStore::new()),
            Arc::new(KnownUser("u-9".to_string())),
            Arc::new(page),
        );

        emitter.emit(EventType::CheckoutStart, "Checkout Started", None).wait();

        let event = &sink.recorded()[0];
        assert_eq!(event.user_id.as_deref(), Some("u-9"));
        assert_eq!(event.page, "/cart");
        assert_eq!(event.referrer.as_deref(), Some("/products"));
        assert_eq!(event.device_type, crate::journey::event::DeviceType::Mobile);
    }

    #[test]
    fn test_storage_failure_is_swallowed() {
        let sink = RecordingSink::new("current");
        let emitter = Emitter::new(
            vec![sink.clone()],
            Arc::new(MemorySessionStore::new()),
            Arc::new(DeniedIdentity),
            Arc::new(SharedPage::default()),
        );

        let dispatch = emitter.emit(EventType::Signup, "Sign Up", None);

        assert!(dispatch.event().is_none());
        assert!(dispatch.wait().is_empty());
        assert!(sink.recorded().is_empty());
    }

    #[test]
    fn test_dropped_dispatch_still_delivers() {
        let sink = RecordingSink::new("current");
        let emitter = emitter_with(vec![sink.clone()], SharedPage::default());

        drop(emitter.emit(EventType::Logout, "Logout", None));

        for _ in 0..100 {
            if !sink.recorded().is_empty() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(sink.recorded().len(), 1);
    }
}
