//! Host-facing seams
//!
//! The emitter never touches storage or the page directly; the host hands it these.

use eyre::Result;
use std::sync::{Arc, RwLock};

/// Session-scoped storage slot holding the session id
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, session_id: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Locally persisted identity of a signed-in visitor (read-only here)
pub trait IdentityStore: Send + Sync {
    fn user_id(&self) -> Result<Option<String>>;
}

/// Current page and viewport, as the host sees them
pub trait PageContext: Send + Sync {
    fn path(&self) -> String;
    fn referrer(&self) -> Option<String>;
    fn viewport_width(&self) -> u32;
}

/// Snapshot of what the visitor is looking at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub path: String,
    pub referrer: Option<String>,
    pub viewport_width: u32,
}

impl Default for PageSnapshot {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            referrer: None,
            viewport_width: 1280,
        }
    }
}

/// Page context the host mutates as the visitor navigates
#[derive(Debug, Clone, Default)]
pub struct SharedPage {
    inner: Arc<RwLock<PageSnapshot>>,
}

impl SharedPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Move to a new path; the previous path becomes the referrer
    pub fn navigate(&self, path: &str) {
        let mut page = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if page.path != path {
            page.referrer = Some(std::mem::replace(&mut page.path, path.to_string()));
        }
    }

    pub fn resize(&self, width: u32) {
        let mut page = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        page.viewport_width = width;
    }

    pub fn snapshot(&self) -> PageSnapshot {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PageContext for SharedPage {
    fn path(&self) -> String {
        self.snapshot().path
    }

    fn referrer(&self) -> Option<String> {
        self.snapshot().referrer
    }

    fn viewport_width(&self) -> u32 {
        self.snapshot().viewport_width
    }
}
