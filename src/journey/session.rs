//! Session identity
//!
//! A session id is minted locally on first use and reused for every event until the
//! session slot is cleared. No server round-trip is involved.

use chrono::Utc;
use eyre::Result;
use rand::Rng;
use std::sync::{Arc, Mutex};

use super::context::SessionStore;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Mint a fresh token: `session_<unix-millis>_<9 base36 chars>`
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("session_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Memoizing accessor over a session store
pub struct SessionResolver {
    store: Arc<dyn SessionStore>,
    cached: Mutex<Option<String>>,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    /// Return the session id, creating and persisting one if the slot is empty
    pub fn session_id(&self) -> Result<String> {
        let mut cached = match self.cached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(ref id) = *cached {
            return Ok(id.clone());
        }

        let id = match self.store.load()? {
            Some(existing) if !existing.trim().is_empty() => existing.trim().to_string(),
            _ => {
                let fresh = generate_session_id();
                self.store.save(&fresh)?;
                log::debug!("Started new session {}", fresh);
                fresh
            }
        };

        *cached = Some(id.clone());
        Ok(id)
    }

    /// End the current session; the next access mints a new id
    pub fn reset(&self) -> Result<()> {
        let mut cached = match self.cached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cached = None;
        self.store.clear()
    }
}

/// Session slot that lives only as long as the process
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
    writes: Mutex<usize>,
}

#[cfg(test)]
impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the slot has been written
    pub fn writes(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

#[cfg(test)]
impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>> {
        let slot = self.slot.lock().map_err(|_| eyre::eyre!("session slot poisoned"))?;
        Ok(slot.clone())
    }

    fn save(&self, session_id: &str) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| eyre::eyre!("session slot poisoned"))?;
        *slot = Some(session_id.to_string());
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| eyre::eyre!("session slot poisoned"))?;
        *slot = None;
        Ok(())
    }
}
