//! File-backed stand-ins for browser storage
//!
//! `<state>/session_id` plays the session-scoped slot, `<state>/identity.json` the persisted login.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::context::{IdentityStore, SessionStore};

pub const SESSION_FILE: &str = "session_id";
pub const IDENTITY_FILE: &str = "identity.json";

/// Write through a temp file in the same directory so readers never see a partial file
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| eyre::eyre!("No parent directory for {}", path.display()))?;
    fs::create_dir_all(dir).context(format!("Failed to create {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).context("Failed to create temp file")?;
    tmp.write_all(contents).context("Failed to write temp file")?;
    tmp.persist(path)
        .map_err(|e| eyre::eyre!("Failed to persist {}: {}", path.display(), e))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context(format!("Failed to remove {}", path.display())),
    }
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).context("Failed to read session slot")?;
        let trimmed = content.trim();
        Ok(if trimmed.is_empty() { None } else { Some(trimmed.to_string()) })
    }

    fn save(&self, session_id: &str) -> Result<()> {
        write_atomic(&self.path, session_id.as_bytes())
    }

    fn clear(&self) -> Result<()> {
        remove_if_exists(&self.path)
    }
}

/// Persisted identity record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(IDENTITY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a signed-in visitor
    pub fn set(&self, user_id: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            eyre::bail!("User id must not be empty");
        }
        let identity = Identity {
            user_id: user_id.trim().to_string(),
        };
        let json = serde_json::to_string_pretty(&identity).context("Failed to serialize identity")?;
        write_atomic(&self.path, json.as_bytes())
    }

    /// Forget the signed-in visitor
    pub fn clear(&self) -> Result<()> {
        remove_if_exists(&self.path)
    }
}

impl IdentityStore for FileIdentityStore {
    fn user_id(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).context("Failed to read identity file")?;
        let identity: Identity = serde_json::from_str(&content).context("Failed to parse identity file")?;
        Ok(Some(identity.user_id).filter(|id| !id.is_empty()))
    }
}
