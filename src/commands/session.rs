//! Session inspection

use colored::*;
use eyre::Result;
use std::sync::Arc;

use crate::cli::SessionAction;
use crate::config::Config;
use crate::journey::session::SessionResolver;
use crate::journey::store::FileSessionStore;

pub fn run(action: SessionAction, config: &Config) -> Result<()> {
    let store = FileSessionStore::new(&config.state_dir());
    let path = store.path().to_path_buf();
    let resolver = SessionResolver::new(Arc::new(store));

    match action {
        SessionAction::Show => {
            let id = resolver.session_id()?;
            println!("{}", id);
            log::debug!("Session slot: {}", path.display());
        }
        SessionAction::Reset => {
            resolver.reset()?;
            println!("{} Session ended; the next event starts a new one", "✓".green());
        }
    }

    Ok(())
}
