use colored::*;
use eyre::{Context, Result};

use crate::cli::IdentityAction;
use crate::config::Config;
use crate::journey::context::IdentityStore;
use crate::journey::store::FileIdentityStore;

pub fn run(action: IdentityAction, config: &Config) -> Result<()> {
    let store = FileIdentityStore::new(&config.state_dir());

    match action {
        IdentityAction::Show => match store.user_id().context(format!("Failed to read {}", store.path().display()))? {
            Some(user_id) => println!("{}", user_id),
            None => println!("{}", "anonymous".dimmed()),
        },
        IdentityAction::Set { user_id } => {
            store.set(&user_id)?;
            println!("{} Events will carry userId {}", "✓".green(), user_id.trim().cyan());
        }
        IdentityAction::Clear => {
            store.clear()?;
            println!("{} Identity cleared; tracking anonymously", "✓".green());
        }
    }

    Ok(())
}
