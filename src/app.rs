use crate::config::Config;
use crate::error::Error;
use crate::models::{Deck, Id};
use crate::store::{CardStore, DirStore};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

/// Progress of anonymous use is recorded under this user.
const LOCAL_USER: &str = "local";

/// Everything a command needs: the local store and who is studying.
pub struct App {
    pub store: DirStore,
    /// Owner of the progress records written while reviewing.
    pub user: Id,
    /// Account to sync for, if any.
    pub account: Option<Id>,
    pub remote_dir: Option<PathBuf>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let store = DirStore::open(&config.data_dir)
            .with_context(|| format!("failed to open card store {:?}", config.data_dir))?;
        Ok(Self {
            store,
            user: config.user.clone().unwrap_or_else(|| Id::new(LOCAL_USER)),
            account: config.user,
            remote_dir: config.remote_dir,
        })
    }

    /// Finds a deck by id or by case-insensitive name.
    pub fn find_deck(&self, key: &str) -> Result<Deck> {
        let decks = self.store.decks()?;
        find_deck_in(decks, key)
    }
}

fn find_deck_in(decks: Vec<Deck>, key: &str) -> Result<Deck> {
    let id = Id::new(key);
    if let Some(deck) = decks.iter().find(|d| d.id == id) {
        return Ok(deck.clone());
    }
    let name = key.trim().to_lowercase();
    let mut matches = decks.into_iter().filter(|d| d.name.to_lowercase() == name);
    match (matches.next(), matches.next()) {
        (Some(deck), None) => Ok(deck),
        (Some(_), Some(_)) => Err(anyhow!(
            "Several decks are named {:?}. Use the deck id instead.",
            key
        )),
        (None, _) => Err(Error::NotFound { what: "Deck", id }.into()),
    }
}
