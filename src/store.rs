//! Card and deck storage.
//!
//! The scheduler and the sync reconciler only see the [`CardStore`] and
//! [`RemoteStore`] traits. [`DirStore`] implements both over a directory:
//! ```text
//! {root}/
//! ├── decks.csv      # one row per deck
//! ├── cards.csv      # one row per card
//! └── progress.csv   # one row per (card, user)
//! ```
//! A remote is just another such directory, e.g. a shared folder.

use crate::error::StoreError;
use crate::models::{Card, CardProgress, Deck, DeckHeader, Id};
use crate::utils::{read_table, write_table};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use struct_field_names_as_array::FieldNamesAsArray;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

const DECKS: &str = "decks.csv";
const CARDS: &str = "cards.csv";
const PROGRESS: &str = "progress.csv";

/// Local deck storage.
pub trait CardStore {
    /// All decks, without cards.
    fn decks(&self) -> StoreResult<Vec<Deck>>;

    /// A deck with its cards, each carrying `user`'s progress if any.
    fn deck(&self, id: &Id, user: &Id) -> StoreResult<Option<Deck>>;

    /// Cards of a deck, each carrying `user`'s progress if any.
    fn cards_by_deck(&self, deck_id: &Id, user: &Id) -> StoreResult<Vec<Card>>;

    /// Inserts a deck together with its cards and their progress.
    fn add_deck(&mut self, deck: &Deck) -> StoreResult<()>;

    /// Deletes a deck, its cards and all progress on them.
    fn delete_deck(&mut self, id: &Id) -> StoreResult<()>;

    /// Adds a card and marks its deck as changed at `now`.
    fn add_card(&mut self, card: &Card, now: DateTime<Utc>) -> StoreResult<()>;

    /// Writes a card and the progress attached to it, marking its deck as
    /// changed at `now`.
    fn update_card(&mut self, card: &Card, now: DateTime<Utc>) -> StoreResult<()>;

    /// Swaps a deck for a new version of it as seen by `user`.
    ///
    /// `user`'s progress comes from the new version. Progress of other users
    /// on cards that are still in the deck is kept.
    fn replace_deck(&mut self, deck: &Deck, user: &Id) -> StoreResult<()>;

    /// Records a finished sync without counting it as a content change.
    fn mark_synced(&mut self, id: &Id, at: DateTime<Utc>) -> StoreResult<()>;
}

/// The cloud side of a sync.
pub trait RemoteStore {
    /// Headers of all decks visible to `user`.
    fn list_deck_headers(&self, user: &Id) -> StoreResult<Vec<DeckHeader>>;

    fn fetch_deck(&self, id: &Id) -> StoreResult<Option<DeckHeader>>;

    fn fetch_cards(&self, deck_id: &Id) -> StoreResult<Vec<Card>>;

    fn fetch_progress(&self, card_ids: &[Id], user: &Id) -> StoreResult<Vec<CardProgress>>;

    fn upsert_deck(&mut self, deck: &DeckHeader) -> StoreResult<()>;

    fn upsert_cards(&mut self, cards: &[Card]) -> StoreResult<()>;

    fn upsert_progress(&mut self, progress: &[CardProgress]) -> StoreResult<()>;
}

/// All rows of a store.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    decks: Vec<Deck>,
    cards: Vec<Card>,
    progress: Vec<CardProgress>,
}

impl Tables {
    fn cards_of(&self, deck_id: &Id, user: &Id) -> Vec<Card> {
        self.cards
            .iter()
            .filter(|c| &c.deck_id == deck_id)
            .map(|c| {
                let mut card = c.clone();
                card.progress = self
                    .progress
                    .iter()
                    .find(|p| p.card_id == card.id && &p.user_id == user)
                    .cloned();
                card
            })
            .collect()
    }

    fn deck_with_cards(&self, id: &Id, user: &Id) -> Option<Deck> {
        let mut deck = self.decks.iter().find(|d| &d.id == id)?.clone();
        deck.cards = self.cards_of(id, user);
        Some(deck)
    }

    fn deck_mut(&mut self, id: &Id) -> StoreResult<&mut Deck> {
        self.decks
            .iter_mut()
            .find(|d| &d.id == id)
            .ok_or_else(|| StoreError::Missing(id.clone()))
    }

    fn insert_deck(&mut self, deck: &Deck) -> StoreResult<()> {
        if self.decks.iter().any(|d| d.id == deck.id) {
            return Err(StoreError::Duplicate(deck.id.clone()));
        }
        let mut row = deck.clone();
        let cards = std::mem::take(&mut row.cards);
        self.decks.push(row);
        for card in cards {
            let (row, progress) = split_row(card);
            if let Some(progress) = progress {
                self.put_progress(progress);
            }
            self.cards.push(row);
        }
        Ok(())
    }

    fn replace_deck(&mut self, deck: &Deck, user: &Id) -> StoreResult<()> {
        let kept: Vec<CardProgress> = self
            .progress
            .iter()
            .filter(|p| &p.user_id != user && deck.cards.iter().any(|c| c.id == p.card_id))
            .cloned()
            .collect();
        self.remove_deck(&deck.id);
        self.insert_deck(deck)?;
        for progress in kept {
            self.put_progress(progress);
        }
        Ok(())
    }

    fn remove_deck(&mut self, id: &Id) {
        let card_ids: Vec<Id> = self
            .cards
            .iter()
            .filter(|c| &c.deck_id == id)
            .map(|c| c.id.clone())
            .collect();
        self.progress.retain(|p| !card_ids.contains(&p.card_id));
        self.cards.retain(|c| &c.deck_id != id);
        self.decks.retain(|d| &d.id != id);
    }

    fn insert_card(&mut self, card: &Card, now: DateTime<Utc>) -> StoreResult<()> {
        if self.cards.iter().any(|c| c.id == card.id) {
            return Err(StoreError::Duplicate(card.id.clone()));
        }
        self.deck_mut(&card.deck_id)?.updated_at = now;
        let (row, progress) = split_row(card.clone());
        if let Some(progress) = progress {
            self.put_progress(progress);
        }
        self.cards.push(row);
        Ok(())
    }

    fn update_card(&mut self, card: &Card, now: DateTime<Utc>) -> StoreResult<()> {
        let slot = self
            .cards
            .iter_mut()
            .find(|c| c.id == card.id)
            .ok_or_else(|| StoreError::Missing(card.id.clone()))?;
        let (row, progress) = split_row(card.clone());
        *slot = row;
        if let Some(progress) = progress {
            self.put_progress(progress);
        }
        self.deck_mut(&card.deck_id)?.updated_at = now;
        Ok(())
    }

    fn put_deck(&mut self, deck: Deck) {
        match self.decks.iter_mut().find(|d| d.id == deck.id) {
            Some(slot) => *slot = deck,
            None => self.decks.push(deck),
        }
    }

    fn put_card(&mut self, card: Card) {
        let (card, _) = split_row(card);
        match self.cards.iter_mut().find(|c| c.id == card.id) {
            Some(slot) => *slot = card,
            None => self.cards.push(card),
        }
    }

    fn put_progress(&mut self, progress: CardProgress) {
        match self
            .progress
            .iter_mut()
            .find(|p| p.card_id == progress.card_id && p.user_id == progress.user_id)
        {
            Some(slot) => *slot = progress,
            None => self.progress.push(progress),
        }
    }

    fn headers_for(&self, user: &Id) -> Vec<DeckHeader> {
        self.decks
            .iter()
            .filter(|d| d.owner.as_ref() == Some(user))
            .map(Deck::header)
            .collect()
    }

    fn progress_for(&self, card_ids: &[Id], user: &Id) -> Vec<CardProgress> {
        self.progress
            .iter()
            .filter(|p| &p.user_id == user && card_ids.contains(&p.card_id))
            .cloned()
            .collect()
    }
}

/// Separates a card into its table row and its progress. Empty media and
/// answer fields become `None`, which is also how an empty CSV field reads
/// back.
fn split_row(mut card: Card) -> (Card, Option<CardProgress>) {
    let progress = card.progress.take();
    for field in [
        &mut card.front_image,
        &mut card.front_audio,
        &mut card.back_image,
        &mut card.back_audio,
        &mut card.answer,
    ] {
        if field.as_deref().is_some_and(str::is_empty) {
            *field = None;
        }
    }
    (card, progress)
}

/// Store kept as CSV tables in a directory.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Opens the store at `root`, creating the directory if needed.
    pub fn open(root: &Path) -> StoreResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load(&self) -> StoreResult<Tables> {
        Ok(Tables {
            decks: read_table(&self.root.join(DECKS))?,
            cards: read_table(&self.root.join(CARDS))?,
            progress: read_table(&self.root.join(PROGRESS))?,
        })
    }

    fn save(&self, tables: &Tables) -> StoreResult<()> {
        write_table(&self.root.join(DECKS), &Deck::FIELD_NAMES_AS_ARRAY, &tables.decks)?;
        write_table(&self.root.join(CARDS), &Card::FIELD_NAMES_AS_ARRAY, &tables.cards)?;
        write_table(
            &self.root.join(PROGRESS),
            &CardProgress::FIELD_NAMES_AS_ARRAY,
            &tables.progress,
        )?;
        Ok(())
    }

    /// Loads all tables, applies `f` and writes the result back.
    fn modify<T>(&mut self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let mut tables = self.load()?;
        let result = f(&mut tables)?;
        self.save(&tables)?;
        Ok(result)
    }
}

impl CardStore for DirStore {
    fn decks(&self) -> StoreResult<Vec<Deck>> {
        Ok(self.load()?.decks)
    }

    fn deck(&self, id: &Id, user: &Id) -> StoreResult<Option<Deck>> {
        Ok(self.load()?.deck_with_cards(id, user))
    }

    fn cards_by_deck(&self, deck_id: &Id, user: &Id) -> StoreResult<Vec<Card>> {
        Ok(self.load()?.cards_of(deck_id, user))
    }

    fn add_deck(&mut self, deck: &Deck) -> StoreResult<()> {
        self.modify(|t| t.insert_deck(deck))
    }

    fn delete_deck(&mut self, id: &Id) -> StoreResult<()> {
        self.modify(|t| {
            t.remove_deck(id);
            Ok(())
        })
    }

    fn add_card(&mut self, card: &Card, now: DateTime<Utc>) -> StoreResult<()> {
        self.modify(|t| t.insert_card(card, now))
    }

    fn update_card(&mut self, card: &Card, now: DateTime<Utc>) -> StoreResult<()> {
        self.modify(|t| t.update_card(card, now))
    }

    // One load and one save, so a failure leaves the old deck in place.
    fn replace_deck(&mut self, deck: &Deck, user: &Id) -> StoreResult<()> {
        self.modify(|t| t.replace_deck(deck, user))
    }

    fn mark_synced(&mut self, id: &Id, at: DateTime<Utc>) -> StoreResult<()> {
        self.modify(|t| {
            t.deck_mut(id)?.last_synced_at = Some(at);
            Ok(())
        })
    }
}

impl RemoteStore for DirStore {
    fn list_deck_headers(&self, user: &Id) -> StoreResult<Vec<DeckHeader>> {
        Ok(self.load()?.headers_for(user))
    }

    fn fetch_deck(&self, id: &Id) -> StoreResult<Option<DeckHeader>> {
        Ok(self
            .load()?
            .decks
            .iter()
            .find(|d| &d.id == id)
            .map(Deck::header))
    }

    fn fetch_cards(&self, deck_id: &Id) -> StoreResult<Vec<Card>> {
        Ok(self
            .load()?
            .cards
            .into_iter()
            .filter(|c| &c.deck_id == deck_id)
            .collect())
    }

    fn fetch_progress(&self, card_ids: &[Id], user: &Id) -> StoreResult<Vec<CardProgress>> {
        Ok(self.load()?.progress_for(card_ids, user))
    }

    fn upsert_deck(&mut self, deck: &DeckHeader) -> StoreResult<()> {
        self.modify(|t| {
            t.put_deck(Deck::from(deck.clone()));
            Ok(())
        })
    }

    fn upsert_cards(&mut self, cards: &[Card]) -> StoreResult<()> {
        self.modify(|t| {
            for card in cards {
                t.put_card(card.clone());
            }
            Ok(())
        })
    }

    fn upsert_progress(&mut self, progress: &[CardProgress]) -> StoreResult<()> {
        self.modify(|t| {
            for p in progress {
                t.put_progress(p.clone());
            }
            Ok(())
        })
    }
}

/// In-memory store whose writes can be made to fail.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    tables: Tables,
    pub fail_writes: bool,
    /// Fails only progress upserts, for partial upload scenarios.
    pub fail_progress: bool,
}

#[cfg(test)]
impl MemoryStore {
    fn write(&mut self) -> StoreResult<&mut Tables> {
        if self.fail_writes {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "write refused",
            )));
        }
        Ok(&mut self.tables)
    }

    pub fn set_updated_at(&mut self, id: &Id, at: DateTime<Utc>) {
        if let Ok(deck) = self.tables.deck_mut(id) {
            deck.updated_at = at;
        }
    }
}

#[cfg(test)]
impl CardStore for MemoryStore {
    fn decks(&self) -> StoreResult<Vec<Deck>> {
        Ok(self.tables.decks.clone())
    }

    fn deck(&self, id: &Id, user: &Id) -> StoreResult<Option<Deck>> {
        Ok(self.tables.deck_with_cards(id, user))
    }

    fn cards_by_deck(&self, deck_id: &Id, user: &Id) -> StoreResult<Vec<Card>> {
        Ok(self.tables.cards_of(deck_id, user))
    }

    fn add_deck(&mut self, deck: &Deck) -> StoreResult<()> {
        self.write()?.insert_deck(deck)
    }

    fn delete_deck(&mut self, id: &Id) -> StoreResult<()> {
        self.write()?.remove_deck(id);
        Ok(())
    }

    fn add_card(&mut self, card: &Card, now: DateTime<Utc>) -> StoreResult<()> {
        self.write()?.insert_card(card, now)
    }

    fn update_card(&mut self, card: &Card, now: DateTime<Utc>) -> StoreResult<()> {
        self.write()?.update_card(card, now)
    }

    fn replace_deck(&mut self, deck: &Deck, user: &Id) -> StoreResult<()> {
        self.write()?.replace_deck(deck, user)
    }

    fn mark_synced(&mut self, id: &Id, at: DateTime<Utc>) -> StoreResult<()> {
        self.write()?.deck_mut(id)?.last_synced_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
impl RemoteStore for MemoryStore {
    fn list_deck_headers(&self, user: &Id) -> StoreResult<Vec<DeckHeader>> {
        Ok(self.tables.headers_for(user))
    }

    fn fetch_deck(&self, id: &Id) -> StoreResult<Option<DeckHeader>> {
        Ok(self
            .tables
            .decks
            .iter()
            .find(|d| &d.id == id)
            .map(Deck::header))
    }

    fn fetch_cards(&self, deck_id: &Id) -> StoreResult<Vec<Card>> {
        Ok(self
            .tables
            .cards
            .iter()
            .filter(|c| &c.deck_id == deck_id)
            .cloned()
            .collect())
    }

    fn fetch_progress(&self, card_ids: &[Id], user: &Id) -> StoreResult<Vec<CardProgress>> {
        Ok(self.tables.progress_for(card_ids, user))
    }

    fn upsert_deck(&mut self, deck: &DeckHeader) -> StoreResult<()> {
        self.write()?.put_deck(Deck::from(deck.clone()));
        Ok(())
    }

    fn upsert_cards(&mut self, cards: &[Card]) -> StoreResult<()> {
        let tables = self.write()?;
        for card in cards {
            tables.put_card(card.clone());
        }
        Ok(())
    }

    fn upsert_progress(&mut self, progress: &[CardProgress]) -> StoreResult<()> {
        if self.fail_progress {
            return Err(StoreError::Corrupt("progress table rejected".into()));
        }
        let tables = self.write()?;
        for p in progress {
            tables.put_progress(p.clone());
        }
        Ok(())
    }
}
