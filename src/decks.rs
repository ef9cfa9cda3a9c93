use crate::app::App;
use crate::error::Result;
use crate::models::{DeckSummary, Id};
use crate::scheduler::stats_of;
use crate::store::CardStore;
use chrono::{DateTime, Utc};
use log::info;

/// All decks with their counts computed from the cards as they are now.
pub fn summaries<S: CardStore>(store: &S, user: &Id, now: DateTime<Utc>) -> Result<Vec<DeckSummary>> {
    let mut summaries = Vec::new();
    for deck in store.decks()? {
        let cards = store.cards_by_deck(&deck.id, user)?;
        summaries.push(DeckSummary {
            stats: stats_of(&cards, now),
            cards: cards.len(),
            deck: deck.header(),
        });
    }
    summaries.sort_by(|a, b| a.deck.name.to_lowercase().cmp(&b.deck.name.to_lowercase()));
    Ok(summaries)
}

pub fn list(app: &App) -> anyhow::Result<()> {
    let summaries = summaries(&app.store, &app.user, Utc::now())?;
    if summaries.is_empty() {
        println!("No decks yet. Use `flips init <name>` to create one.");
        return Ok(());
    }
    println!(
        "{:<24} {:>6} {:>6} {:>6} {:>6}  id",
        "deck", "cards", "new", "learn", "due"
    );
    for s in summaries {
        println!(
            "{:<24} {:>6} {:>6} {:>6} {:>6}  {}",
            s.deck.name, s.cards, s.stats.new, s.stats.learning, s.stats.review, s.deck.id
        );
    }
    Ok(())
}

/// Deletes a deck together with its cards and progress.
pub fn delete(app: &mut App, deck_key: &str) -> anyhow::Result<()> {
    let deck = app.find_deck(deck_key)?;
    app.store.delete_deck(&deck.id)?;
    info!("Deleted deck {}", deck.id);
    println!("Deleted deck {}.", deck.name);
    Ok(())
}
