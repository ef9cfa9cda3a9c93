use crate::add::add;
use crate::app::App;
use crate::models::{Deck, Id};
use crate::store::CardStore;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

/// Creates a new deck and lets the user fill it.
pub fn init(app: &mut App, name: &str, description: &str) -> Result<()> {
    let deck = create_deck(
        &mut app.store,
        name,
        description,
        app.account.clone(),
        Utc::now(),
    )?;
    println!("Created new deck {} ({})\n", deck.name, deck.id);
    add(app, deck.id.as_str())
}

fn create_deck<S: CardStore>(
    store: &mut S,
    name: &str,
    description: &str,
    owner: Option<Id>,
    now: DateTime<Utc>,
) -> Result<Deck> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("A deck needs a name. Aborting."));
    }
    if store
        .decks()?
        .iter()
        .any(|d| d.name.to_lowercase() == name.to_lowercase())
    {
        return Err(anyhow!(
            "Deck {:?} already exists! Use `flips add` to add new cards. Aborting.",
            name
        ));
    }
    let deck = Deck::new(name.to_string(), description.to_string(), owner, now);
    store.add_deck(&deck)?;
    Ok(deck)
}
