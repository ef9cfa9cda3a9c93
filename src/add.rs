use crate::app::App;
use crate::models::{Card, Deck, Id};
use crate::store::CardStore;
use crate::utils::read_line;
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::io::{stdin, stdout, BufRead, Write};

/// Lets user add as many new cards as they want to a given deck.
pub fn add(app: &mut App, deck_key: &str) -> Result<()> {
    let deck = app.find_deck(deck_key)?;
    let mut stdout_lock = stdout().lock();
    let mut stdin_lock = stdin().lock();
    let added = add_cards(
        &mut app.store,
        &deck,
        &app.user,
        &mut stdin_lock,
        &mut stdout_lock,
    )?;
    writeln!(
        stdout_lock,
        "Added {} card{} to {}.",
        added,
        if added == 1 { "" } else { "s" },
        deck.name
    )?;
    Ok(())
}

fn add_cards<S, R, W>(
    store: &mut S,
    deck: &Deck,
    user: &Id,
    mut stdin: R,
    mut stdout: W,
) -> Result<usize>
where
    S: CardStore,
    R: BufRead,
    W: Write,
{
    let mut fronts: HashSet<String> = store
        .cards_by_deck(&deck.id, user)?
        .into_iter()
        .map(|c| c.front)
        .collect();
    let mut added = 0;

    loop {
        stdout.write_all(b"Front: ")?;
        stdout.flush()?;
        let front: String = read_line(&mut stdin)?;
        // Exit on empty input
        if front.is_empty() {
            return Ok(added);
        }

        if fronts.contains(&front) {
            return Err(anyhow!(
                "A card with this front side already exists in deck {}!",
                deck.name
            ));
        }

        stdout.write_all(b"Back:  ")?;
        stdout.flush()?;
        let back: String = read_line(&mut stdin)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        store.add_card(&Card::new(deck.id.clone(), front.clone(), back), Utc::now())?;
        fronts.insert(front);
        added += 1;
    }
}
