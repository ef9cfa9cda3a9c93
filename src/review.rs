use crate::app::App;
use crate::models::{Card, Deck, Id, Outcome};
use crate::scheduler::{format_interval, preview_intervals, record_outcome, select_next_due};
use crate::store::CardStore;
use crate::utils::{clear, read_line_or_eof};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::io::{stdin, stdout, BufRead, Write};

/// Lets user review all due cards of a deck until there aren't anymore.
pub fn review(app: &mut App, deck_key: &str) -> Result<()> {
    let deck = app.find_deck(deck_key)?;
    let mut stdout_lock = stdout().lock();
    let mut stdin_lock = stdin().lock();
    if select_next_due(&app.store, &deck.id, &app.user, Utc::now())?.is_none() {
        writeln!(stdout_lock, "No cards due for review in {}", deck.name)?;
        return Ok(());
    }
    clear(&mut stdout_lock)?;
    writeln!(stdout_lock, "Reviewing due cards in {} (q to stop)\n", deck.name)?;

    let num_reviews = review_deck(
        &mut app.store,
        &deck,
        &app.user,
        &mut stdin_lock,
        &mut stdout_lock,
        Utc::now,
    )?;

    writeln!(
        stdout_lock,
        "{} review{}. Done.",
        num_reviews,
        if num_reviews == 1 { "" } else { "s" },
    )?;
    Ok(())
}

fn review_deck<S, R, W, C>(
    store: &mut S,
    deck: &Deck,
    user: &Id,
    mut stdin: R,
    mut stdout: W,
    clock: C,
) -> Result<usize>
where
    S: CardStore,
    R: BufRead,
    W: Write,
    C: Fn() -> DateTime<Utc>,
{
    let mut num_reviews = 0;
    // Forgotten cards come back right away, so this runs until the user
    // knows every due card or quits
    while let Some(card) = select_next_due(store, &deck.id, user, clock())? {
        if !review_card(store, card, user, &mut stdin, &mut stdout, clock())? {
            break;
        }
        num_reviews += 1;
    }
    Ok(num_reviews)
}

// Lets user review card. Returns false if the user quit instead.
fn review_card<S, R, W>(
    store: &mut S,
    card: Card,
    user: &Id,
    stdin: &mut R,
    stdout: &mut W,
    now: DateTime<Utc>,
) -> Result<bool>
where
    S: CardStore,
    R: BufRead,
    W: Write,
{
    write!(stdout, "F: {}", card.front)?;
    if let Some(image) = &card.front_image {
        write!(stdout, " [{}]", image)?;
    }
    stdout.flush()?;
    match read_line_or_eof(stdin)? {
        Some(line) if line.trim() != "q" => {}
        _ => return Ok(false),
    }

    writeln!(stdout, "B: {}", card.back)?;
    if let Some(image) = &card.back_image {
        writeln!(stdout, "   [{}]", image)?;
    }
    let choices: Vec<String> = Outcome::ALL
        .iter()
        .zip(preview_intervals(card.progress.as_ref()))
        .enumerate()
        .map(|(i, (outcome, days))| format!("{} {} ({})", i + 1, outcome, format_interval(days)))
        .collect();
    writeln!(stdout, "{}", choices.join(" | "))?;

    let outcome = loop {
        write!(stdout, "Answer [3]: ")?;
        stdout.flush()?;
        let Some(answer) = read_line_or_eof(stdin)? else {
            return Ok(false);
        };
        if answer.trim().is_empty() {
            break Outcome::Good;
        }
        match answer.parse::<Outcome>() {
            Ok(outcome) => break outcome,
            Err(msg) => writeln!(stdout, "{}", msg)?,
        }
    };
    record_outcome(store, card, outcome, user, now)?;
    writeln!(stdout)?;
    clear(stdout)?;
    stdout.flush()?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::io::Cursor;

    fn today() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 9, 30, 0).unwrap()
    }

    fn deck_with_card() -> (MemoryStore, Deck, Card) {
        let mut store = MemoryStore::default();
        let deck = Deck::new("Verbs".into(), String::new(), None, today());
        store.add_deck(&deck).unwrap();
        let card = Card::new(deck.id.clone(), "a".into(), "b".into());
        store.add_card(&card, today()).unwrap();
        (store, deck, card)
    }

    #[test]
    fn test_review_card() {
        let (mut store, deck, card) = deck_with_card();
        let user = Id::new("u");
        let mut stdout = Cursor::new(Vec::new());
        let mut stdin = Cursor::new(b"\n4\n");

        let reviewed = review_card(&mut store, card, &user, &mut stdin, &mut stdout, today()).unwrap();
        assert!(reviewed);

        // Check prompts
        let stdout_vec = stdout.into_inner();
        assert_eq!(
            String::from_utf8_lossy(&stdout_vec),
            "F: aB: b\n1 again (now) | 2 hard (1d) | 3 good (1d) | 4 easy (4d)\n\
            Answer [3]: \n\u{1b}[2J\u{1b}[1;1H"
        );

        // Check that card was updated: easy on a new card waits four days
        let cards = store.cards_by_deck(&deck.id, &user).unwrap();
        let progress = cards[0].progress.as_ref().unwrap();
        assert_eq!(progress.due_date, today() + Duration::days(4));
    }

    #[test]
    fn test_forgotten_card_comes_back() {
        let (mut store, deck, _) = deck_with_card();
        let user = Id::new("u");
        let mut stdout = Cursor::new(Vec::new());
        // Again, then an unknown answer, then the default
        let stdin = Cursor::new(b"\n1\n\nmaybe\n\n");

        let num_reviews = review_deck(&mut store, &deck, &user, stdin, &mut stdout, today).unwrap();

        assert_eq!(num_reviews, 2);
        let output = String::from_utf8(stdout.into_inner()).unwrap();
        assert!(output.contains("Unknown answer \"maybe\""));
        let cards = store.cards_by_deck(&deck.id, &user).unwrap();
        let progress = cards[0].progress.as_ref().unwrap();
        assert_eq!(progress.interval, 1.0);
        assert!((progress.ease_factor - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_quit_leaves_card_untouched() {
        let (mut store, deck, _) = deck_with_card();
        let user = Id::new("u");
        let mut stdout = Cursor::new(Vec::new());

        let num_reviews =
            review_deck(&mut store, &deck, &user, Cursor::new(b"q\n"), &mut stdout, today).unwrap();
        assert_eq!(num_reviews, 0);

        let num_reviews =
            review_deck(&mut store, &deck, &user, Cursor::new(b""), &mut stdout, today).unwrap();
        assert_eq!(num_reviews, 0);

        let cards = store.cards_by_deck(&deck.id, &user).unwrap();
        assert!(cards[0].progress.is_none());
    }
}
