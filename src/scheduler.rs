//! SM-2 derived review scheduling.
//!
//! Cards are graded with one of four [`Outcome`]s. A card whose interval is
//! zero is new or was forgotten and is shown again right away. Any non-zero
//! interval is at least one day.

use crate::error::Result;
use crate::models::{Card, CardProgress, DeckStats, Id, Outcome, MIN_EASE_FACTOR};
use crate::store::CardStore;
use chrono::{DateTime, Duration, Utc};
use log::debug;

/// Intervals below this count as zero.
const ZERO_INTERVAL: f64 = 0.01;

/// Cards due within this many seconds are already shown.
const DUE_TOLERANCE_SECS: i64 = 60;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Longest interval a review can give, about a hundred years. Keeps repeated
/// Easy answers from pushing due dates out of range.
pub const MAX_INTERVAL_DAYS: f64 = 36_500.0;

/// Returns the card to study next in a deck, or `None` if nothing is due.
///
/// New cards come first, then learning or lapsed cards, then scheduled
/// reviews. Within each group the card that has been due longest wins.
pub fn select_next_due<S: CardStore>(
    store: &S,
    deck_id: &Id,
    user: &Id,
    now: DateTime<Utc>,
) -> Result<Option<Card>> {
    let cards = store.cards_by_deck(deck_id, user)?;
    let next = cards
        .into_iter()
        .filter(|card| is_eligible(card, now))
        .min_by_key(priority);
    if let Some(card) = &next {
        debug!("Next card in deck {}: {}", deck_id, card.id);
    }
    Ok(next)
}

fn is_eligible(card: &Card, now: DateTime<Utc>) -> bool {
    match &card.progress {
        None => true,
        Some(p) => {
            p.interval < ZERO_INTERVAL || p.due_date <= now + Duration::seconds(DUE_TOLERANCE_SECS)
        }
    }
}

fn priority(card: &Card) -> (u8, DateTime<Utc>) {
    match &card.progress {
        None => (0, DateTime::<Utc>::MIN_UTC),
        Some(p) if p.interval < ZERO_INTERVAL => (1, p.due_date),
        Some(p) => (2, p.due_date),
    }
}

/// Grades a card, reschedules it and writes it back to the store.
///
/// The new progress is computed in memory and persisted with a single write.
/// If that write fails the error is returned and the card is not considered
/// reviewed.
pub fn record_outcome<S: CardStore>(
    store: &mut S,
    mut card: Card,
    outcome: Outcome,
    user: &Id,
    now: DateTime<Utc>,
) -> Result<Card> {
    let progress = card
        .progress
        .take()
        .unwrap_or_else(|| CardProgress::new(card.id.clone(), user.clone(), now));
    let progress = next_progress(progress, outcome, now);
    debug!(
        "Card {} graded {}: interval {} days, ease {:.2}",
        card.id, outcome, progress.interval, progress.ease_factor
    );
    card.progress = Some(progress);
    store.update_card(&card, now)?;
    Ok(card)
}

/// Applies one review to a progress record.
pub fn next_progress(mut progress: CardProgress, outcome: Outcome, now: DateTime<Utc>) -> CardProgress {
    let (interval, ease_factor) = transition(progress.interval, progress.ease_factor, outcome);
    progress.interval = interval;
    progress.ease_factor = ease_factor;
    progress.repetitions = match outcome {
        Outcome::Again => 0,
        _ => progress.repetitions + 1,
    };
    progress.last_review_date = now;
    progress.due_date = if interval == 0.0 {
        now
    } else {
        now + Duration::milliseconds((interval * MS_PER_DAY).round() as i64)
    };
    progress
}

/// New (interval, ease factor) for an outcome, intervals already snapped.
fn transition(interval: f64, ease: f64, outcome: Outcome) -> (f64, f64) {
    let (interval, ease) = match outcome {
        Outcome::Again => (0.0, (ease - 0.2).max(MIN_EASE_FACTOR)),
        Outcome::Hard => {
            let next = if interval == 0.0 { 1.0 } else { interval * 1.2 };
            (next, (ease - 0.15).max(MIN_EASE_FACTOR))
        }
        Outcome::Good => {
            let next = if interval == 0.0 {
                1.0
            } else if interval == 1.0 {
                6.0
            } else {
                interval * ease
            };
            (next, ease)
        }
        Outcome::Easy => {
            let next = if interval == 0.0 {
                4.0
            } else if interval == 1.0 {
                15.0
            } else {
                interval * ease * 1.3
            };
            (next, ease + 0.15)
        }
    };
    if interval > 0.0 && interval < 1.0 {
        (1.0, ease)
    } else {
        (interval.min(MAX_INTERVAL_DAYS), ease)
    }
}

/// Interval each outcome would give, in [`Outcome::ALL`] order.
pub fn preview_intervals(progress: Option<&CardProgress>) -> [f64; 4] {
    let (interval, ease) = progress
        .map(|p| (p.interval, p.ease_factor))
        .unwrap_or((0.0, crate::models::INITIAL_EASE_FACTOR));
    Outcome::ALL.map(|outcome| transition(interval, ease, outcome).0)
}

/// Counts the cards of a deck that can be studied right now.
///
/// Scheduled cards that aren't due yet are in none of the counts.
pub fn deck_stats<S: CardStore>(
    store: &S,
    deck_id: &Id,
    user: &Id,
    now: DateTime<Utc>,
) -> Result<DeckStats> {
    let cards = store.cards_by_deck(deck_id, user)?;
    Ok(stats_of(&cards, now))
}

pub fn stats_of(cards: &[Card], now: DateTime<Utc>) -> DeckStats {
    let mut stats = DeckStats::default();
    for card in cards {
        match &card.progress {
            None => stats.new += 1,
            Some(p) if p.interval < ZERO_INTERVAL => stats.new += 1,
            Some(p) if p.due_date <= now => {
                if p.interval < 1.0 {
                    stats.learning += 1;
                } else {
                    stats.review += 1;
                }
            }
            Some(_) => {}
        }
    }
    stats
}

/// Formats an interval in days, e.g. `now`, `3d`, `2w`, `5mo`.
pub fn format_interval(days: f64) -> String {
    let days = days.round() as i64;
    match days {
        0 => "now".to_string(),
        1..7 => format!("{}d", days),
        7..30 => format!("{}w", days / 7),
        30..365 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
