use crate::app::App;
use crate::models::{Card, DeckStats};
use crate::scheduler::stats_of;
use crate::store::CardStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Default)]
struct Counts {
    unseen: u64,
    day: u64,
    week: u64,
    month: u64,
    quarter: u64,
    year: u64,
    more: u64,
}

impl Counts {
    fn increment_count(&mut self, days: i64) {
        match days {
            0 => self.unseen += 1,
            1 => self.day += 1,
            2..7 => self.week += 1,
            7..30 => self.month += 1,
            30..90 => self.quarter += 1,
            90..365 => self.year += 1,
            _ => self.more += 1,
        }
    }

    fn total(&self) -> u64 {
        self.unseen + self.day + self.week + self.month + self.quarter + self.year + self.more
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            concat!(
                "Review intervals:\n",
                "  new/lapsed {}\n",
                "  =day       {}\n",
                "  <week      {}\n",
                "  <month     {}\n",
                "  <quarter   {}\n",
                "  <year      {}\n",
                "  >=year     {}\n\n",
                "Total: {}"
            ),
            self.unseen,
            self.day,
            self.week,
            self.month,
            self.quarter,
            self.year,
            self.more,
            self.total(),
        )
    }
}

struct Report {
    due: DeckStats,
    intervals: Counts,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            concat!(
                "Due now:\n",
                "  new        {}\n",
                "  learning   {}\n",
                "  review     {}\n\n",
                "{}"
            ),
            self.due.new, self.due.learning, self.due.review, self.intervals,
        )
    }
}

fn report(cards: &[Card], now: DateTime<Utc>) -> Report {
    let mut intervals = Counts::default();
    for card in cards {
        let days = card.progress.as_ref().map_or(0.0, |p| p.interval);
        intervals.increment_count(days.round() as i64);
    }
    Report {
        due: stats_of(cards, now),
        intervals,
    }
}

pub fn stats(app: &App, deck_key: &str) -> Result<()> {
    let deck = app.find_deck(deck_key)?;
    let cards = app.store.cards_by_deck(&deck.id, &app.user)?;
    println!("{}\n\n{}", deck.name, report(&cards, Utc::now()));
    Ok(())
}

#[test]
fn test_report() {
    use crate::models::{CardProgress, Id};
    use chrono::Duration;

    let now = Utc::now();
    let deck_id = Id::generate();
    let mut cards = Vec::new();
    for (interval, due_in) in [(0.0, 0), (1.0, -1), (3.0, 2), (45.0, -3), (400.0, 10)] {
        let mut card = Card::new(deck_id.clone(), "f".into(), "b".into());
        let mut progress = CardProgress::new(card.id.clone(), Id::new("u"), now);
        progress.interval = interval;
        progress.due_date = now + Duration::days(due_in);
        card.progress = Some(progress);
        cards.push(card);
    }
    cards.push(Card::new(deck_id, "f".into(), "b".into()));

    let report = report(&cards, now);
    assert_eq!(report.due, DeckStats { new: 2, learning: 0, review: 2 });
    assert_eq!(
        report.to_string(),
        concat!(
            "Due now:\n",
            "  new        2\n",
            "  learning   0\n",
            "  review     2\n\n",
            "Review intervals:\n",
            "  new/lapsed 2\n",
            "  =day       1\n",
            "  <week      1\n",
            "  <month     0\n",
            "  <quarter   1\n",
            "  <year      0\n",
            "  >=year     1\n\n",
            "Total: 6"
        )
    );
}
