use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use struct_field_names_as_array::FieldNamesAsArray;
use uuid::Uuid;

/// Ease factor every card starts with.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Ease factor never drops below this.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Opaque identifier. Producers don't agree on case, so ids are normalized
/// once when they are created or read and compared with plain equality after.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub struct Id(String);

impl Id {
    pub fn new(raw: &str) -> Self {
        Id(raw.trim().to_ascii_lowercase())
    }

    pub fn generate() -> Self {
        Id(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Id {
    fn from(raw: String) -> Self {
        Id::new(&raw)
    }
}

impl From<&str> for Id {
    fn from(raw: &str) -> Self {
        Id::new(raw)
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, FieldNamesAsArray)]
pub struct Card {
    pub id: Id,
    pub deck_id: Id,
    pub front: String,
    pub back: String,
    pub front_image: Option<String>,
    pub front_audio: Option<String>,
    pub back_image: Option<String>,
    pub back_audio: Option<String>,
    /// Free-text answer used for grading typed responses.
    pub answer: Option<String>,
    /// Review progress of the current user, stored in its own table.
    #[serde(skip)]
    #[field_names_as_array(skip)]
    pub progress: Option<CardProgress>,
}

impl Card {
    pub fn new(deck_id: Id, front: String, back: String) -> Self {
        Self {
            id: Id::generate(),
            deck_id,
            front,
            back,
            front_image: None,
            front_audio: None,
            back_image: None,
            back_audio: None,
            answer: None,
            progress: None,
        }
    }
}

/// Spaced repetition state of one card for one user.
///
/// An `interval` of zero means the card is new or was forgotten. Non-zero
/// intervals are whole days or more, never a fraction below one.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, FieldNamesAsArray)]
pub struct CardProgress {
    pub card_id: Id,
    pub user_id: Id,
    pub due_date: DateTime<Utc>,
    pub interval: f64,
    pub ease_factor: f64,
    pub repetitions: u32,
    pub last_review_date: DateTime<Utc>,
}

impl CardProgress {
    pub fn new(card_id: Id, user_id: Id, now: DateTime<Utc>) -> Self {
        Self {
            card_id,
            user_id,
            due_date: now,
            interval: 0.0,
            ease_factor: INITIAL_EASE_FACTOR,
            repetitions: 0,
            last_review_date: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, FieldNamesAsArray)]
pub struct Deck {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub owner: Option<Id>,
    /// Last content change. Sync compares this between local and remote.
    pub updated_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    #[field_names_as_array(skip)]
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn new(name: String, description: String, owner: Option<Id>, now: DateTime<Utc>) -> Self {
        Self {
            id: Id::generate(),
            name,
            description,
            owner,
            updated_at: now,
            last_synced_at: None,
            cards: Vec::new(),
        }
    }

    pub fn header(&self) -> DeckHeader {
        DeckHeader {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            owner: self.owner.clone(),
            updated_at: self.updated_at,
            last_synced_at: self.last_synced_at,
        }
    }
}

/// A deck without its cards. This is all sync needs to classify a deck.
#[derive(Clone, Debug, PartialEq)]
pub struct DeckHeader {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub owner: Option<Id>,
    pub updated_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl From<DeckHeader> for Deck {
    fn from(header: DeckHeader) -> Self {
        Self {
            id: header.id,
            name: header.name,
            description: header.description,
            owner: header.owner,
            updated_at: header.updated_at,
            last_synced_at: header.last_synced_at,
            cards: Vec::new(),
        }
    }
}

/// Self-reported recall of a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Again,
    Hard,
    Good,
    Easy,
}

impl Outcome {
    pub const ALL: [Outcome; 4] = [Outcome::Again, Outcome::Hard, Outcome::Good, Outcome::Easy];
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "again" => Ok(Outcome::Again),
            "2" | "hard" => Ok(Outcome::Hard),
            "3" | "good" => Ok(Outcome::Good),
            "4" | "easy" => Ok(Outcome::Easy),
            other => Err(format!(
                "Unknown answer {:?}, expected 1-4 or again/hard/good/easy",
                other
            )),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Outcome::Again => "again",
            Outcome::Hard => "hard",
            Outcome::Good => "good",
            Outcome::Easy => "easy",
        };
        f.write_str(name)
    }
}

/// What is actionable in a deck right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeckStats {
    pub new: usize,
    pub learning: usize,
    pub review: usize,
}

/// A deck together with its live counts, for listings.
#[derive(Clone, Debug)]
pub struct DeckSummary {
    pub deck: DeckHeader,
    pub cards: usize,
    pub stats: DeckStats,
}
