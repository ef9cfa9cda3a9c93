use crate::models::Id;
use thiserror::Error;

/// Failure of a card/deck store, local or remote.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No row with id {0}")]
    Missing(Id),

    #[error("Id {0} is already taken")]
    Duplicate(Id),

    #[error("Corrupt store: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] StoreError),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: Id },

    #[error("Nothing to sync")]
    EmptyPlan,
}

impl Error {
    pub fn deck_not_found(id: &Id) -> Self {
        Error::NotFound {
            what: "Deck",
            id: id.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
