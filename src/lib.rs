pub mod add;
pub mod app;
pub mod cloud;
pub mod config;
pub mod decks;
pub mod error;
pub mod init;
pub mod models;
pub mod review;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod sync;
mod utils;

pub use error::{Error, Result, StoreError};
