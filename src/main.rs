use anyhow::Result;
use clap::{Parser, Subcommand};
use flips::add::add;
use flips::app::App;
use flips::cloud::sync;
use flips::config::Config;
use flips::decks::{delete, list};
use flips::init::init;
use flips::models::Id;
use flips::review::review;
use flips::stats::stats;
use std::path::PathBuf;

#[derive(Subcommand)]
enum Command {
    /// Create a new deck and add cards to it
    Init {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Add cards to a deck
    Add { deck: String },
    /// Review the due cards of a deck
    Review { deck: String },
    /// Show what is due in a deck
    Stats { deck: String },
    /// List all decks
    Decks,
    /// Delete a deck with all its cards
    Delete { deck: String },
    /// Sync decks with the remote store
    Sync {
        /// Only show what would be transferred
        #[arg(long)]
        dry_run: bool,
    },
}

/// Spaced-repetition flashcards with deck sync.
#[derive(Parser)]
#[command(name = "flips", version)]
struct Cli {
    /// Config file (default: <config dir>/flips/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory of the local card store
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Directory of the remote card store
    #[arg(long, global = true)]
    remote: Option<PathBuf>,
    /// Account to sync as
    #[arg(long, global = true)]
    user: Option<String>,
    /// What to do
    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Cli::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(data) = args.data {
        config.data_dir = data;
    }
    if let Some(remote) = args.remote {
        config.remote_dir = Some(remote);
    }
    if let Some(user) = args.user {
        config.user = Some(Id::new(&user));
    }
    let mut app = App::new(config)?;

    match args.command {
        Command::Init { name, description } => init(&mut app, &name, &description),
        Command::Add { deck } => add(&mut app, &deck),
        Command::Review { deck } => review(&mut app, &deck),
        Command::Stats { deck } => stats(&app, &deck),
        Command::Decks => list(&app),
        Command::Delete { deck } => delete(&mut app, &deck),
        Command::Sync { dry_run } => sync(&mut app, dry_run),
    }
}
