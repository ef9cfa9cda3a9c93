use crate::app::App;
use crate::store::DirStore;
use crate::sync::{execute_sync, plan_sync};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;

/// Syncs the local decks of the configured account with the remote store.
pub fn sync(app: &mut App, dry_run: bool) -> Result<()> {
    let remote_dir = app.remote_dir.clone().ok_or_else(|| {
        anyhow!("No remote configured. Set remote_dir in the config file or pass --remote.")
    })?;
    let Some(account) = app.account.clone() else {
        println!("No user configured, nothing to sync.");
        return Ok(());
    };
    let mut remote = DirStore::open(&remote_dir)
        .with_context(|| format!("failed to open remote store {:?}", remote_dir))?;

    let plan = plan_sync(&app.store, &remote, Some(&account))?;
    println!("{}", plan);
    if dry_run || plan.is_empty() {
        return Ok(());
    }

    let report = execute_sync(&mut app.store, &mut remote, &plan, &account, Utc::now())?;
    println!("{}", report);
    if !report.is_success() {
        return Err(anyhow!(
            "{} of {} decks failed to sync",
            report.failed.len(),
            plan.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Card, Deck, Id};
    use crate::store::{CardStore, RemoteStore};

    fn app(data: &std::path::Path, remote: &std::path::Path, user: &str) -> App {
        App::new(Config {
            data_dir: data.to_path_buf(),
            remote_dir: Some(remote.to_path_buf()),
            user: Some(Id::new(user)),
        })
        .unwrap()
    }

    #[test]
    fn test_sync_between_two_devices() {
        let laptop_dir = tempfile::tempdir().unwrap();
        let phone_dir = tempfile::tempdir().unwrap();
        let remote_dir = tempfile::tempdir().unwrap();
        let mut laptop = app(laptop_dir.path(), remote_dir.path(), "alice");
        let mut phone = app(phone_dir.path(), remote_dir.path(), "Alice");

        let deck = Deck::new("Verbs".into(), String::new(), laptop.account.clone(), Utc::now());
        laptop.store.add_deck(&deck).unwrap();
        laptop
            .store
            .add_card(&Card::new(deck.id.clone(), "gehen".into(), "to go".into()), Utc::now())
            .unwrap();

        sync(&mut laptop, false).unwrap();
        sync(&mut phone, false).unwrap();

        let copy = phone.store.deck(&deck.id, &phone.user).unwrap().unwrap();
        assert_eq!(copy.cards.len(), 1);
        assert_eq!(copy.cards[0].front, "gehen");

        let remote = DirStore::open(remote_dir.path()).unwrap();
        assert_eq!(remote.list_deck_headers(&Id::new("alice")).unwrap().len(), 1);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let data_dir = tempfile::tempdir().unwrap();
        let remote_dir = tempfile::tempdir().unwrap();
        let mut app = app(data_dir.path(), remote_dir.path(), "alice");
        let deck = Deck::new("Verbs".into(), String::new(), app.account.clone(), Utc::now());
        app.store.add_deck(&deck).unwrap();

        sync(&mut app, true).unwrap();

        let remote = DirStore::open(remote_dir.path()).unwrap();
        assert!(remote.list_deck_headers(&Id::new("alice")).unwrap().is_empty());
    }

    #[test]
    fn test_sync_needs_a_remote() {
        let data_dir = tempfile::tempdir().unwrap();
        let mut app = App::new(Config {
            data_dir: data_dir.path().to_path_buf(),
            remote_dir: None,
            user: Some(Id::new("alice")),
        })
        .unwrap();
        assert!(sync(&mut app, false).is_err());
    }
}
