//! Deck synchronization between the local store and a remote.
//!
//! Decks are compared by `updated_at` and the newer side wins the whole deck.
//! There is no field or card level merge: if two devices edit the same deck
//! between syncs, the edits of the one with the older timestamp are lost.

use crate::error::{Error, Result};
use crate::models::{Card, Deck, DeckHeader, Id};
use crate::store::{CardStore, RemoteStore};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::fmt;

/// What a sync pass is going to transfer. Each deck is in at most one list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncPlan {
    /// Local decks the remote has never seen.
    pub to_upload: Vec<DeckHeader>,
    /// Remote decks missing locally.
    pub to_download: Vec<DeckHeader>,
    /// Decks changed locally since the remote copy.
    pub to_update_cloud: Vec<DeckHeader>,
    /// Decks changed remotely since the local copy.
    pub to_update_local: Vec<DeckHeader>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.to_upload.len()
            + self.to_download.len()
            + self.to_update_cloud.len()
            + self.to_update_local.len()
    }
}

impl fmt::Display for SyncPlan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Everything is in sync.");
        }
        let sections = [
            ("Upload", &self.to_upload),
            ("Download", &self.to_download),
            ("Update remote", &self.to_update_cloud),
            ("Update local", &self.to_update_local),
        ];
        for (label, decks) in sections {
            for deck in decks {
                writeln!(f, "  {:<14}{} ({})", label, deck.name, deck.id)?;
            }
        }
        write!(
            f,
            "{} deck{} to sync",
            self.len(),
            if self.len() == 1 { "" } else { "s" }
        )
    }
}

/// Outcome of [`execute_sync`]. A failed deck doesn't stop the others.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub uploaded: Vec<Id>,
    pub downloaded: Vec<Id>,
    pub failed: Vec<(Id, Error)>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (id, err) in &self.failed {
            writeln!(f, "  Deck {} failed: {}", id, err)?;
        }
        write!(
            f,
            "{} uploaded, {} downloaded, {} failed",
            self.uploaded.len(),
            self.downloaded.len(),
            self.failed.len()
        )
    }
}

/// Compares the local decks of `user` with the remote ones.
///
/// Without a user there is nothing to sync and the plan is empty. Equal
/// timestamps mean the deck is in sync; only a strictly newer side is copied.
pub fn plan_sync<L, R>(local: &L, remote: &R, user: Option<&Id>) -> Result<SyncPlan>
where
    L: CardStore,
    R: RemoteStore,
{
    let mut plan = SyncPlan::default();
    let Some(user) = user else {
        return Ok(plan);
    };
    let local_decks: Vec<Deck> = local
        .decks()?
        .into_iter()
        .filter(|d| d.owner.as_ref() == Some(user))
        .collect();
    let remote_decks = remote.list_deck_headers(user)?;

    for deck in &local_decks {
        match remote_decks.iter().find(|r| r.id == deck.id) {
            None => plan.to_upload.push(deck.header()),
            Some(r) if deck.updated_at > r.updated_at => plan.to_update_cloud.push(deck.header()),
            Some(r) if r.updated_at > deck.updated_at => plan.to_update_local.push(r.clone()),
            Some(_) => {}
        }
    }
    for r in remote_decks {
        if !local_decks.iter().any(|d| d.id == r.id) {
            plan.to_download.push(r);
        }
    }
    info!(
        "Sync plan for {}: {} to upload, {} to download, {} to update remotely, {} to update locally",
        user,
        plan.to_upload.len(),
        plan.to_download.len(),
        plan.to_update_cloud.len(),
        plan.to_update_local.len()
    );
    Ok(plan)
}

/// Carries out a plan from [`plan_sync`].
///
/// Every deck is transferred on its own; failures are collected in the
/// report. An empty plan is [`Error::EmptyPlan`].
pub fn execute_sync<L, R>(
    local: &mut L,
    remote: &mut R,
    plan: &SyncPlan,
    user: &Id,
    now: DateTime<Utc>,
) -> Result<SyncReport>
where
    L: CardStore,
    R: RemoteStore,
{
    if plan.is_empty() {
        return Err(Error::EmptyPlan);
    }
    let mut report = SyncReport::default();
    for header in plan.to_upload.iter().chain(&plan.to_update_cloud) {
        match upload_deck(local, remote, &header.id, user, now) {
            Ok(()) => report.uploaded.push(header.id.clone()),
            Err(err) => {
                warn!("Uploading deck {} failed: {}", header.id, err);
                report.failed.push((header.id.clone(), err));
            }
        }
    }
    for header in plan.to_download.iter().chain(&plan.to_update_local) {
        match download_deck(local, remote, &header.id, user, now) {
            Ok(()) => report.downloaded.push(header.id.clone()),
            Err(err) => {
                warn!("Downloading deck {} failed: {}", header.id, err);
                report.failed.push((header.id.clone(), err));
            }
        }
    }
    Ok(report)
}

/// Pushes a local deck: header first, then cards, then progress.
///
/// Every step is an upsert, so running it again after a failure completes a
/// partial upload.
fn upload_deck<L, R>(local: &mut L, remote: &mut R, id: &Id, user: &Id, now: DateTime<Utc>) -> Result<()>
where
    L: CardStore,
    R: RemoteStore,
{
    let deck = local
        .deck(id, user)?
        .ok_or_else(|| Error::deck_not_found(id))?;
    let mut header = deck.header();
    header.owner = Some(user.clone());
    header.last_synced_at = Some(now);
    remote.upsert_deck(&header)?;

    let (cards, progress): (Vec<Card>, Vec<_>) = deck
        .cards
        .into_iter()
        .map(|mut card| {
            let progress = card.progress.take();
            (card, progress)
        })
        .unzip();
    remote.upsert_cards(&cards)?;
    let progress: Vec<_> = progress.into_iter().flatten().collect();
    if !progress.is_empty() {
        remote.upsert_progress(&progress)?;
    }
    local.mark_synced(id, now)?;
    info!(
        "Uploaded deck {} with {} cards ({} reviewed)",
        id,
        cards.len(),
        progress.len()
    );
    Ok(())
}

/// Replaces the local copy of a deck with the remote one.
fn download_deck<L, R>(local: &mut L, remote: &R, id: &Id, user: &Id, now: DateTime<Utc>) -> Result<()>
where
    L: CardStore,
    R: RemoteStore,
{
    let header = remote
        .fetch_deck(id)?
        .ok_or_else(|| Error::deck_not_found(id))?;
    let mut cards = remote.fetch_cards(id)?;
    let card_ids: Vec<Id> = cards.iter().map(|c| c.id.clone()).collect();
    let progress = remote.fetch_progress(&card_ids, user)?;
    for card in &mut cards {
        card.progress = progress.iter().find(|p| p.card_id == card.id).cloned();
    }

    let mut deck = Deck::from(header);
    deck.owner = Some(user.clone());
    deck.last_synced_at = Some(now);
    deck.cards = cards;
    local.replace_deck(&deck, user)?;
    info!(
        "Downloaded deck {} with {} cards ({} reviewed)",
        id,
        deck.cards.len(),
        progress.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardProgress;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap()
    }

    fn user() -> Id {
        Id::new("alice")
    }

    fn deck(id: &str, updated_at: DateTime<Utc>, cards: usize) -> Deck {
        let mut deck = Deck::new(id.to_uppercase(), String::new(), Some(user()), updated_at);
        deck.id = Id::new(id);
        for i in 0..cards {
            let mut card = Card::new(deck.id.clone(), format!("front {}", i), format!("back {}", i));
            card.progress = Some(CardProgress::new(card.id.clone(), user(), updated_at));
            deck.cards.push(card);
        }
        deck
    }

    fn ids(headers: &[DeckHeader]) -> Vec<&str> {
        headers.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn test_plan_classifies_decks() {
        let mut local = MemoryStore::default();
        let mut remote = MemoryStore::default();
        local.add_deck(&deck("d1", t(), 0)).unwrap();
        remote.add_deck(&deck("d1", t() - Duration::hours(1), 0)).unwrap();
        local.add_deck(&deck("d2", t(), 0)).unwrap();
        remote.add_deck(&deck("d3", t(), 0)).unwrap();
        local.add_deck(&deck("d4", t(), 0)).unwrap();
        remote.add_deck(&deck("d4", t(), 0)).unwrap();
        local.add_deck(&deck("d5", t() - Duration::seconds(1), 0)).unwrap();
        remote.add_deck(&deck("d5", t(), 0)).unwrap();

        let plan = plan_sync(&local, &remote, Some(&user())).unwrap();

        assert_eq!(ids(&plan.to_update_cloud), vec!["d1"]);
        assert_eq!(ids(&plan.to_upload), vec!["d2"]);
        assert_eq!(ids(&plan.to_download), vec!["d3"]);
        assert_eq!(ids(&plan.to_update_local), vec!["d5"]);
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn test_plan_without_user_is_empty() {
        let mut local = MemoryStore::default();
        let remote = MemoryStore::default();
        local.add_deck(&deck("d1", t(), 0)).unwrap();

        let plan = plan_sync(&local, &remote, None).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_ignores_decks_of_other_users() {
        let mut local = MemoryStore::default();
        let remote = MemoryStore::default();
        let mut other = deck("d1", t(), 0);
        other.owner = Some(Id::new("bob"));
        local.add_deck(&other).unwrap();
        let mut anonymous = deck("d2", t(), 0);
        anonymous.owner = None;
        local.add_deck(&anonymous).unwrap();

        let plan = plan_sync(&local, &remote, Some(&user())).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_ids_differing_in_case_match() {
        let mut local = MemoryStore::default();
        let mut remote = MemoryStore::default();
        local.add_deck(&deck("deck-a", t(), 0)).unwrap();
        remote.add_deck(&deck("DECK-A", t(), 0)).unwrap();

        let plan = plan_sync(&local, &remote, Some(&user())).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_execute_then_plan_again_is_empty() {
        let mut local = MemoryStore::default();
        let mut remote = MemoryStore::default();
        local.add_deck(&deck("up", t(), 2)).unwrap();
        remote.add_deck(&deck("down", t(), 3)).unwrap();

        let plan = plan_sync(&local, &remote, Some(&user())).unwrap();
        let report = execute_sync(&mut local, &mut remote, &plan, &user(), t()).unwrap();
        assert!(report.is_success());
        assert_eq!(report.uploaded, vec![Id::new("up")]);
        assert_eq!(report.downloaded, vec![Id::new("down")]);

        let again = plan_sync(&local, &remote, Some(&user())).unwrap();
        assert!(again.is_empty());
        assert!(matches!(
            execute_sync(&mut local, &mut remote, &again, &user(), t()),
            Err(Error::EmptyPlan)
        ));
    }

    #[test]
    fn test_upload_transfers_cards_and_progress() {
        let mut local = MemoryStore::default();
        let mut remote = MemoryStore::default();
        let original = deck("up", t(), 2);
        local.add_deck(&original).unwrap();

        let plan = plan_sync(&local, &remote, Some(&user())).unwrap();
        execute_sync(&mut local, &mut remote, &plan, &user(), t()).unwrap();

        let header = remote.fetch_deck(&Id::new("up")).unwrap().unwrap();
        assert_eq!(header.updated_at, t());
        assert_eq!(header.last_synced_at, Some(t()));
        let cards = remote.fetch_cards(&Id::new("up")).unwrap();
        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| c.progress.is_none()));
        let card_ids: Vec<Id> = cards.iter().map(|c| c.id.clone()).collect();
        assert_eq!(remote.fetch_progress(&card_ids, &user()).unwrap().len(), 2);
        let synced = local.deck(&Id::new("up"), &user()).unwrap().unwrap();
        assert_eq!(synced.last_synced_at, Some(t()));
        assert_eq!(synced.updated_at, t());
    }

    #[test]
    fn test_download_replaces_local_deck() {
        let mut local = MemoryStore::default();
        let mut remote = MemoryStore::default();
        local.add_deck(&deck("d", t() - Duration::days(1), 4)).unwrap();
        let mut newer = deck("d", t(), 1);
        // Progress of another user must stay remote
        let card_id = newer.cards[0].id.clone();
        newer.cards[0].progress = None;
        remote.add_deck(&newer).unwrap();
        remote
            .upsert_progress(&[CardProgress::new(card_id.clone(), Id::new("bob"), t())])
            .unwrap();

        let plan = plan_sync(&local, &remote, Some(&user())).unwrap();
        assert_eq!(ids(&plan.to_update_local), vec!["d"]);
        execute_sync(&mut local, &mut remote, &plan, &user(), t()).unwrap();

        let replaced = local.deck(&Id::new("d"), &user()).unwrap().unwrap();
        assert_eq!(replaced.updated_at, t());
        assert_eq!(replaced.owner, Some(user()));
        assert_eq!(replaced.cards.len(), 1);
        assert_eq!(replaced.cards[0].id, card_id);
        assert!(replaced.cards[0].progress.is_none());
    }

    #[test]
    fn test_download_keeps_progress_recorded_before_login() {
        let local_user = Id::new("local");
        let mut local = MemoryStore::default();
        let mut remote = MemoryStore::default();
        let mut old = deck("d", t() - Duration::days(1), 2);
        for card in &mut old.cards {
            card.progress = Some(CardProgress::new(card.id.clone(), local_user.clone(), t()));
        }
        local.add_deck(&old).unwrap();
        // The remote version still has the first card but dropped the second
        let mut newer = deck("d", t(), 0);
        let mut kept = old.cards[0].clone();
        kept.progress = None;
        newer.cards.push(kept);
        remote.add_deck(&newer).unwrap();

        let plan = plan_sync(&local, &remote, Some(&user())).unwrap();
        execute_sync(&mut local, &mut remote, &plan, &user(), t()).unwrap();

        let anonymous = local.deck(&Id::new("d"), &local_user).unwrap().unwrap();
        assert_eq!(anonymous.cards.len(), 1);
        assert_eq!(anonymous.cards[0].id, old.cards[0].id);
        assert!(anonymous.cards[0].progress.is_some());
    }

    #[test]
    fn test_failed_deck_does_not_stop_the_pass() {
        let mut local = MemoryStore::default();
        let mut remote = MemoryStore::default();
        local.add_deck(&deck("up", t(), 1)).unwrap();
        remote.add_deck(&deck("down", t(), 1)).unwrap();
        remote.fail_progress = true;

        let plan = plan_sync(&local, &remote, Some(&user())).unwrap();
        let report = execute_sync(&mut local, &mut remote, &plan, &user(), t()).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, Id::new("up"));
        assert!(matches!(report.failed[0].1, Error::StorageFailure(_)));
        assert_eq!(report.downloaded, vec![Id::new("down")]);
        // Not marked as synced, so the next pass uploads it again
        let up = local.deck(&Id::new("up"), &user()).unwrap().unwrap();
        assert_eq!(up.last_synced_at, None);
    }

    #[test]
    fn test_local_edit_after_sync_is_planned_for_upload() {
        let mut local = MemoryStore::default();
        let mut remote = MemoryStore::default();
        local.add_deck(&deck("d", t(), 1)).unwrap();
        let plan = plan_sync(&local, &remote, Some(&user())).unwrap();
        execute_sync(&mut local, &mut remote, &plan, &user(), t()).unwrap();

        local.set_updated_at(&Id::new("d"), t() + Duration::minutes(5));

        let plan = plan_sync(&local, &remote, Some(&user())).unwrap();
        assert_eq!(ids(&plan.to_update_cloud), vec!["d"]);
        assert!(plan.to_string().contains("Update remote"));
    }
}
