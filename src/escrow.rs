//! The state container. `Escrow` owns the in-memory `AppState` and the store it is persisted to,
//! and exposes the only operations that change it.
//!
//! Every operation computes a complete new `AppState`, writes it to the store, and only then
//! replaces the in-memory copy. A failed validation or write leaves the container unchanged.

use crate::clock::Clock;
use crate::error::{ErrorType, IntoResult};
use crate::model::{next_release_after, Amount, AppState, Card, RentConfig, Transaction};
use crate::store::{load_state, save_state, BlobStore};
use crate::{utils, Result};
use anyhow::{bail, Context};
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info};

/// How a new state is populated by `Escrow::create`.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Seed {
    /// The demo wallet with some history.
    #[default]
    Demo,
    /// A zero balance with no history.
    Empty,
}

pub struct Escrow {
    state: AppState,
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
}

impl Escrow {
    /// Loads the saved state. Fails if nothing has been saved yet.
    pub async fn open(store: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let Some(state) = load_state(store.as_ref()).await? else {
            bail!("No saved state was found, run 'rentpacer init' first");
        };
        Ok(Self {
            state,
            store,
            clock,
        })
    }

    /// Creates and saves a fresh state. Fails if a state already exists so that an existing
    /// wallet is never overwritten.
    pub async fn create(
        store: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        seed: Seed,
    ) -> Result<Self> {
        if load_state(store.as_ref()).await?.is_some() {
            bail!("A saved state already exists");
        }
        let now = clock.now_utc();
        let state = match seed {
            Seed::Demo => AppState::seed(now),
            Seed::Empty => AppState::empty(now),
        };
        save_state(store.as_ref(), &state).await?;
        Ok(Self {
            state,
            store,
            clock,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Re-reads the state from the store, picking up writes made by other processes.
    pub async fn reload(&mut self) -> Result<()> {
        if let Some(state) = load_state(self.store.as_ref()).await? {
            self.state = state;
        }
        Ok(())
    }

    async fn commit(&mut self, next: AppState) -> Result<()> {
        save_state(self.store.as_ref(), &next)
            .await
            .pub_result(ErrorType::Storage)?;
        self.state = next;
        Ok(())
    }

    fn last_transaction(&self) -> Result<&Transaction> {
        self.state
            .transactions
            .last()
            .context("The ledger is unexpectedly empty")
    }

    /// Adds funds to the wallet and records a DEPOSIT.
    pub async fn apply_deposit(
        &mut self,
        amount: Amount,
        description: Option<&str>,
        card_id: Option<&str>,
    ) -> Result<&Transaction> {
        let now = self.clock.now_utc();
        let next = self
            .state
            .deposit(amount, description, card_id, now)
            .pub_result(ErrorType::Validation)?;
        self.commit(next).await?;
        let tx = self.last_transaction()?;
        info!("Deposited {} ({})", tx.amount(), tx.method().unwrap_or_default());
        Ok(tx)
    }

    /// Releases one weekly amount to the payee and records a RELEASE. The schedule advances one
    /// week from its previous due date.
    pub async fn apply_release(&mut self) -> Result<&Transaction> {
        let now = self.clock.now_utc();
        let next = self.state.release(now).pub_result(ErrorType::Validation)?;
        self.commit(next).await?;
        let tx = self.last_transaction()?;
        info!(
            "Released {} to {}, next release {}",
            tx.amount(),
            self.state.config.payee_name,
            self.state.config.next_release_date
        );
        Ok(tx)
    }

    /// Replaces the release configuration. The next release date in `config` is ignored and
    /// recomputed from today to the next occurrence of the configured release day, which resets
    /// any existing cadence.
    pub async fn save_config(&mut self, mut config: RentConfig) -> Result<&RentConfig> {
        config.next_release_date = next_release_after(self.clock.now(), config.release_day)
            .pub_result(ErrorType::Validation)?;
        let next = self
            .state
            .with_config(config)
            .pub_result(ErrorType::Validation)?;
        self.commit(next).await?;
        debug!("Saved config {:?}", self.state.config);
        Ok(&self.state.config)
    }

    /// Moves the due date forward in whole weeks until it is in the future, without releasing
    /// anything. The cadence anchor is preserved.
    pub async fn skip_missed_releases(&mut self) -> Result<&RentConfig> {
        let now = self.clock.now_utc();
        let mut config = self.state.config.clone();
        while config.next_release_date <= now {
            config.next_release_date += Duration::weeks(1);
        }
        let next = self.state.with_config(config)?;
        self.commit(next).await?;
        Ok(&self.state.config)
    }

    /// Sets the schedule to paused, leaving everything else as it is.
    pub async fn pause(&mut self) -> Result<&RentConfig> {
        let mut config = self.state.config.clone();
        config.active = false;
        let next = self.state.with_config(config)?;
        self.commit(next).await?;
        Ok(&self.state.config)
    }

    /// Simulates card processing for `delay` and then links the card. The number is never
    /// validated and the CVC is not kept.
    pub async fn link_card(
        &mut self,
        number: &str,
        expiry: &str,
        delay: std::time::Duration,
    ) -> Result<&Card> {
        if !delay.is_zero() {
            debug!("Simulating card processing for {delay:?}");
            tokio::time::sleep(delay).await;
        }
        let card = Card::from_input(utils::generate_id(), number, expiry);
        let next = self.state.with_card(card);
        self.commit(next).await?;
        self.state
            .linked_cards
            .last()
            .context("The card list is unexpectedly empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{ReleaseDay, TransactionType};
    use crate::store::MemoryStore;
    use chrono::{DateTime, Weekday};

    /// A Wednesday afternoon in UTC.
    fn start() -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339("2026-10-14T15:00:00Z").unwrap()
    }

    async fn escrow(seed: Seed) -> (Escrow, MemoryStore, ManualClock) {
        let store = MemoryStore::default();
        let clock = ManualClock::new(start());
        let escrow = Escrow::create(Arc::new(store.clone()), Arc::new(clock.clone()), seed)
            .await
            .unwrap();
        (escrow, store, clock)
    }

    #[tokio::test]
    async fn test_open_without_state_fails() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::default());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(start()));
        assert!(Escrow::open(store, clock).await.is_err());
    }

    #[tokio::test]
    async fn test_create_refuses_to_overwrite() {
        let (_escrow, store, clock) = escrow(Seed::Demo).await;
        let again = Escrow::create(Arc::new(store), Arc::new(clock), Seed::Empty).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_deposit_is_persisted() {
        let (mut escrow, store, clock) = escrow(Seed::Empty).await;
        escrow
            .apply_deposit(Amount::dollars(600), None, None)
            .await
            .unwrap();
        let reopened = Escrow::open(Arc::new(store), Arc::new(clock)).await.unwrap();
        assert_eq!(reopened.state().balance, Amount::dollars(600));
        assert_eq!(reopened.state().transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_deposit_changes_nothing() {
        let (mut escrow, store, clock) = escrow(Seed::Empty).await;
        let before = escrow.state().clone();
        assert!(escrow.apply_deposit(Amount::ZERO, None, None).await.is_err());
        assert_eq!(escrow.state(), &before);
        let reopened = Escrow::open(Arc::new(store), Arc::new(clock)).await.unwrap();
        assert_eq!(reopened.state(), &before);
    }

    /// Reads from `inner` and refuses every write.
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl BlobStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn put(&self, _key: &str, _value: &str) -> Result<()> {
            bail!("disk is read-only")
        }
    }

    #[tokio::test]
    async fn test_errors_are_labelled_where_they_arise() {
        let (mut writable, store, clock) = escrow(Seed::Demo).await;
        let invalid = writable.apply_deposit(Amount::ZERO, None, None).await;
        assert_eq!(invalid.unwrap_err().to_string(), "validation error");

        let read_only = Arc::new(ReadOnlyStore { inner: store });
        let mut read_only = Escrow::open(read_only, Arc::new(clock)).await.unwrap();
        let before = read_only.state().clone();
        let err = read_only
            .apply_deposit(Amount::dollars(50), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "storage error");
        assert_eq!(err.root_cause().to_string(), "disk is read-only");
        assert_eq!(read_only.state(), &before);
    }

    #[tokio::test]
    async fn test_save_config_on_todays_weekday_is_a_week_out() {
        let (mut escrow, _store, _clock) = escrow(Seed::Demo).await;
        let mut config = escrow.state().config.clone();
        config.release_day = ReleaseDay::from(Weekday::Wed);
        config.payee_name = "Sam".to_string();
        let saved = escrow.save_config(config).await.unwrap();
        assert_eq!(
            saved.next_release_date,
            DateTime::parse_from_rfc3339("2026-10-21T09:00:00Z").unwrap()
        );
        assert_eq!(saved.payee_name, "Sam");
    }

    #[tokio::test]
    async fn test_save_config_resets_cadence() {
        let (mut escrow, _store, clock) = escrow(Seed::Demo).await;
        clock.advance(Duration::days(3));
        escrow.apply_release().await.unwrap();
        let config = escrow.state().config.clone();
        // The anchor is now Thursday 15:00. Saving on a Saturday moves it to Friday 09:00.
        let saved = escrow.save_config(config).await.unwrap();
        assert_eq!(
            saved.next_release_date,
            DateTime::parse_from_rfc3339("2026-10-23T09:00:00Z").unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let (mut escrow, _store, _clock) = escrow(Seed::Demo).await;
        let before = escrow.state().config.clone();
        let mut config = before.clone();
        config.payee_name = String::new();
        assert!(escrow.save_config(config).await.is_err());
        assert_eq!(escrow.state().config, before);
    }

    #[tokio::test]
    async fn test_skip_missed_releases_keeps_anchor() {
        let (mut escrow, _store, clock) = escrow(Seed::Empty).await;
        let due = escrow.state().config.next_release_date;
        clock.advance(Duration::days(20));
        let config = escrow.skip_missed_releases().await.unwrap();
        assert_eq!(config.next_release_date, due + Duration::weeks(3));
        assert!(escrow.state().transactions.is_empty());
    }

    #[tokio::test]
    async fn test_pause() {
        let (mut escrow, _store, _clock) = escrow(Seed::Demo).await;
        assert!(!escrow.pause().await.unwrap().active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_card_after_delay() {
        let (mut escrow, _store, _clock) = escrow(Seed::Empty).await;
        let before = tokio::time::Instant::now();
        let card = escrow
            .link_card("4242424242424242", "12/25", std::time::Duration::from_millis(1500))
            .await
            .unwrap()
            .clone();
        assert!(before.elapsed() >= std::time::Duration::from_millis(1500));
        assert_eq!(card.last4(), "4242");
        let tx = escrow
            .apply_deposit(Amount::dollars(20), None, Some(card.id()))
            .await
            .unwrap();
        assert_eq!(tx.kind(), TransactionType::Deposit);
        assert_eq!(tx.method(), Some("Visa •••• 4242"));
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_writes() {
        let (mut escrow, store, clock) = escrow(Seed::Empty).await;
        let mut other = Escrow::open(Arc::new(store), Arc::new(clock)).await.unwrap();
        other
            .apply_deposit(Amount::dollars(10), None, None)
            .await
            .unwrap();
        assert_eq!(escrow.state().balance, Amount::ZERO);
        escrow.reload().await.unwrap();
        assert_eq!(escrow.state().balance, Amount::dollars(10));
    }
}
