//! The weekly release scheduler.
//!
//! A tick compares the clock to the configured next release date. When the release is due and
//! the balance covers it, one weekly amount is released. When it is due and the balance falls
//! short, the `BacklogPolicy` decides what happens. `run` repeats the tick on an interval.

use crate::escrow::Escrow;
use crate::model::{Amount, AppState};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What a due tick does when the balance does not cover the weekly amount.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacklogPolicy {
    /// Do nothing and try again on the next tick. The due date stays where it is.
    #[default]
    Retry,
    /// Move the due date forward in whole weeks until it is in the future.
    Skip,
    /// Pause the schedule.
    Pause,
}

serde_plain::derive_display_from_serialize!(BacklogPolicy);
serde_plain::derive_fromstr_from_deserialize!(BacklogPolicy);

/// The result of one scheduler tick.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// The schedule is paused.
    Inactive,
    /// The next release is still in the future.
    NotDue { next_release_date: DateTime<Utc> },
    /// A release was made.
    Released {
        transaction_id: String,
        amount: Amount,
        next_release_date: DateTime<Utc>,
    },
    /// The release was due but the balance could not cover it.
    InsufficientFunds {
        balance: Amount,
        needed: Amount,
        policy: BacklogPolicy,
        next_release_date: DateTime<Utc>,
        active: bool,
    },
}

impl TickOutcome {
    pub fn message(&self) -> String {
        match self {
            TickOutcome::Inactive => "Auto-release is paused".to_string(),
            TickOutcome::NotDue { next_release_date } => {
                format!("Nothing due, next release {next_release_date}")
            }
            TickOutcome::Released {
                amount,
                next_release_date,
                ..
            } => format!("Released {amount}, next release {next_release_date}"),
            TickOutcome::InsufficientFunds {
                balance,
                needed,
                policy,
                ..
            } => format!(
                "Release due but the balance {balance} does not cover {needed} (policy: {policy})"
            ),
        }
    }
}

/// What a tick would do given a state and a time. Computing this does not change anything.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Decision {
    Inactive,
    NotDue,
    Release,
    Backlog,
}

/// Evaluates and applies scheduled releases.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseScheduler {
    policy: BacklogPolicy,
}

/// Totals from a `ReleaseScheduler::run` loop.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub releases: u64,
    pub failures: u64,
}

impl ReleaseScheduler {
    pub fn new(policy: BacklogPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> BacklogPolicy {
        self.policy
    }

    pub fn decide(&self, state: &AppState, now: DateTime<Utc>) -> Decision {
        let config = &state.config;
        if !config.active {
            Decision::Inactive
        } else if now < config.next_release_date {
            Decision::NotDue
        } else if state.balance >= config.weekly_amount {
            Decision::Release
        } else {
            Decision::Backlog
        }
    }

    /// Runs one check against the escrow's clock and applies its result.
    pub async fn tick(&self, escrow: &mut Escrow) -> Result<TickOutcome> {
        let now = escrow.clock().now_utc();
        let decision = self.decide(escrow.state(), now);
        debug!("Tick at {now}: {decision:?}");
        let outcome = match decision {
            Decision::Inactive => TickOutcome::Inactive,
            Decision::NotDue => TickOutcome::NotDue {
                next_release_date: escrow.state().config.next_release_date,
            },
            Decision::Release => {
                let tx = escrow.apply_release().await?;
                let (transaction_id, amount) = (tx.id().to_string(), tx.amount());
                TickOutcome::Released {
                    transaction_id,
                    amount,
                    next_release_date: escrow.state().config.next_release_date,
                }
            }
            Decision::Backlog => self.backlog(escrow).await?,
        };
        Ok(outcome)
    }

    async fn backlog(&self, escrow: &mut Escrow) -> Result<TickOutcome> {
        let balance = escrow.state().balance;
        let needed = escrow.state().config.weekly_amount;
        warn!(
            "Release of {needed} to {} is due but the balance is {balance}",
            escrow.state().config.payee_name
        );
        match self.policy {
            BacklogPolicy::Retry => {}
            BacklogPolicy::Skip => {
                let config = escrow.skip_missed_releases().await?;
                info!("Skipped missed releases, next release {}", config.next_release_date);
            }
            BacklogPolicy::Pause => {
                escrow.pause().await?;
                info!("Paused auto-release");
            }
        }
        let config = &escrow.state().config;
        Ok(TickOutcome::InsufficientFunds {
            balance,
            needed,
            policy: self.policy,
            next_release_date: config.next_release_date,
            active: config.active,
        })
    }

    /// Ticks immediately and then every `every` until `shutdown` completes. The state is
    /// re-read from the store before each tick so that changes made by other commands are seen.
    /// A failed tick is logged and the loop continues.
    pub async fn run<F>(&self, escrow: &mut Escrow, every: Duration, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let mut summary = RunSummary::default();
        let mut interval = tokio::time::interval(every);
        tokio::pin!(shutdown);
        info!("Scheduler started, checking every {every:?}");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    summary.ticks += 1;
                    let result = match escrow.reload().await {
                        Ok(()) => self.tick(escrow).await,
                        Err(e) => Err(e),
                    };
                    match result {
                        Ok(TickOutcome::Released { .. }) => summary.releases += 1,
                        Ok(outcome) => debug!("{}", outcome.message()),
                        Err(e) => {
                            summary.failures += 1;
                            error!("Scheduler tick failed: {e:#}");
                        }
                    }
                }
            }
        }
        info!(
            "Scheduler stopped after {} ticks and {} releases",
            summary.ticks, summary.releases
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::escrow::Seed;
    use crate::model::TransactionType;
    use crate::store::{BlobStore, MemoryStore};
    use chrono::{DateTime, Duration as Days};
    use std::sync::Arc;

    fn start() -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339("2026-10-14T15:00:00Z").unwrap()
    }

    async fn setup(seed: Seed) -> (Escrow, ManualClock, MemoryStore) {
        let clock = ManualClock::new(start());
        let store = MemoryStore::default();
        let escrow = Escrow::create(
            Arc::new(store.clone()) as Arc<dyn BlobStore>,
            Arc::new(clock.clone()) as Arc<dyn Clock>,
            seed,
        )
        .await
        .unwrap();
        (escrow, clock, store)
    }

    #[tokio::test]
    async fn test_not_due() {
        let (mut escrow, _clock, _store) = setup(Seed::Demo).await;
        let outcome = ReleaseScheduler::default().tick(&mut escrow).await.unwrap();
        assert!(matches!(outcome, TickOutcome::NotDue { .. }));
        assert_eq!(escrow.state().transactions.len(), 2);
    }

    #[tokio::test]
    async fn test_due_tick_releases_once_and_advances_a_week() {
        let (mut escrow, clock, _store) = setup(Seed::Demo).await;
        let due = escrow.state().config.next_release_date;
        let balance = escrow.state().balance;
        let count = escrow.state().transactions.len();
        clock.advance(Days::days(2));

        let outcome = ReleaseScheduler::default().tick(&mut escrow).await.unwrap();

        let state = escrow.state();
        assert_eq!(state.transactions.len(), count + 1);
        let tx = state.transactions.last().unwrap();
        assert_eq!(tx.kind(), TransactionType::Release);
        assert_eq!(tx.amount(), state.config.weekly_amount);
        assert_eq!(tx.date(), clock.now_utc());
        assert_eq!(state.balance, balance - state.config.weekly_amount);
        assert_eq!(state.config.next_release_date, due + Days::days(7));
        assert_eq!(
            outcome,
            TickOutcome::Released {
                transaction_id: tx.id().to_string(),
                amount: state.config.weekly_amount,
                next_release_date: due + Days::days(7),
            }
        );
    }

    #[tokio::test]
    async fn test_exactly_at_due_time_releases() {
        let (mut escrow, clock, _store) = setup(Seed::Demo).await;
        clock.set(escrow.state().config.next_release_date.fixed_offset());
        let outcome = ReleaseScheduler::default().tick(&mut escrow).await.unwrap();
        assert!(matches!(outcome, TickOutcome::Released { .. }));
    }

    #[tokio::test]
    async fn test_backlog_drains_one_week_per_tick() {
        let (mut escrow, clock, _store) = setup(Seed::Demo).await;
        // Three releases are due; the balance covers four.
        clock.advance(Days::days(16));
        let scheduler = ReleaseScheduler::default();
        for _ in 0..3 {
            let outcome = scheduler.tick(&mut escrow).await.unwrap();
            assert!(matches!(outcome, TickOutcome::Released { .. }));
        }
        let outcome = scheduler.tick(&mut escrow).await.unwrap();
        assert!(matches!(outcome, TickOutcome::NotDue { .. }));
        assert_eq!(escrow.state().balance, Amount::dollars(300));
    }

    #[tokio::test]
    async fn test_insufficient_funds_retry_changes_nothing() {
        let (mut escrow, clock, _store) = setup(Seed::Empty).await;
        let before = escrow.state().clone();
        clock.advance(Days::days(30));
        let scheduler = ReleaseScheduler::new(BacklogPolicy::Retry);
        for _ in 0..3 {
            let outcome = scheduler.tick(&mut escrow).await.unwrap();
            assert!(matches!(outcome, TickOutcome::InsufficientFunds { .. }));
        }
        assert_eq!(escrow.state(), &before);
    }

    #[tokio::test]
    async fn test_insufficient_funds_skip() {
        let (mut escrow, clock, _store) = setup(Seed::Empty).await;
        let due = escrow.state().config.next_release_date;
        clock.advance(Days::days(9));
        let outcome = ReleaseScheduler::new(BacklogPolicy::Skip)
            .tick(&mut escrow)
            .await
            .unwrap();
        let TickOutcome::InsufficientFunds {
            next_release_date,
            active,
            ..
        } = outcome
        else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(next_release_date, due + Days::weeks(2));
        assert!(active);
        assert!(escrow.state().transactions.is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_funds_pause() {
        let (mut escrow, clock, _store) = setup(Seed::Empty).await;
        clock.advance(Days::days(2));
        let scheduler = ReleaseScheduler::new(BacklogPolicy::Pause);
        scheduler.tick(&mut escrow).await.unwrap();
        assert!(!escrow.state().config.active);
        let outcome = scheduler.tick(&mut escrow).await.unwrap();
        assert_eq!(outcome, TickOutcome::Inactive);
    }

    #[tokio::test]
    async fn test_paused_schedule_never_releases() {
        let (mut escrow, clock, _store) = setup(Seed::Demo).await;
        escrow.pause().await.unwrap();
        clock.advance(Days::days(30));
        let outcome = ReleaseScheduler::default().tick(&mut escrow).await.unwrap();
        assert_eq!(outcome, TickOutcome::Inactive);
        assert_eq!(escrow.state().balance, Amount::dollars(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_on_interval_until_shutdown() {
        let (mut escrow, clock, _store) = setup(Seed::Demo).await;
        clock.advance(Days::days(2));
        let summary = ReleaseScheduler::default()
            .run(
                &mut escrow,
                Duration::from_secs(10),
                tokio::time::sleep(Duration::from_secs(35)),
            )
            .await;
        // Ticks at 0s, 10s, 20s and 30s; only the first finds a release due.
        assert_eq!(summary.ticks, 4);
        assert_eq!(summary.releases, 1);
        assert_eq!(summary.failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sees_deposits_made_elsewhere() {
        let (mut escrow, clock, store) = setup(Seed::Empty).await;
        clock.advance(Days::days(2));
        let mut other = Escrow::open(Arc::new(store), Arc::new(clock.clone()))
            .await
            .unwrap();
        let scheduler = ReleaseScheduler::default();

        let deposit_later = async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            other
                .apply_deposit(Amount::dollars(300), None, None)
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        };
        let summary = scheduler
            .run(&mut escrow, Duration::from_secs(10), deposit_later)
            .await;
        assert_eq!(summary.releases, 1);
        assert_eq!(escrow.state().balance, Amount::ZERO);
    }
}
