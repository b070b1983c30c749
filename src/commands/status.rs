use crate::clock::Clock;
use crate::commands::{open_escrow, Out};
use crate::model::{Amount, AppState, ReleaseDay, Transaction};
use crate::{Config, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

/// How many releases the recent releases series holds.
pub const RECENT_RELEASES: usize = 6;

/// The dashboard view of the wallet.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Status {
    pub balance: Amount,
    pub weeks_covered: u64,
    pub weekly_amount: Amount,
    pub payee_name: String,
    pub release_day: ReleaseDay,
    pub active: bool,
    pub next_release_date: DateTime<Utc>,
    pub total_paid_out: Amount,
    pub total_deposited: Amount,
    /// Deposits minus releases. Shown for information; the balance is not corrected to match.
    pub replayed_balance: Amount,
    /// Oldest first.
    pub recent_releases: Vec<ReleasePoint>,
    pub linked_cards: usize,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ReleasePoint {
    pub date: DateTime<Utc>,
    pub amount: Amount,
}

impl From<&Transaction> for ReleasePoint {
    fn from(t: &Transaction) -> Self {
        Self {
            date: t.date(),
            amount: t.amount(),
        }
    }
}

impl Status {
    pub fn of(state: &AppState) -> Self {
        let config = &state.config;
        let ledger = &state.transactions;
        Self {
            balance: state.balance,
            weeks_covered: state.weeks_covered(),
            weekly_amount: config.weekly_amount,
            payee_name: config.payee_name.clone(),
            release_day: config.release_day,
            active: config.active,
            next_release_date: config.next_release_date,
            total_paid_out: ledger.total_released(),
            total_deposited: ledger.total_deposited(),
            replayed_balance: ledger.replayed_balance(),
            recent_releases: ledger
                .recent_releases(RECENT_RELEASES)
                .into_iter()
                .map(ReleasePoint::from)
                .collect(),
            linked_cards: state.linked_cards.len(),
        }
    }

    fn render(&self) -> String {
        let mut s = String::new();
        let auto = if self.active { "on" } else { "paused" };
        let _ = writeln!(s, "Balance:          {}", self.balance);
        let _ = writeln!(s, "Weeks covered:    {}", self.weeks_covered);
        let _ = writeln!(
            s,
            "Weekly payment:   {} to {} every {}",
            self.weekly_amount, self.payee_name, self.release_day
        );
        let _ = writeln!(
            s,
            "Next release:     {} (auto-release {auto})",
            self.next_release_date.format("%Y-%m-%d %H:%M UTC")
        );
        let _ = writeln!(s, "Total paid out:   {}", self.total_paid_out);
        let _ = writeln!(s, "Total deposited:  {}", self.total_deposited);
        let _ = writeln!(s, "Replayed balance: {}", self.replayed_balance);
        let _ = writeln!(s, "Linked cards:     {}", self.linked_cards);
        if self.recent_releases.is_empty() {
            let _ = write!(s, "Recent releases:  none");
        } else {
            let _ = write!(s, "Recent releases:");
            for point in &self.recent_releases {
                let _ = write!(s, "\n  {}  {}", point.date.format("%Y-%m-%d"), point.amount);
            }
        }
        s
    }
}

/// Summarizes the wallet: balance, coverage, schedule and recent releases.
pub async fn status(config: &Config, clock: Arc<dyn Clock>) -> Result<Out<Status>> {
    let escrow = open_escrow(config, clock).await?;
    let status = Status::of(escrow.state());
    Ok(Out::new(status.render(), status))
}
