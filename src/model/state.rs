use crate::model::{
    Amount, Card, Ledger, PayeeBank, ReleaseDay, RentConfig, Transaction, TransactionType,
};
use crate::utils::generate_id;
use crate::Result;
use anyhow::{bail, ensure, Context};
use chrono::{DateTime, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DEPOSIT_DESCRIPTION: &str = "Account Top-up";
pub const MANUAL_DEPOSIT_METHOD: &str = "Manual Deposit";

/// Everything that is persisted: the wallet balance, the ledger, the release configuration and
/// the linked cards. It is always written and read as one unit.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub balance: Amount,
    pub transactions: Ledger,
    pub config: RentConfig,
    pub linked_cards: Vec<Card>,
}

impl AppState {
    /// The demo starting point: a funded wallet with one past deposit and one past release.
    ///
    /// The stored balance deliberately matches the deposit alone, so the ledger replays to less
    /// than the balance.
    pub fn seed(now: DateTime<Utc>) -> Self {
        let transactions = Ledger::new(vec![
            Transaction::new(
                "1",
                now - Duration::days(14),
                Amount::dollars(1200),
                TransactionType::Deposit,
                "Initial Deposit",
                Some("Bank Transfer".to_string()),
            ),
            Transaction::new(
                "2",
                now - Duration::days(7),
                Amount::dollars(300),
                TransactionType::Release,
                "Weekly Rent Release",
                None,
            ),
        ]);
        Self {
            balance: Amount::dollars(1200),
            transactions,
            config: default_config(now),
            linked_cards: Vec::new(),
        }
    }

    /// A zero balance with no history and the default release configuration.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            balance: Amount::ZERO,
            transactions: Ledger::default(),
            config: default_config(now),
            linked_cards: Vec::new(),
        }
    }

    pub fn find_card(&self, id: &str) -> Option<&Card> {
        self.linked_cards.iter().find(|c| c.id() == id)
    }

    /// Whole weeks of rent the current balance covers.
    pub fn weeks_covered(&self) -> u64 {
        self.balance.whole_multiples_of(self.config.weekly_amount)
    }

    /// Returns the state after depositing `amount`. The deposit is labelled with the linked card
    /// `card_id` when it exists, otherwise as a manual deposit.
    pub fn deposit(
        &self,
        amount: Amount,
        description: Option<&str>,
        card_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AppState> {
        ensure!(
            amount.is_positive(),
            "A deposit must be greater than zero, got {amount}"
        );
        let method = card_id
            .and_then(|id| self.find_card(id))
            .map(Card::method_label)
            .unwrap_or_else(|| MANUAL_DEPOSIT_METHOD.to_string());
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(DEFAULT_DEPOSIT_DESCRIPTION);

        let balance = self
            .balance
            .checked_add(amount)
            .context("The deposit would overflow the balance")?;

        let mut next = self.clone();
        next.balance = balance;
        next.transactions.append(Transaction::new(
            generate_id(),
            now,
            amount,
            TransactionType::Deposit,
            description,
            Some(method),
        ));
        Ok(next)
    }

    /// Returns the state after releasing one weekly amount to the payee, with the schedule
    /// advanced by exactly one week from its previous due date.
    pub fn release(&self, now: DateTime<Utc>) -> Result<AppState> {
        let config = &self.config;
        let Some(balance) = self.balance.checked_sub(config.weekly_amount) else {
            bail!(
                "Balance {} does not cover the weekly amount {}",
                self.balance,
                config.weekly_amount
            );
        };

        let mut next = self.clone();
        next.balance = balance;
        next.transactions.append(Transaction::new(
            generate_id(),
            now,
            config.weekly_amount,
            TransactionType::Release,
            config.release_description(),
            Some(config.release_method()),
        ));
        next.config.next_release_date = config.next_release_date + Duration::weeks(1);
        Ok(next)
    }

    /// Returns the state with `config` replacing the current configuration.
    pub fn with_config(&self, config: RentConfig) -> Result<AppState> {
        config.validate()?;
        let mut next = self.clone();
        next.config = config;
        Ok(next)
    }

    pub fn with_card(&self, card: Card) -> AppState {
        let mut next = self.clone();
        next.linked_cards.push(card);
        next
    }
}

fn default_config(now: DateTime<Utc>) -> RentConfig {
    RentConfig {
        weekly_amount: Amount::dollars(300),
        payee_name: "Alex (Roommate)".to_string(),
        payee_email: String::new(),
        payee_bank: PayeeBank::Unset,
        release_day: ReleaseDay::from(Weekday::Fri),
        active: true,
        next_release_date: now + Duration::days(1),
    }
}
