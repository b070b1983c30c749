use crate::model::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether money came into the wallet or was released out of it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Release,
}

serde_plain::derive_display_from_serialize!(TransactionType);
serde_plain::derive_fromstr_from_deserialize!(TransactionType);

/// A single ledger entry. The amount is always positive; `kind` carries the sign.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: String,
    date: DateTime<Utc>,
    amount: Amount,
    #[serde(rename = "type")]
    kind: TransactionType,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        date: DateTime<Utc>,
        amount: Amount,
        kind: TransactionType,
        description: impl Into<String>,
        method: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            amount,
            kind,
            description: description.into(),
            method,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// The effect this entry has on the balance.
    pub fn signed_amount(&self) -> Amount {
        match self.kind {
            TransactionType::Deposit => self.amount,
            TransactionType::Release => Amount::ZERO - self.amount,
        }
    }
}

/// The append-only transaction log, oldest first.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger(Vec<Transaction>);

impl Ledger {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self(transactions)
    }

    pub(crate) fn append(&mut self, transaction: Transaction) {
        self.0.push(transaction);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Transaction> {
        self.0.iter()
    }

    /// Newest first, the order history is shown in.
    pub fn newest_first(&self) -> impl Iterator<Item = &Transaction> {
        self.0.iter().rev()
    }

    pub fn last(&self) -> Option<&Transaction> {
        self.0.last()
    }

    fn total_of(&self, kind: TransactionType) -> Amount {
        self.0
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.amount)
            .sum()
    }

    pub fn total_deposited(&self) -> Amount {
        self.total_of(TransactionType::Deposit)
    }

    pub fn total_released(&self) -> Amount {
        self.total_of(TransactionType::Release)
    }

    /// The balance implied by replaying every entry: deposits minus releases. Nothing forces the
    /// stored balance to agree with this.
    pub fn replayed_balance(&self) -> Amount {
        self.0.iter().map(Transaction::signed_amount).sum()
    }

    /// The `limit` most recent releases in chronological order, i.e. the series behind the recent
    /// releases chart.
    pub fn recent_releases(&self, limit: usize) -> Vec<&Transaction> {
        let mut releases: Vec<&Transaction> = self
            .0
            .iter()
            .rev()
            .filter(|t| t.kind == TransactionType::Release)
            .take(limit)
            .collect();
        releases.reverse();
        releases
    }
}
