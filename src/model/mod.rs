//! Types that represent the core data model, such as `AppState`, `Transaction` and `RentConfig`.
mod amount;
mod card;
mod rent_config;
mod state;
mod transaction;

pub use amount::{Amount, AmountError};
pub use card::{Card, CardBrand};
pub use rent_config::{
    next_release_after, BankDetails, PayeeBank, ReleaseDay, RentConfig, RELEASE_HOUR,
};
pub use state::{AppState, DEFAULT_DEPOSIT_DESCRIPTION, MANUAL_DEPOSIT_METHOD};
pub use transaction::{Ledger, Transaction, TransactionType};
