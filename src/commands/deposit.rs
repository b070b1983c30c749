use crate::clock::Clock;
use crate::commands::{open_escrow, Out};
use crate::model::{Amount, Transaction};
use crate::{Config, Result};
use std::sync::Arc;
use tracing::warn;

/// Adds `amount` to the wallet. When `card_id` names a linked card the deposit is labelled with
/// it; an unknown card id is recorded as a manual deposit.
pub async fn deposit(
    config: &Config,
    clock: Arc<dyn Clock>,
    amount: Amount,
    card_id: Option<&str>,
    description: Option<&str>,
) -> Result<Out<Transaction>> {
    let mut escrow = open_escrow(config, clock).await?;
    if let Some(id) = card_id {
        if escrow.state().find_card(id).is_none() {
            warn!("No linked card has the id '{id}', recording a manual deposit");
        }
    }
    let tx = escrow
        .apply_deposit(amount, description, card_id)
        .await?
        .clone();
    let message = format!(
        "Deposited {}, the balance is now {}",
        tx.amount(),
        escrow.state().balance
    );
    Ok(Out::new(message, tx))
}
