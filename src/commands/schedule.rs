use crate::args::ScheduleSetArgs;
use crate::clock::Clock;
use crate::commands::{open_escrow, Out};
use crate::model::{PayeeBank, RentConfig};
use crate::{Config, Result};
use std::sync::Arc;

fn describe(config: &RentConfig) -> String {
    let bank = match config.payee_bank.details() {
        Some(bank) => format!("{} ...{}", bank.bank_name, bank.account_last4()),
        None => "not linked".to_string(),
    };
    let email = if config.payee_email.is_empty() {
        "-"
    } else {
        config.payee_email.as_str()
    };
    [
        format!("Weekly amount: {}", config.weekly_amount),
        format!("Payee:         {}", config.payee_name),
        format!("Payee email:   {email}"),
        format!("Payee bank:    {bank}"),
        format!("Release day:   {}", config.release_day),
        format!(
            "Auto-release:  {}",
            if config.active { "on" } else { "paused" }
        ),
        format!(
            "Next release:  {}",
            config.next_release_date.format("%Y-%m-%d %H:%M UTC")
        ),
    ]
    .join("\n")
}

pub async fn schedule_show(config: &Config, clock: Arc<dyn Clock>) -> Result<Out<RentConfig>> {
    let escrow = open_escrow(config, clock).await?;
    let rent_config = escrow.state().config.clone();
    Ok(Out::new(describe(&rent_config), rent_config))
}

/// Applies `changes` on top of the current schedule and saves it. Saving always moves the next
/// release to the coming occurrence of the release day, even when nothing else changed.
pub async fn schedule_set(
    config: &Config,
    clock: Arc<dyn Clock>,
    changes: &ScheduleSetArgs,
) -> Result<Out<RentConfig>> {
    let mut escrow = open_escrow(config, clock).await?;
    let updated = apply(escrow.state().config.clone(), changes);
    let saved = escrow
        .save_config(updated)
        .await?
        .clone();
    Ok(Out::new(
        format!("Saved the schedule\n{}", describe(&saved)),
        saved,
    ))
}

fn apply(mut config: RentConfig, changes: &ScheduleSetArgs) -> RentConfig {
    if let Some(amount) = changes.amount() {
        config.weekly_amount = amount;
    }
    if let Some(payee) = changes.payee() {
        config.payee_name = payee.to_string();
    }
    if let Some(email) = changes.email() {
        config.payee_email = email.to_string();
    }
    if changes.clear_bank() {
        config.payee_bank = PayeeBank::Unset;
    } else if changes.bank_name().is_some()
        || changes.routing().is_some()
        || changes.account().is_some()
    {
        let mut bank = config
            .payee_bank
            .details()
            .cloned()
            .unwrap_or_default();
        if let Some(name) = changes.bank_name() {
            bank.bank_name = name.to_string();
        }
        if let Some(routing) = changes.routing() {
            bank.routing_number = routing.to_string();
        }
        if let Some(account) = changes.account() {
            bank.account_number = account.to_string();
        }
        config.payee_bank = PayeeBank::Set(bank);
    }
    if let Some(day) = changes.day() {
        config.release_day = day;
    }
    if let Some(active) = changes.active() {
        config.active = active;
    }
    config
}
