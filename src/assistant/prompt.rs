use crate::model::{AppState, Transaction};
use crate::Result;
use anyhow::Context;

/// How many of the most recent transactions are described to the assistant.
pub const CONTEXT_TRANSACTIONS: usize = 10;

/// How many of the most recent transactions are sent for consistency analysis.
pub const ANALYSIS_TRANSACTIONS: usize = 20;

/// Describes the wallet to the assistant: balance, schedule, payee and recent history.
pub fn system_context(state: &AppState) -> String {
    let config = &state.config;
    let bank_info = match config.payee_bank.details() {
        Some(bank) => format!(
            "Bank: {}, Account ending in {}",
            bank.bank_name,
            bank.account_last4()
        ),
        None => "No bank account linked yet".to_string(),
    };
    let recent = state
        .transactions
        .newest_first()
        .take(CONTEXT_TRANSACTIONS)
        .map(transaction_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are RentPacer AI, a helpful financial assistant for a roommate rent management app.
The user pays rent in advance into a holding wallet, and the app releases it weekly to their \
roommate (the landlord contact).

Current Balance: {balance}
Weekly Rent Amount: {weekly}
Payee: {payee}
Payee Bank Info: {bank_info}
Next Payment Due: {due}

Recent Transactions:
{recent}

Answer the user's question briefly and helpfully based on this data.
If they ask for a message to send to their roommate, draft a polite text confirming the transfer \
details.",
        balance = state.balance,
        weekly = config.weekly_amount,
        payee = config.payee_name,
        due = config.next_release_date.format("%Y-%m-%d"),
    )
}

fn transaction_line(t: &Transaction) -> String {
    format!(
        "{}: {} of {} ({}) [Method: {}]",
        t.date().format("%Y-%m-%d"),
        t.kind(),
        t.amount(),
        t.description(),
        t.method().unwrap_or("N/A")
    )
}

/// The single-prompt request for a one-sentence summary of how consistent the history is.
pub fn analysis_prompt(state: &AppState) -> Result<String> {
    let recent: Vec<&Transaction> = state
        .transactions
        .newest_first()
        .take(ANALYSIS_TRANSACTIONS)
        .collect();
    let json = serde_json::to_string(&recent).context("Unable to serialize transactions")?;
    Ok(format!(
        "Analyze these rent transactions and give a 1-sentence summary of my consistency: {json}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, BankDetails, PayeeBank};
    use chrono::{TimeZone, Utc};

    fn state() -> AppState {
        AppState::seed(Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_system_context_contents() {
        let context = system_context(&state());
        assert!(context.contains("Current Balance: $1,200.00"));
        assert!(context.contains("Weekly Rent Amount: $300.00"));
        assert!(context.contains("Payee: Alex (Roommate)"));
        assert!(context.contains("Payee Bank Info: No bank account linked yet"));
        assert!(context.contains("Next Payment Due: 2026-10-15"));
        assert!(context.contains(
            "2026-09-30: DEPOSIT of $1,200.00 (Initial Deposit) [Method: Bank Transfer]"
        ));
        assert!(context.contains("2026-10-07: RELEASE of $300.00 (Weekly Rent Release) [Method: N/A]"));
    }

    #[test]
    fn test_system_context_bank_and_recent_limit() {
        let mut state = state();
        state.config.payee_bank = PayeeBank::Set(BankDetails {
            bank_name: "Wells Fargo".to_string(),
            routing_number: "121000248".to_string(),
            account_number: "9876543210".to_string(),
        });
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 13, 0, 0).unwrap();
        for _ in 0..12 {
            state = state.deposit(Amount::dollars(1), None, None, now).unwrap();
        }
        let context = system_context(&state);
        assert!(context.contains("Bank: Wells Fargo, Account ending in 3210"));
        // Only the twelve new deposits are recent enough; the seed entries are cut.
        assert!(!context.contains("Initial Deposit"));
        assert_eq!(context.matches("Account Top-up").count(), CONTEXT_TRANSACTIONS);
    }

    #[test]
    fn test_analysis_prompt() {
        let prompt = analysis_prompt(&state()).unwrap();
        assert!(prompt.starts_with(
            "Analyze these rent transactions and give a 1-sentence summary of my consistency: ["
        ));
        assert!(prompt.contains("\"type\":\"RELEASE\""));
    }
}
