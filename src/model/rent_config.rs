//! The weekly release configuration and the rules for when the next release falls.

use crate::model::Amount;
use crate::Result;
use anyhow::{bail, ensure, Context};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Releases scheduled by a config save fall at this hour, local time.
pub const RELEASE_HOUR: u32 = 9;

/// Display-only payee bank fields. Nothing validates or transmits these.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub routing_number: String,
    pub account_number: String,
}

impl BankDetails {
    /// The last four characters of the account number (fewer if it is shorter).
    pub fn account_last4(&self) -> &str {
        let n = self.account_number.chars().count();
        let skip = n.saturating_sub(4);
        match self.account_number.char_indices().nth(skip) {
            Some((ix, _)) => &self.account_number[ix..],
            None => "",
        }
    }
}

/// Whether the payee has bank details on file.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "details", rename_all = "snake_case")]
pub enum PayeeBank {
    #[default]
    Unset,
    Set(BankDetails),
}

impl PayeeBank {
    pub fn details(&self) -> Option<&BankDetails> {
        match self {
            PayeeBank::Unset => None,
            PayeeBank::Set(details) => Some(details),
        }
    }
}

/// The weekday releases happen on, 0 (Sunday) through 6 (Saturday).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ReleaseDay(u8);

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

impl ReleaseDay {
    pub const fn number(&self) -> u8 {
        self.0
    }

    pub fn name(&self) -> &'static str {
        DAY_NAMES[self.0 as usize]
    }

    pub fn weekday(&self) -> Weekday {
        match self.0 {
            0 => Weekday::Sun,
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            _ => Weekday::Sat,
        }
    }
}

impl From<Weekday> for ReleaseDay {
    fn from(value: Weekday) -> Self {
        ReleaseDay(value.num_days_from_sunday() as u8)
    }
}

impl TryFrom<u8> for ReleaseDay {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        if value <= 6 {
            Ok(ReleaseDay(value))
        } else {
            Err(format!("release day must be 0 (Sunday) to 6 (Saturday), got {value}"))
        }
    }
}

impl From<ReleaseDay> for u8 {
    fn from(value: ReleaseDay) -> Self {
        value.0
    }
}

impl Display for ReleaseDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts a day number (`5`), a full name (`friday`) or a three-letter abbreviation (`Fri`).
impl FromStr for ReleaseDay {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u8>() {
            return ReleaseDay::try_from(n);
        }
        s.parse::<Weekday>()
            .map(ReleaseDay::from)
            .map_err(|_| format!("'{s}' is not a day of the week"))
    }
}

/// The weekly auto-release configuration. Replaced as a whole on save.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RentConfig {
    pub weekly_amount: Amount,
    pub payee_name: String,
    pub payee_email: String,
    #[serde(default)]
    pub payee_bank: PayeeBank,
    pub release_day: ReleaseDay,
    pub active: bool,
    pub next_release_date: DateTime<Utc>,
}

impl RentConfig {
    /// Rejects configs that the release scheduler cannot act on.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.weekly_amount.is_positive(),
            "The weekly amount must be greater than zero, got {}",
            self.weekly_amount
        );
        if self.payee_name.trim().is_empty() {
            bail!("A payee name is required");
        }
        Ok(())
    }

    /// How release transactions to this payee are labelled.
    pub fn release_method(&self) -> String {
        match &self.payee_bank {
            PayeeBank::Set(bank) => {
                format!("Transfer to {} ...{}", bank.bank_name, bank.account_last4())
            }
            PayeeBank::Unset => "Escrow Release".to_string(),
        }
    }

    pub fn release_description(&self) -> String {
        format!("Weekly Rent to {}", self.payee_name)
    }
}

/// The next occurrence of `day` strictly after today's date (so today's weekday maps to a week
/// out), at `RELEASE_HOUR` in the offset of `now`.
pub fn next_release_after(now: DateTime<FixedOffset>, day: ReleaseDay) -> Result<DateTime<Utc>> {
    let current = now.weekday().num_days_from_sunday() as i64;
    let target = day.number() as i64;
    let mut days_until = target - current;
    if days_until <= 0 {
        days_until += 7;
    }

    let date = now
        .date_naive()
        .checked_add_signed(Duration::days(days_until))
        .context("Next release date is out of range")?;
    let time = NaiveTime::from_hms_opt(RELEASE_HOUR, 0, 0).context("Invalid release hour")?;
    let local = now
        .offset()
        .from_local_datetime(&date.and_time(time))
        .single()
        .context("Next release time does not exist in the local offset")?;
    Ok(local.with_timezone(&Utc))
}
