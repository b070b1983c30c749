//! These structs provide the CLI interface for the rentpacer CLI.

use crate::model::{Amount, ReleaseDay};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// rentpacer: A simulated rent escrow wallet.
///
/// You pay rent in advance into a holding wallet and rentpacer releases one weekly amount to your
/// roommate on a fixed weekday. Money never actually moves: deposits, cards and bank details are
/// all simulated and stored locally.
///
/// The assistant commands (chat and analyze) use the Gemini API. Set GEMINI_API_KEY, or set
/// RENTPACER_IN_TEST_MODE to use a canned offline assistant instead.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory, the config file and the wallet.
    ///
    /// The wallet starts with some demo history unless --empty is given. This fails if a wallet
    /// already exists in the home directory.
    Init(InitArgs),
    /// Show the balance, the schedule and a summary of past releases.
    Status,
    /// List every transaction, newest first.
    History(HistoryArgs),
    /// Add funds to the wallet.
    Deposit(DepositArgs),
    /// Link a payment card or list the linked cards.
    Card(CardArgs),
    /// Show or change the weekly release schedule.
    Schedule(ScheduleArgs),
    /// Check once whether a release is due and make it if so.
    Tick(TickArgs),
    /// Keep checking for due releases until interrupted with Ctrl-C.
    Run(RunArgs),
    /// Ask the assistant about your wallet. Without --message this reads questions from stdin.
    Chat(ChatArgs),
    /// Ask the assistant for a one-sentence summary of your payment consistency.
    Analyze,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where rentpacer data and configuration is held. Defaults to ~/rentpacer
    #[arg(long, env = "RENTPACER_HOME", default_value_t = default_rentpacer_home())]
    rentpacer_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, rentpacer_home: PathBuf) -> Self {
        Self {
            log_level,
            rentpacer_home: rentpacer_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn rentpacer_home(&self) -> &DisplayPath {
        &self.rentpacer_home
    }
}

/// Args for the `rentpacer init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Start with a zero balance and no history instead of the demo wallet.
    #[arg(long)]
    empty: bool,
}

impl InitArgs {
    pub fn new(empty: bool) -> Self {
        Self { empty }
    }

    pub fn empty(&self) -> bool {
        self.empty
    }
}

/// How `rentpacer history` renders the ledger.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFormat {
    #[default]
    Table,
    Json,
    Csv,
}

serde_plain::derive_display_from_serialize!(HistoryFormat);
serde_plain::derive_fromstr_from_deserialize!(HistoryFormat);

/// Args for the `rentpacer history` command.
#[derive(Debug, Parser, Clone)]
pub struct HistoryArgs {
    #[arg(long, value_enum, default_value_t = HistoryFormat::Table)]
    format: HistoryFormat,
}

impl HistoryArgs {
    pub fn new(format: HistoryFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> HistoryFormat {
        self.format
    }
}

/// Args for the `rentpacer deposit` command.
#[derive(Debug, Parser, Clone)]
pub struct DepositArgs {
    /// The amount to deposit, e.g. 600 or $1,200.00
    amount: Amount,

    /// The id of a linked card to label the deposit with (see `rentpacer card list`).
    #[arg(long)]
    card: Option<String>,

    /// Defaults to "Account Top-up".
    #[arg(long)]
    description: Option<String>,
}

impl DepositArgs {
    pub fn new(amount: Amount, card: Option<String>, description: Option<String>) -> Self {
        Self {
            amount,
            card,
            description,
        }
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn card(&self) -> Option<&str> {
        self.card.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Args for the `rentpacer card` command.
#[derive(Debug, Parser, Clone)]
pub struct CardArgs {
    #[command(subcommand)]
    action: CardSubcommand,
}

impl CardArgs {
    pub fn new(action: CardSubcommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &CardSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CardSubcommand {
    /// Link a card. Nothing is validated or charged.
    Add(CardAddArgs),
    /// List the linked cards.
    List,
}

/// Args for `rentpacer card add`.
#[derive(Debug, Parser, Clone)]
pub struct CardAddArgs {
    /// The card number. Anything other than digits is ignored.
    #[arg(long)]
    number: String,

    /// The expiry date as MM/YY.
    #[arg(long)]
    expiry: String,

    /// Accepted for realism and then discarded.
    #[arg(long)]
    cvc: Option<String>,
}

impl CardAddArgs {
    pub fn new(number: impl Into<String>, expiry: impl Into<String>, cvc: Option<String>) -> Self {
        Self {
            number: number.into(),
            expiry: expiry.into(),
            cvc,
        }
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn expiry(&self) -> &str {
        &self.expiry
    }

    pub fn cvc(&self) -> Option<&str> {
        self.cvc.as_deref()
    }
}

/// Args for the `rentpacer schedule` command.
#[derive(Debug, Parser, Clone)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    action: ScheduleSubcommand,
}

impl ScheduleArgs {
    pub fn new(action: ScheduleSubcommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &ScheduleSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScheduleSubcommand {
    /// Print the current schedule.
    Show,
    /// Change the schedule. Saving always recomputes the next release date from today.
    Set(Box<ScheduleSetArgs>),
}

/// Args for `rentpacer schedule set`. Options that are not given keep their current values.
#[derive(Debug, Default, Parser, Clone)]
pub struct ScheduleSetArgs {
    /// The weekly release amount.
    #[arg(long)]
    amount: Option<Amount>,

    /// The name of the person receiving the rent.
    #[arg(long)]
    payee: Option<String>,

    /// The payee's email address.
    #[arg(long)]
    email: Option<String>,

    /// The payee's bank name. Bank details are for display only.
    #[arg(long, conflicts_with = "clear_bank")]
    bank_name: Option<String>,

    /// The payee's routing number.
    #[arg(long, conflicts_with = "clear_bank")]
    routing: Option<String>,

    /// The payee's account number.
    #[arg(long, conflicts_with = "clear_bank")]
    account: Option<String>,

    /// Remove the payee's bank details.
    #[arg(long)]
    clear_bank: bool,

    /// The release weekday, as a number 0 (Sunday) to 6 (Saturday) or a name like friday.
    #[arg(long)]
    day: Option<ReleaseDay>,

    /// Turn auto-release on.
    #[arg(long, conflicts_with = "paused")]
    active: bool,

    /// Turn auto-release off.
    #[arg(long)]
    paused: bool,
}

impl ScheduleSetArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_bank(
        mut self,
        bank_name: impl Into<String>,
        routing: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        self.bank_name = Some(bank_name.into());
        self.routing = Some(routing.into());
        self.account = Some(account.into());
        self
    }

    pub fn with_clear_bank(mut self) -> Self {
        self.clear_bank = true;
        self
    }

    pub fn with_day(mut self, day: ReleaseDay) -> Self {
        self.day = Some(day);
        self
    }

    /// The same as passing --active when `active` is true, otherwise --paused.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self.paused = !active;
        self
    }

    pub fn amount(&self) -> Option<Amount> {
        self.amount
    }

    pub fn payee(&self) -> Option<&str> {
        self.payee.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn bank_name(&self) -> Option<&str> {
        self.bank_name.as_deref()
    }

    pub fn routing(&self) -> Option<&str> {
        self.routing.as_deref()
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn clear_bank(&self) -> bool {
        self.clear_bank
    }

    pub fn day(&self) -> Option<ReleaseDay> {
        self.day
    }

    /// `Some(true)` when --active was given, `Some(false)` for --paused, otherwise `None`.
    pub fn active(&self) -> Option<bool> {
        match (self.active, self.paused) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        }
    }
}

/// Args for the `rentpacer tick` command.
#[derive(Debug, Parser, Clone)]
pub struct TickArgs {
    /// Pretend the current time is this RFC 3339 timestamp, e.g. 2026-10-16T09:30:00-07:00
    #[arg(long)]
    now: Option<chrono::DateTime<chrono::FixedOffset>>,
}

impl TickArgs {
    pub fn new(now: Option<chrono::DateTime<chrono::FixedOffset>>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        self.now
    }
}

/// Args for the `rentpacer run` command.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Seconds between checks. Defaults to tick_interval_secs from config.json.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: Option<u64>,
}

impl RunArgs {
    pub fn new(interval_secs: Option<u64>) -> Self {
        Self { interval_secs }
    }

    pub fn interval_secs(&self) -> Option<u64> {
        self.interval_secs
    }
}

/// Args for the `rentpacer chat` command.
#[derive(Debug, Parser, Clone)]
pub struct ChatArgs {
    /// Ask a single question and exit.
    #[arg(long, short)]
    message: Option<String>,
}

impl ChatArgs {
    pub fn new(message: Option<String>) -> Self {
        Self { message }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

fn default_rentpacer_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("rentpacer"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --rentpacer-home or RENTPACER_HOME instead of relying on the \
                default home directory. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from("rentpacer")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn test_parse_deposit() {
        let args = Args::try_parse_from([
            "rentpacer",
            "--rentpacer-home",
            "/tmp/rp",
            "deposit",
            "$1,200.50",
            "--card",
            "abc",
        ])
        .unwrap();
        assert_eq!(args.common().rentpacer_home().path(), Path::new("/tmp/rp"));
        let Command::Deposit(deposit) = args.command() else {
            panic!("expected deposit, got {:?}", args.command());
        };
        assert_eq!(deposit.amount(), Amount::from_cents(120050));
        assert_eq!(deposit.card(), Some("abc"));
        assert_eq!(deposit.description(), None);
    }

    #[test]
    fn test_parse_schedule_set() {
        let args = Args::try_parse_from([
            "rentpacer",
            "schedule",
            "set",
            "--amount",
            "350",
            "--day",
            "wednesday",
            "--paused",
        ])
        .unwrap();
        let Command::Schedule(schedule) = args.command() else {
            panic!("expected schedule");
        };
        let ScheduleSubcommand::Set(set) = schedule.action() else {
            panic!("expected set");
        };
        assert_eq!(set.amount(), Some(Amount::dollars(350)));
        assert_eq!(set.day(), Some(ReleaseDay::from(Weekday::Wed)));
        assert_eq!(set.active(), Some(false));
        assert_eq!(set.payee(), None);
    }

    #[test]
    fn test_schedule_set_conflicts() {
        assert!(Args::try_parse_from([
            "rentpacer", "schedule", "set", "--active", "--paused"
        ])
        .is_err());
        assert!(Args::try_parse_from([
            "rentpacer",
            "schedule",
            "set",
            "--bank-name",
            "Chase",
            "--clear-bank"
        ])
        .is_err());
        assert!(Args::try_parse_from(["rentpacer", "schedule", "set", "--day", "9"]).is_err());
    }

    #[test]
    fn test_parse_tick_now_and_history_format() {
        let args =
            Args::try_parse_from(["rentpacer", "tick", "--now", "2026-10-16T09:30:00-07:00"])
                .unwrap();
        let Command::Tick(tick) = args.command() else {
            panic!("expected tick");
        };
        assert_eq!(tick.now().unwrap().offset().local_minus_utc(), -7 * 3600);

        let args = Args::try_parse_from(["rentpacer", "history", "--format", "csv"]).unwrap();
        let Command::History(history) = args.command() else {
            panic!("expected history");
        };
        assert_eq!(history.format(), HistoryFormat::Csv);
    }

    #[test]
    fn test_run_interval_must_be_positive() {
        assert!(Args::try_parse_from(["rentpacer", "run", "--interval-secs", "0"]).is_err());
    }

    #[test]
    fn test_log_level() {
        let args = Args::try_parse_from(["rentpacer", "--log-level", "debug", "status"]).unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
    }
}
