use clap::Parser;
use rentpacer::args::{Args, CardSubcommand, Command, ScheduleSubcommand};
use rentpacer::clock::{Clock, FixedClock, SystemClock};
use rentpacer::escrow::Seed;
use rentpacer::{commands, Config, Mode, Result};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().rentpacer_home().path();

    // This allows for running the program without calling the Gemini API. When
    // RENTPACER_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Gemini.
    let mode = Mode::from_env();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let _: () = match args.command() {
        Command::Init(init_args) => {
            let seed = if init_args.empty() {
                Seed::Empty
            } else {
                Seed::Demo
            };
            commands::init(home, seed, clock).await?.print()
        }

        Command::Status => {
            let config = Config::load(home).await?;
            commands::status(&config, clock).await?.print()
        }

        Command::History(history_args) => {
            let config = Config::load(home).await?;
            commands::history(&config, clock, history_args.format())
                .await?
                .print()
        }

        Command::Deposit(deposit_args) => {
            let config = Config::load(home).await?;
            commands::deposit(
                &config,
                clock,
                deposit_args.amount(),
                deposit_args.card(),
                deposit_args.description(),
            )
            .await?
            .print()
        }

        Command::Card(card_args) => {
            let config = Config::load(home).await?;
            match card_args.action() {
                CardSubcommand::Add(add) => {
                    commands::card_add(&config, clock, add.number(), add.expiry(), add.cvc())
                        .await?
                        .print()
                }
                CardSubcommand::List => commands::card_list(&config, clock).await?.print(),
            }
        }

        Command::Schedule(schedule_args) => {
            let config = Config::load(home).await?;
            match schedule_args.action() {
                ScheduleSubcommand::Show => commands::schedule_show(&config, clock).await?.print(),
                ScheduleSubcommand::Set(changes) => {
                    commands::schedule_set(&config, clock, changes)
                        .await?
                        .print()
                }
            }
        }

        Command::Tick(tick_args) => {
            let config = Config::load(home).await?;
            let clock: Arc<dyn Clock> = match tick_args.now() {
                Some(now) => Arc::new(FixedClock::new(now)),
                None => clock,
            };
            commands::tick(&config, clock).await?.print()
        }

        Command::Run(run_args) => {
            let config = Config::load(home).await?;
            let interval = run_args.interval_secs().map(Duration::from_secs);
            commands::run(&config, clock, interval).await?.print()
        }

        Command::Chat(chat_args) => {
            let config = Config::load(home).await?;
            commands::chat(&config, clock, mode, chat_args.message())
                .await?
                .print()
        }

        Command::Analyze => {
            let config = Config::load(home).await?;
            commands::analyze(&config, clock, mode).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
