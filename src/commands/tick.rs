use crate::clock::Clock;
use crate::commands::{open_escrow, Out};
use crate::scheduler::{ReleaseScheduler, RunSummary, TickOutcome};
use crate::{Config, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Runs one scheduler check with the backlog policy from `config.json`.
pub async fn tick(config: &Config, clock: Arc<dyn Clock>) -> Result<Out<TickOutcome>> {
    let mut escrow = open_escrow(config, clock).await?;
    let outcome = ReleaseScheduler::new(config.backlog_policy())
        .tick(&mut escrow)
        .await?;
    Ok(Out::new(outcome.message(), outcome))
}

/// Checks for due releases every `interval` (or `tick_interval_secs` from `config.json`) until
/// Ctrl-C is pressed.
pub async fn run(
    config: &Config,
    clock: Arc<dyn Clock>,
    interval: Option<Duration>,
) -> Result<Out<RunSummary>> {
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, stopping"),
            Err(e) => {
                error!("Unable to listen for Ctrl-C, the scheduler must be killed to stop: {e}");
                std::future::pending::<()>().await
            }
        }
    };
    run_until(config, clock, interval, shutdown).await
}

/// `run` with a caller-provided shutdown signal.
pub async fn run_until<F>(
    config: &Config,
    clock: Arc<dyn Clock>,
    interval: Option<Duration>,
    shutdown: F,
) -> Result<Out<RunSummary>>
where
    F: Future<Output = ()>,
{
    let mut escrow = open_escrow(config, clock).await?;
    let every = interval.unwrap_or_else(|| config.tick_interval());
    let summary = ReleaseScheduler::new(config.backlog_policy())
        .run(&mut escrow, every, shutdown)
        .await;
    Ok(Out::new(
        format!(
            "Made {} releases in {} checks ({} failed)",
            summary.releases, summary.ticks, summary.failures
        ),
        summary,
    ))
}
