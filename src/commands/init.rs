use crate::clock::Clock;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::escrow::{Escrow, Seed};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

/// Creates the home directory, a default `config.json` (unless one is already there) and a new
/// wallet populated according to `seed`.
///
/// # Errors
/// - Returns an error if a wallet already exists in `rentpacer_home`.
/// - Returns an error if any file operations fail.
pub async fn init(rentpacer_home: &Path, seed: Seed, clock: Arc<dyn Clock>) -> Result<Out<()>> {
    let config = Config::create(rentpacer_home)
        .await
        .context("Unable to create the home directory and config")
        .pub_result(ErrorType::Config)?;
    Escrow::create(Arc::new(config.store()), clock, seed)
        .await
        .context("Unable to create the wallet")
        .pub_result(ErrorType::Storage)?;
    let wallet = match seed {
        Seed::Demo => "the demo wallet",
        Seed::Empty => "an empty wallet",
    };
    Ok(format!(
        "Successfully created {} with {wallet}",
        config.root().display()
    )
    .into())
}
