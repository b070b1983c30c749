//! Command handlers for the rentpacer CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod card;
mod chat;
mod deposit;
mod history;
mod init;
mod schedule;
mod status;
mod tick;

use crate::clock::Clock;
use crate::error::{ErrorType, IntoResult};
use crate::escrow::Escrow;
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

pub use card::{card_add, card_list};
pub use chat::{analyze, chat};
pub use deposit::deposit;
pub use history::history;
pub use init::init;
pub use schedule::{schedule_set, schedule_show};
pub use status::{status, ReleasePoint, Status};
pub use tick::{run, run_until, tick};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Opens the wallet saved in the home directory of `config`.
async fn open_escrow(config: &Config, clock: Arc<dyn Clock>) -> Result<Escrow> {
    Escrow::open(Arc::new(config.store()), clock)
        .await
        .pub_result(ErrorType::Storage)
}
