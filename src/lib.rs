pub mod args;
pub mod assistant;
pub mod chat;
pub mod clock;
pub mod commands;
mod config;
mod error;
pub mod escrow;
pub mod model;
pub mod scheduler;
pub mod store;
mod utils;


pub use assistant::Mode;
pub use config::{AssistantSettings, Config};
pub use error::Error;
pub use error::Result;
