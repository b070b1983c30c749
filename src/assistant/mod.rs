//! The text-generation collaborator behind the assistant chat.
//!
//! The `Assistant` trait is the only thing the chat knows about. `GeminiAssistant` talks to the
//! Gemini API; `TestAssistant` answers from memory so the whole program can run without network
//! access (see `Mode`).

mod gemini;
mod prompt;
mod test_client;

use crate::Config;
use std::fmt::Debug;

pub use gemini::GeminiAssistant;
pub use prompt::{analysis_prompt, system_context, ANALYSIS_TRANSACTIONS, CONTEXT_TRANSACTIONS};
pub use test_client::TestAssistant;

/// Set this to a non-empty value to use `TestAssistant` instead of the Gemini API.
pub const TEST_MODE_ENV: &str = "RENTPACER_IN_TEST_MODE";

/// Why a generation request produced no text.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("the API key environment variable '{0}' is not set")]
    MissingApiKey(String),
    #[error("the request to the AI service failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("the AI service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("the AI service response could not be read: {0}")]
    Decode(String),
}

/// A black-box text completion service.
#[async_trait::async_trait]
pub trait Assistant: Send + Sync + Debug {
    /// Generates a reply to `contents`, steered by `system` when given. An empty string means the
    /// service answered without any text.
    async fn generate(
        &self,
        system: Option<&str>,
        contents: &str,
    ) -> Result<String, AssistantError>;
}

/// Which `Assistant` implementation the program uses.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Gemini,
    Test,
}

impl Mode {
    /// `Mode::Test` when `RENTPACER_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Gemini`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(v) if !v.is_empty() => Mode::Test,
            _ => Mode::Gemini,
        }
    }
}

/// Builds the `Assistant` for `mode`.
pub fn assistant(config: &Config, mode: Mode) -> crate::Result<Box<dyn Assistant>> {
    Ok(match mode {
        Mode::Gemini => Box::new(GeminiAssistant::new(config.assistant())?),
        Mode::Test => Box::new(TestAssistant::default()),
    })
}
