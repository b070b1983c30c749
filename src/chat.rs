//! The assistant chat transcript and the consistency analysis.
//!
//! A `ChatSession` holds the transcript and a busy flag. An accepted submission appends exactly
//! one user message and, once the assistant answers or fails, exactly one assistant message.

use crate::assistant::{analysis_prompt, system_context, Assistant, AssistantError};
use crate::model::AppState;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

pub const GREETING: &str = "Hi! I'm your RentPacer assistant. Ask me about your balance, \
spending history, or for help drafting a message to your roommate.";
pub const CONNECTION_FALLBACK: &str = "Sorry, I'm having trouble connecting to the AI service \
right now. Please check your API key.";
pub const EMPTY_REPLY_FALLBACK: &str = "I couldn't generate a response at this time.";
pub const ANALYSIS_UNAVAILABLE: &str = "Analysis unavailable.";
pub const ANALYSIS_FAILED: &str = "Could not analyze data.";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

serde_plain::derive_display_from_serialize!(Role);

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Why a submission was not accepted. A rejected submission leaves the transcript untouched.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum Rejected {
    #[error("the message is blank")]
    Blank,
    #[error("the assistant is still answering the previous message")]
    Busy,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    transcript: Vec<Message>,
    busy: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    /// Starts a transcript with the greeting.
    pub fn new() -> Self {
        Self {
            transcript: vec![Message::new(Role::Assistant, GREETING)],
            busy: false,
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Accepts `text` and marks the session busy until `complete` is called.
    pub fn begin(&mut self, text: &str) -> Result<(), Rejected> {
        if self.busy {
            return Err(Rejected::Busy);
        }
        if text.trim().is_empty() {
            return Err(Rejected::Blank);
        }
        self.transcript.push(Message::new(Role::User, text));
        self.busy = true;
        Ok(())
    }

    /// Records the assistant's answer to the pending message. Failures and empty answers are
    /// recorded as the fixed fallback texts.
    pub fn complete(&mut self, reply: Result<String, AssistantError>) -> &Message {
        let text = match reply {
            Ok(text) if text.trim().is_empty() => EMPTY_REPLY_FALLBACK.to_string(),
            Ok(text) => text,
            Err(e) => {
                error!("The assistant request failed: {e}");
                CONNECTION_FALLBACK.to_string()
            }
        };
        self.transcript.push(Message::new(Role::Assistant, text));
        self.busy = false;
        // The push above guarantees a last element.
        &self.transcript[self.transcript.len() - 1]
    }

    /// Sends `text` to `assistant` with a description of `state` and records the answer.
    pub async fn submit(
        &mut self,
        state: &AppState,
        assistant: &dyn Assistant,
        text: &str,
    ) -> Result<&Message, Rejected> {
        self.begin(text)?;
        let context = system_context(state);
        debug!("Asking the assistant: {text}");
        let reply = assistant.generate(Some(&context), text).await;
        Ok(self.complete(reply))
    }
}

/// Asks the assistant for a one-sentence summary of how consistent the recent history is.
pub async fn analyze(state: &AppState, assistant: &dyn Assistant) -> String {
    let prompt = match analysis_prompt(state) {
        Ok(prompt) => prompt,
        Err(e) => {
            error!("Unable to build the analysis prompt: {e:#}");
            return ANALYSIS_FAILED.to_string();
        }
    };
    match assistant.generate(None, &prompt).await {
        Ok(text) if text.trim().is_empty() => ANALYSIS_UNAVAILABLE.to_string(),
        Ok(text) => text,
        Err(e) => {
            error!("The analysis request failed: {e}");
            ANALYSIS_FAILED.to_string()
        }
    }
}
