//! Implements the `Assistant` trait without any network access.
//!
//! Note: this is compiled even in the "production" version of this app so that the whole program
//! can be run top-to-bottom without a Gemini API key.

use crate::assistant::{Assistant, AssistantError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Answers from a queue of canned replies, then echoes the prompt once the queue is drained.
#[derive(Debug, Clone, Default)]
pub struct TestAssistant {
    replies: Arc<Mutex<VecDeque<String>>>,
    failing: bool,
    calls: Arc<Mutex<Vec<Call>>>,
}

/// One request received by a `TestAssistant`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Call {
    pub system: Option<String>,
    pub contents: String,
}

impl TestAssistant {
    /// Replies with each of `replies` in order.
    pub fn with_replies<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().map(Into::into).collect())),
            ..Self::default()
        }
    }

    /// Fails every request as if the service could not be reached.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// The requests received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Assistant for TestAssistant {
    async fn generate(
        &self,
        system: Option<&str>,
        contents: &str,
    ) -> Result<String, AssistantError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                system: system.map(String::from),
                contents: contents.to_string(),
            });
        }
        if self.failing {
            return Err(AssistantError::Status {
                status: 503,
                message: "test assistant is unavailable".to_string(),
            });
        }
        let queued = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        Ok(queued.unwrap_or_else(|| format!("(test mode) You said: {contents}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_then_echo() {
        let assistant = TestAssistant::with_replies(["first", ""]);
        assert_eq!(assistant.generate(None, "a").await.unwrap(), "first");
        assert_eq!(assistant.generate(None, "b").await.unwrap(), "");
        assert_eq!(
            assistant.generate(Some("ctx"), "c").await.unwrap(),
            "(test mode) You said: c"
        );
        let calls = assistant.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].system.as_deref(), Some("ctx"));
    }

    #[tokio::test]
    async fn test_failing() {
        let assistant = TestAssistant::failing();
        assert!(assistant.generate(None, "hello").await.is_err());
        assert_eq!(assistant.calls().len(), 1);
    }
}
