//! Implements the `Assistant` trait with the Gemini `generateContent` REST endpoint.

use crate::assistant::{Assistant, AssistantError};
use crate::config::AssistantSettings;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::time::Duration;
use tracing::{debug, trace};

pub struct GeminiAssistant {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key_env: String,
    api_key: Option<String>,
}

impl Debug for GeminiAssistant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAssistant")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GeminiAssistant {
    /// Reads the API key from the environment variable named in `settings`. A missing key is not
    /// an error here; every request will fail with `AssistantError::MissingApiKey` instead.
    pub fn new(settings: &AssistantSettings) -> Result<Self> {
        let api_key = std::env::var(settings.api_key_env())
            .ok()
            .filter(|k| !k.trim().is_empty());
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs() {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Unable to create the HTTP client")?;
        Ok(Self {
            client,
            base_url: settings.base_url().trim_end_matches('/').to_string(),
            model: settings.model().to_string(),
            api_key_env: settings.api_key_env().to_string(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait::async_trait]
impl Assistant for GeminiAssistant {
    async fn generate(
        &self,
        system: Option<&str>,
        contents: &str,
    ) -> std::result::Result<String, AssistantError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AssistantError::MissingApiKey(self.api_key_env.clone()))?;
        let request = GenerateRequest::new(system, contents);
        debug!("Sending generateContent request to model {}", self.model);
        trace!("{request:?}");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(AssistantError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Decode(e.to_string()))?;
        Ok(body.text())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<Content>,
}

impl GenerateRequest {
    fn new(system: Option<&str>, contents: &str) -> Self {
        Self {
            system_instruction: system.map(|s| SystemInstruction {
                parts: vec![Part::new(s)],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::new(contents)],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl Part {
    fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// The text parts of the first candidate, joined.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Pulls `error.message` out of a Google API error body, falling back to the start of the body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "no response body".to_string()
            } else {
                body.chars().take(500).collect()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest::new(Some("be brief"), "what is my balance?");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "what is my balance?");
    }

    #[test]
    fn test_request_without_system() {
        let value = serde_json::to_value(GenerateRequest::new(None, "hi")).unwrap();
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "You have "}, {"text": "$900."}]}},
                {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text(), "You have $900.");
    }

    #[test]
    fn test_response_without_candidates_is_empty() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid."}}"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message(""), "no response body");
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let settings = AssistantSettings::default()
            .with_api_key_env("RENTPACER_TEST_KEY_THAT_IS_NEVER_SET");
        let assistant = GeminiAssistant::new(&settings).unwrap();
        let err = assistant.generate(None, "hello").await.unwrap_err();
        assert!(matches!(err, AssistantError::MissingApiKey(_)));
    }
}
