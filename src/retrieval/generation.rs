//! Text generation collaborator: prompt in, text out.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GenerationConfig;
use crate::openai::OpenAiClient;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Failed to initialize text generator: {0}")]
    Init(String),

    #[error("Text generation failed: {0}")]
    Request(String),

    #[error("Text generator returned an empty response")]
    EmptyResponse,
}

pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

/// Chat completions against an OpenAI-compatible endpoint.
pub struct OpenAiChatGenerator {
    client: OpenAiClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

const SYSTEM_PROMPT: &str =
    "You answer questions about the user's documents using only the context you are given.";

impl OpenAiChatGenerator {
    pub fn from_settings(config: &GenerationConfig) -> Result<Self, GenerationError> {
        if config.model.trim().is_empty() {
            return Err(GenerationError::Init("missing generation model name".into()));
        }
        let client = OpenAiClient::from_env(
            &config.base_url,
            &config.api_key_env,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
        .map_err(|e| GenerationError::Init(e.to_string()))?;

        Ok(Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl TextGenerator for OpenAiChatGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let parsed: ChatResponse = self
            .client
            .post_json("chat/completions", &body)
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_fails_init() {
        let config = GenerationConfig {
            api_key_env: "DOCRAG_TEST_UNSET_CHAT_KEY".to_string(),
            ..GenerationConfig::default()
        };
        assert!(matches!(
            OpenAiChatGenerator::from_settings(&config),
            Err(GenerationError::Init(_))
        ));
    }

    #[test]
    fn test_response_shape() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Rent is due monthly."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("Rent is due monthly.")
        );
    }
}
