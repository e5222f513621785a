//! Anthropic API HTTP client for boss commentary.
//!
//! Errors never cross this boundary: every failure mode resolves to a
//! fixed fallback line. No retry, no backoff.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CommentaryConfig;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 64;

/// Returned when the model produces an empty completion
const EMPTY_FALLBACK: &str = "Let's touch base on your performance later.";
/// Returned on any request or API failure, or when no key is configured
const ERROR_FALLBACK: &str = "Back to work, everyone!";

/// LLM client with the boss persona baked in
pub struct CommentaryClient {
    client: Client,
    config: CommentaryConfig,
}

impl CommentaryClient {
    pub fn new(config: CommentaryConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// One snarky line for a game event. Never fails; callers get either
    /// model output or a fallback string.
    pub async fn commentary(&self, event: &str, player_name: &str, score: u32) -> String {
        if !self.config.is_active() {
            return ERROR_FALLBACK.to_string();
        }

        match self.request(event, player_name, score).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => EMPTY_FALLBACK.to_string(),
            Err(e) => {
                warn!("Commentary request failed: {}", e);
                ERROR_FALLBACK.to_string()
            }
        }
    }

    async fn request(&self, event: &str, player_name: &str, score: u32) -> Result<String, String> {
        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: 0.9,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: format!(
                    "Context - Event: {}, Employee: {}, Current Score: {}",
                    event, player_name, score
                ),
            }],
        };

        debug!("Requesting commentary for event '{}'", event);

        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API error: {} - {}", status, body));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))?;

        parsed
            .content
            .first()
            .and_then(|c| match c {
                ContentBlock::Text { text } => Some(text.clone()),
            })
            .ok_or_else(|| "No text content in response".to_string())
    }
}

const SYSTEM_PROMPT: &str = "You are an annoying but funny corporate boss. \
Generate a short, snarky one-sentence comment for a company multiplayer game. \
Use corporate buzzwords like 'synergy', 'paradigm shift', 'low-hanging fruit', \
'circle back', 'as per my last email'. Keep it under 15 words.";

// Anthropic API request/response types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}
