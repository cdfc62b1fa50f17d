//! Optional natural-language explanations from a chat-completions service
//!
//! The provider is advisory: callers always hold a template explanation and only
//! substitute the provider's text when it comes back non-empty.

use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::EnrichmentSettings;

/// Minimum gap between two provider calls
pub const MIN_CALL_GAP: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {0}")]
    Status(reqwest::StatusCode),
}

pub type Result<T> = std::result::Result<T, EnrichmentError>;

/// Anything that can turn a system instruction and user context into text
pub trait ExplanationProvider {
    fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Blocks so that successive calls start at least `min_gap` apart
#[derive(Debug)]
pub struct Pacer {
    min_gap: Duration,
    last_call: Option<Instant>,
}

impl Pacer {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_call: None,
        }
    }

    /// Sleep until the gap since the previous call has elapsed, then mark a new call
    pub fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_gap {
                thread::sleep(self.min_gap - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(MIN_CALL_GAP)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client
pub struct ChatCompletionsProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsProvider {
    pub fn new(settings: &EnrichmentSettings, api_key: String, model: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key,
            model,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    /// Build a provider when enrichment is enabled and credentials are present
    ///
    /// Returns `None` when no provider is configured, which is a normal state.
    pub fn from_settings(settings: &EnrichmentSettings) -> Option<Self> {
        if !settings.enabled {
            return None;
        }
        let (api_key, model) = match (settings.api_key(), settings.resolved_model()) {
            (Some(key), Some(model)) => (key, model),
            _ => {
                log::debug!("Enrichment provider not configured");
                return None;
            }
        };

        match Self::new(settings, api_key, model) {
            Ok(provider) => Some(provider),
            Err(e) => {
                log::warn!("Failed to build enrichment client: {}", e);
                None
            }
        }
    }
}

impl ExplanationProvider for ChatCompletionsProvider {
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            return Err(EnrichmentError::Status(response.status()));
        }

        let parsed: ChatResponse = response.json()?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
