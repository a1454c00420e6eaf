// Claude API client using reqwest-eventsource.
//
// Sends messages to the Anthropic Messages API with `stream: true`, folds the
// Server-Sent Events into a single `Completion`, and exposes the four oracle
// operations on top of it.

use async_trait::async_trait;
use futures_util::StreamExt;
use quill_core::profile::{RawStyleProfile, StyleProfile};
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::oracle::{CitationDraft, Oracle, OracleError};
use crate::{parse, prompt};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Model and per-operation token limits (the `[llm]` config table).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmSettings {
    pub model: String,
    pub keywords_max_tokens: u32,
    pub citations_max_tokens: u32,
    pub analysis_max_tokens: u32,
    pub sample_max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        LlmSettings {
            model: "claude-sonnet-4-5-20250929".to_string(),
            keywords_max_tokens: 100,
            citations_max_tokens: 800,
            analysis_max_tokens: 1000,
            sample_max_tokens: 400,
        }
    }
}

// ---------------------------------------------------------------------------
// ClaudeClient
// ---------------------------------------------------------------------------

/// A finished response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub stop_reason: Option<String>,
}

/// Low-level Claude API streaming client.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl ClaudeClient {
    /// Create a new client with the given API key and model identifier.
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            api_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (a local mock in tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one message and collect the streamed reply.
    ///
    /// Returns when `message_stop` arrives or the stream ends. A stream that
    /// produced no text is an `EmptyResponse`; HTTP and transport failures
    /// are `Transport` errors. Exactly one request is made.
    pub async fn complete(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
    ) -> Result<Completion, OracleError> {
        if self.api_key.is_empty() {
            return Err(OracleError::NotConfigured);
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "stream": true,
            "system": system,
            "messages": [{ "role": "user", "content": user_content }]
        });

        let request = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = request.eventsource().map_err(|e| {
            OracleError::Transport(format!("Failed to create event source: {e}"))
        })?;

        let mut completion = Completion::default();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("SSE connection opened");
                }
                Ok(Event::Message(msg)) => match msg.event.as_str() {
                    "message_start" => {
                        match parse_input_tokens(&msg.data) {
                            Some(n) => completion.input_tokens = n,
                            None => warn!("failed to parse input_tokens from message_start"),
                        }
                    }
                    "content_block_delta" => {
                        if let Some(text) = parse_delta_text(&msg.data) {
                            completion.text.push_str(&text);
                        }
                    }
                    "message_delta" => {
                        if let Some(n) = parse_output_tokens(&msg.data) {
                            completion.output_tokens = n;
                        }
                        completion.stop_reason = parse_stop_reason(&msg.data);
                    }
                    "message_stop" => {
                        debug!(
                            input_tokens = completion.input_tokens,
                            output_tokens = completion.output_tokens,
                            "message_stop"
                        );
                        es.close();
                        return finish(completion);
                    }
                    "error" => {
                        es.close();
                        let message = parse_error_message(&msg.data)
                            .unwrap_or_else(|| "API reported an error".to_string());
                        return Err(OracleError::Transport(message));
                    }
                    // Ignore ping, content_block_start, content_block_stop, etc.
                    other => {
                        debug!(event_type = other, "ignoring SSE event");
                    }
                },
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!("SSE stream ended before message_stop");
                    es.close();
                    break;
                }
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    es.close();
                    return Err(OracleError::Transport(extract_error_message(&err)));
                }
            }
        }

        finish(completion)
    }
}

fn finish(completion: Completion) -> Result<Completion, OracleError> {
    if completion.text.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    if completion.stop_reason.as_deref() == Some("max_tokens") {
        warn!("response truncated at the token limit");
    }
    Ok(completion)
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that can be either an active Claude client or disabled.
pub enum LlmClient {
    /// Claude API is configured and ready.
    Active {
        client: ClaudeClient,
        settings: LlmSettings,
    },
    /// LLM functionality is disabled (no API key configured).
    Disabled,
}

impl LlmClient {
    /// Returns `Active` if a non-empty API key is given, otherwise `Disabled`.
    pub fn from_settings(api_key: Option<&str>, settings: &LlmSettings) -> Self {
        match api_key {
            Some(key) if !key.is_empty() => LlmClient::Active {
                client: ClaudeClient::new(key.to_string(), settings.model.clone()),
                settings: settings.clone(),
            },
            _ => LlmClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LlmClient::Active { .. })
    }

    fn active(&self) -> Result<(&ClaudeClient, &LlmSettings), OracleError> {
        match self {
            LlmClient::Active { client, settings } => Ok((client, settings)),
            LlmClient::Disabled => Err(OracleError::NotConfigured),
        }
    }
}

#[async_trait]
impl Oracle for LlmClient {
    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, OracleError> {
        let (client, settings) = self.active()?;
        let completion = client
            .complete(
                prompt::KEYWORDS_SYSTEM,
                &prompt::keywords_prompt(text),
                settings.keywords_max_tokens,
            )
            .await?;
        let keywords = parse::parse_keywords(&completion.text)?;
        debug!(?keywords, "keywords extracted");
        Ok(keywords)
    }

    async fn generate_citations(
        &self,
        excerpt: &str,
        count: usize,
    ) -> Result<Vec<CitationDraft>, OracleError> {
        let (client, settings) = self.active()?;
        let completion = client
            .complete(
                prompt::CITATIONS_SYSTEM,
                &prompt::citations_prompt(excerpt, count),
                settings.citations_max_tokens,
            )
            .await?;
        let drafts = parse::parse_citation_drafts(&completion.text, count)?;
        info!("Generated {} of {} requested citations", drafts.len(), count);
        Ok(drafts)
    }

    async fn analyze_style(&self, sample: &str) -> Result<RawStyleProfile, OracleError> {
        let (client, settings) = self.active()?;
        let completion = client
            .complete(
                prompt::ANALYSIS_SYSTEM,
                &prompt::analysis_prompt(sample),
                settings.analysis_max_tokens,
            )
            .await?;
        parse::parse_style_profile(&completion.text)
    }

    async fn generate_style_sample(&self, profile: &StyleProfile) -> Result<String, OracleError> {
        let (client, settings) = self.active()?;
        let completion = client
            .complete(
                prompt::SAMPLE_SYSTEM,
                &prompt::sample_prompt(profile),
                settings.sample_max_tokens,
            )
            .await?;
        Ok(completion.text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Extract `input_tokens` from a `message_start` event's JSON.
///
/// Expected shape: `{ "type": "message_start", "message": { "usage": { "input_tokens": N } } }`
pub(crate) fn parse_input_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("message")?
        .get("usage")?
        .get("input_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// Extract `delta.text` from a `content_block_delta` event's JSON.
pub(crate) fn parse_delta_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

/// Extract `usage.output_tokens` from a `message_delta` event's JSON.
pub(crate) fn parse_output_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("usage")?
        .get("output_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// Extract `delta.stop_reason` from a `message_delta` event's JSON.
pub(crate) fn parse_stop_reason(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?
        .get("stop_reason")?
        .as_str()
        .map(|s| s.to_string())
}

/// Extract `error.message` from an in-stream `error` event.
pub(crate) fn parse_error_message(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

/// Extract a human-readable error message from an SSE error.
fn extract_error_message(err: &reqwest_eventsource::Error) -> String {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _response) => {
            format!("API returned status {status}")
        }
        reqwest_eventsource::Error::Transport(e) => {
            format!("Network error: {e}")
        }
        other => format!("Stream error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
