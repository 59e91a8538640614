// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chat-completion client for coaching suggestions.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::config::CompletionConfig;

const PROGRAM_REFINE_PROMPT: &str = "You are a strength coach. Provide a minimal JSON patch suggestion for program edits. Keep existing format.";
const TODAY_ADJUST_PROMPT: &str = "You are a training coach. Provide a minimal JSON update for today's workout. Keep existing format.";

/// What the caller wants help with. Picks the system prompt and which
/// document is sent as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Suggest edits to the stored training program
    ProgramRefine,
    /// Adjust today's workout
    TodayAdjust,
}

impl CompletionMode {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            CompletionMode::ProgramRefine => PROGRAM_REFINE_PROMPT,
            CompletionMode::TodayAdjust => TODAY_ADJUST_PROMPT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion request failed: {0}")]
    Request(String),

    #[error("completion service returned HTTP {status}")]
    Upstream { status: u16, body: String },

    #[error("completion response was invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct CompletionClient {
    api_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    http: Client,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CompletionError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: config.timeout,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask for a suggestion. Returns the first choice's text, or an empty
    /// string when the service answered without one.
    pub async fn complete(
        &self,
        mode: CompletionMode,
        prompt: &str,
        context: Option<&Value>,
    ) -> Result<String, CompletionError> {
        let context = serde_json::to_string_pretty(context.unwrap_or(&Value::Null))
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": mode.system_prompt() },
                { "role": "user", "content": format!("{prompt}\n\nContext:\n{context}") },
            ],
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default())
    }

    fn classify(&self, e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.timeout)
        } else {
            CompletionError::Request(e.to_string())
        }
    }
}
