//! Intent service collaborator boundary
//!
//! Refinement composes the previous prompt with user feedback. The
//! rewriting itself is delegated to an external intent service, treated
//! as a pure function from the engine's perspective. The bundled adapter
//! talks to an Ollama chat endpoint.

use crate::config::IntentConfig;
use crate::error::{Result, TagcanvasError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// External prompt-rewriting service
#[async_trait]
pub trait IntentService: Send + Sync {
    /// Rewrite the previous prompt under user feedback
    ///
    /// Returns a new prompt string that keeps the original composition
    /// intent (including its `@tag` references) while incorporating the
    /// feedback.
    async fn rewrite(&self, original_prompt: &str, feedback: &str) -> Result<String>;
}

/// Chat request sent to Ollama
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat response from Ollama
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

fn rewrite_instruction(original_prompt: &str, feedback: &str) -> String {
    format!(
        "You are an image composition prompt expert. Rewrite the following \
         composition prompt so it incorporates the user's feedback.\n\n\
         Original Prompt: {original_prompt}\n\
         User Feedback: {feedback}\n\n\
         Keep every @tag reference from the original prompt. Respond with \
         ONLY the rewritten prompt, no explanations."
    )
}

/// Ollama-backed intent service adapter
pub struct OllamaIntent {
    client: Client,
    config: IntentConfig,
}

impl OllamaIntent {
    /// Create a new Ollama intent adapter
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client initialization fails.
    pub fn new(config: IntentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1) * 2))
            .user_agent("tagcanvas/0.1.0")
            .build()
            .map_err(|e| TagcanvasError::Collaborator {
                collaborator: "intent",
                message: format!("failed to create HTTP client: {e}"),
            })?;

        tracing::info!(host = %config.host, model = %config.model, "initialized intent service");
        Ok(Self { client, config })
    }

    /// Strip chat-transcript artifacts the model sometimes echoes back
    fn clean_output(raw: &str) -> String {
        raw.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('>') && !line.starts_with("User:"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl IntentService for OllamaIntent {
    async fn rewrite(&self, original_prompt: &str, feedback: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: rewrite_instruction(original_prompt, feedback),
            }],
            stream: false,
        };

        let url = format!("{}/api/chat", self.config.host);
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TagcanvasError::Collaborator {
                collaborator: "intent",
                message: format!("rewrite returned {status}: {body}"),
            }
            .into());
        }

        let chat: ChatResponse = response.json().await?;
        let rewritten = Self::clean_output(&chat.message.content);
        if rewritten.is_empty() {
            return Err(TagcanvasError::Collaborator {
                collaborator: "intent",
                message: "rewrite produced an empty prompt".to_string(),
            }
            .into());
        }

        tracing::debug!(chars = rewritten.len(), "prompt rewritten");
        Ok(rewritten)
    }
}
