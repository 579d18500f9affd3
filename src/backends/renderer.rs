//! Compositing backend collaborator boundary
//!
//! The renderer turns a [`GenerationDirective`] into pixels. The engine
//! treats it as an external service: it hands over the directive, waits
//! under a deadline imposed by the orchestrator, and receives handles to
//! the produced artifacts. The call must be safe for the caller to retry
//! but the engine itself never retries automatically.

use crate::backends::StorageHandle;
use crate::compiler::GenerationDirective;
use crate::error::{Result, TagcanvasError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Artifacts produced by one render call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderOutput {
    /// Handle to the composite image; always produced
    pub image: StorageHandle,
    /// Handle to the animated artifact; present only for animated output
    #[serde(default)]
    pub animation: Option<StorageHandle>,
}

/// External compositing backend
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render a directive into artifacts
    async fn render(&self, directive: &GenerationDirective) -> Result<RenderOutput>;
}

/// HTTP adapter for a remote compositing service
///
/// Posts the directive as JSON to `{endpoint}/render` and expects a
/// `{"image": ..., "animation": ...}` body back.
pub struct HttpRenderer {
    client: Client,
    endpoint: String,
}

impl HttpRenderer {
    /// Create a new HTTP renderer adapter
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Base URL of the compositing service
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client initialization fails.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("tagcanvas/0.1.0")
            .build()
            .map_err(|e| TagcanvasError::Collaborator {
                collaborator: "renderer",
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, directive: &GenerationDirective) -> Result<RenderOutput> {
        let url = format!("{}/render", self.endpoint);
        tracing::debug!(%url, layers = directive.layers.len(), "dispatching render");

        let response = self.client.post(&url).json(directive).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TagcanvasError::Collaborator {
                collaborator: "renderer",
                message: format!("render returned {status}: {body}"),
            }
            .into());
        }

        let output: RenderOutput = response.json().await?;
        tracing::info!(
            image = %output.image,
            animated = output.animation.is_some(),
            "render complete"
        );
        Ok(output)
    }
}
