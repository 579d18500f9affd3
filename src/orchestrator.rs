//! Generation orchestration
//!
//! The orchestrator owns the session table and the collaborator handles,
//! and drives every inbound operation: session lifecycle, uploads, tag
//! management, generation, and feedback-driven refinement. Per session
//! it enforces a strict `Idle -> Generating -> Idle` state machine with
//! no queuing: a busy session rejects and the caller retries.

use crate::backends::{AssetStore, IntentService, Renderer, StorageHandle};
use crate::compiler::{Compiler, OutputKind};
use crate::config::Config;
use crate::error::{Result, TagcanvasError};
use crate::resolver;
use crate::session::{
    GenerationGuard, PromptSource, Session, SessionStore, TagAssignment, TagOutcome,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of registering one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Collision-resistant stored filename, unique within the session
    pub filename: String,
    /// Tag auto-assigned per the session policy, if any
    pub tag: Option<String>,
}

/// Artifacts of one successful generation or refinement
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// The prompt that was actually rendered (rewritten, for refinements)
    pub prompt: String,
    pub source: PromptSource,
    /// Handle to the composite image; always present
    pub image: StorageHandle,
    /// Handle to the animated artifact, when animation was requested
    pub animation: Option<StorageHandle>,
}

/// Session-scoped generation engine
///
/// One orchestrator serves many independent sessions concurrently; no
/// cross-session locking exists. Collaborator calls are bounded by the
/// configured deadlines and never retried internally.
pub struct Orchestrator {
    config: Config,
    sessions: SessionStore,
    assets: Arc<dyn AssetStore>,
    renderer: Arc<dyn Renderer>,
    intent: Arc<dyn IntentService>,
    compiler: Compiler,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators
    pub fn new(
        config: Config,
        assets: Arc<dyn AssetStore>,
        renderer: Arc<dyn Renderer>,
        intent: Arc<dyn IntentService>,
    ) -> Self {
        let sessions = SessionStore::new(config.session.clone());
        let compiler = Compiler::new(config.compiler.clone());
        Self {
            config,
            sessions,
            assets,
            renderer,
            intent,
            compiler,
        }
    }

    /// Create a new session and return its id
    pub fn create_session(&self) -> Uuid {
        self.sessions.create().id()
    }

    /// Fetch a live session handle
    pub fn session(&self, id: Uuid) -> Result<Arc<Session>> {
        self.sessions.get(id)
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Delete a session and destroy everything it owns
    ///
    /// Fails with `SessionBusy` while a generation is in flight; the
    /// caller retries after it settles. Assets and lineage are destroyed
    /// with the session.
    pub async fn delete_session(&self, id: Uuid) -> Result<()> {
        self.sessions.delete(id)?;
        self.assets.delete_all(id).await?;
        Ok(())
    }

    /// Register an uploaded file with the session
    ///
    /// The stored filename is derived from a fresh UUID plus the
    /// upload's extension, so client-side names can never collide
    /// within a session.
    pub async fn upload(
        &self,
        id: Uuid,
        original_filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt> {
        let session = self.sessions.get(id)?;
        let filename = stored_filename(original_filename);
        let handle = self
            .collaborator_call("storage", self.assets.store(id, &filename, bytes))
            .await?;
        let tag = session.add_asset(&filename, handle)?;
        debug!(session = %id, %filename, ?tag, "upload registered");
        Ok(UploadReceipt { filename, tag })
    }

    /// Assign a tag to an uploaded asset
    pub fn set_tag(&self, id: Uuid, filename: &str, tag: &str) -> Result<()> {
        self.sessions.get(id)?.set_tag(filename, tag)
    }

    /// Apply a batch of tag assignments, each reported individually
    pub fn batch_set_tag(
        &self,
        id: Uuid,
        assignments: Vec<TagAssignment>,
    ) -> Result<Vec<TagOutcome>> {
        Ok(self.sessions.get(id)?.batch_set_tag(assignments))
    }

    /// Full filename → tag mapping; untagged assets appear with `None`
    pub fn list_tags(&self, id: Uuid) -> Result<Vec<(String, Option<String>)>> {
        Ok(self.sessions.get(id)?.list_tags())
    }

    /// Compile and render a prompt against the session's tagged assets
    ///
    /// Rejects with `SessionBusy` while another generation is in flight.
    /// On success the prompt is appended to the session's lineage; a
    /// failed attempt records nothing.
    pub async fn generate(
        &self,
        id: Uuid,
        prompt: &str,
        output: OutputKind,
    ) -> Result<Generation> {
        let session = self.sessions.get(id)?;
        let guard = session.begin_generation()?;
        self.run_generation(&session, guard, prompt.to_string(), output, PromptSource::Original)
            .await
    }

    /// Rewrite the last prompt under feedback and regenerate
    ///
    /// The rewrite is delegated to the intent service; the rewritten
    /// prompt then flows through the identical generation path, tagged
    /// as feedback-derived. The busy-state rule covers the rewrite too.
    ///
    /// # Errors
    ///
    /// Returns `NoPriorGeneration` when the session has no lineage yet.
    pub async fn refine(
        &self,
        id: Uuid,
        feedback: &str,
        output: OutputKind,
    ) -> Result<Generation> {
        let session = self.sessions.get(id)?;
        let guard = session.begin_generation()?;

        let original = session
            .last_prompt()
            .ok_or(TagcanvasError::NoPriorGeneration)?;
        let rewritten = self
            .with_deadline(
                "intent",
                self.config.intent.timeout_seconds,
                self.intent.rewrite(&original, feedback),
            )
            .await?;
        info!(session = %id, "prompt rewritten from feedback");

        self.run_generation(&session, guard, rewritten, output, PromptSource::Refined)
            .await
    }

    /// Sweep sessions idle beyond the configured threshold
    ///
    /// Returns the ids that were removed. Stored blobs are destroyed
    /// best-effort; a storage failure is logged, not surfaced, since the
    /// sweep is housekeeping rather than a caller request.
    pub async fn sweep_idle(&self) -> Vec<Uuid> {
        let swept = self.sessions.sweep_idle(self.config.session.max_idle_seconds);
        let mut ids = Vec::with_capacity(swept.len());
        for session in swept {
            let id = session.id();
            if let Err(error) = self.assets.delete_all(id).await {
                warn!(session = %id, %error, "failed to delete blobs for swept session");
            }
            ids.push(id);
        }
        ids
    }

    /// The shared generate/refine tail: resolve, compile, render, record
    ///
    /// Holds the generation guard for the whole call so the slot is
    /// released on every return path, including collaborator failures.
    async fn run_generation(
        &self,
        session: &Arc<Session>,
        guard: GenerationGuard,
        prompt: String,
        output: OutputKind,
        source: PromptSource,
    ) -> Result<Generation> {
        let tokens = resolver::extract_tags(&prompt)?;
        let bindings = resolver::resolve(session, &tokens)?;
        let directive = self.compiler.compile(&prompt, &bindings, output)?;

        let rendered = self
            .with_deadline(
                "renderer",
                self.config.renderer.timeout_seconds,
                self.renderer.render(&directive),
            )
            .await?;

        session.append_lineage(&prompt, source);
        info!(
            session = %session.id(),
            ?source,
            animated = rendered.animation.is_some(),
            "generation complete"
        );
        drop(guard);

        Ok(Generation {
            prompt,
            source,
            image: rendered.image,
            animation: rendered.animation,
        })
    }

    /// Run a collaborator call under its configured deadline
    ///
    /// A timeout surfaces as `CollaboratorTimeout`; any other failure
    /// that is not already a collaborator error is wrapped so the caller
    /// can always identify the failing collaborator.
    async fn with_deadline<T>(
        &self,
        collaborator: &'static str,
        seconds: u64,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(Duration::from_secs(seconds), call).await {
            Ok(result) => result.map_err(|e| label_collaborator(collaborator, e)),
            Err(_) => Err(TagcanvasError::CollaboratorTimeout {
                collaborator,
                seconds,
            }
            .into()),
        }
    }

    /// Run an unbounded collaborator call, labeling any failure
    async fn collaborator_call<T>(
        &self,
        collaborator: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        call.await.map_err(|e| label_collaborator(collaborator, e))
    }
}

/// Ensure a collaborator failure names its origin
fn label_collaborator(collaborator: &'static str, error: anyhow::Error) -> anyhow::Error {
    match error.downcast_ref::<TagcanvasError>() {
        Some(TagcanvasError::Collaborator { .. })
        | Some(TagcanvasError::CollaboratorTimeout { .. }) => error,
        _ => TagcanvasError::Collaborator {
            collaborator,
            message: error.to_string(),
        }
        .into(),
    }
}

/// Collision-resistant stored filename preserving the upload's extension
fn stored_filename(original: &str) -> String {
    match Path::new(original).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", Uuid::new_v4(), ext),
        _ => Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_filename_keeps_extension() {
        let name = stored_filename("holiday photo.PNG");
        assert!(name.ends_with(".PNG"));
        assert_eq!(name.len(), 36 + 4);
    }

    #[test]
    fn test_stored_filename_without_extension() {
        let name = stored_filename("rawblob");
        assert_eq!(name.len(), 36);
    }

    #[test]
    fn test_stored_filenames_never_collide() {
        assert_ne!(stored_filename("a.png"), stored_filename("a.png"));
    }

    #[test]
    fn test_label_collaborator_preserves_existing_labels() {
        let inner: anyhow::Error = TagcanvasError::CollaboratorTimeout {
            collaborator: "renderer",
            seconds: 5,
        }
        .into();
        let labeled = label_collaborator("renderer", inner);
        assert!(matches!(
            labeled.downcast_ref::<TagcanvasError>(),
            Some(TagcanvasError::CollaboratorTimeout { .. })
        ));
    }

    #[test]
    fn test_label_collaborator_wraps_plain_errors() {
        let labeled = label_collaborator("storage", anyhow::anyhow!("disk gone"));
        match labeled.downcast_ref::<TagcanvasError>() {
            Some(TagcanvasError::Collaborator {
                collaborator,
                message,
            }) => {
                assert_eq!(*collaborator, "storage");
                assert!(message.contains("disk gone"));
            }
            other => panic!("expected Collaborator, got {other:?}"),
        }
    }
}
