//! Session model: asset registry, prompt lineage, and the generation slot
//!
//! A session is an isolated, time-bounded unit of state holding one
//! user's uploaded assets and the ordered history of prompts that
//! produced generations. All interior state sits behind one mutex that
//! is never held across an await, so registry mutations are atomic with
//! respect to concurrent readers and a batch is never observed
//! half-applied.

pub mod store;

pub use store::SessionStore;

use crate::backends::StorageHandle;
use crate::config::{NumberingPolicy, SessionConfig};
use crate::error::{Result, TagcanvasError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// One uploaded file within a session
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// Stored filename, unique within the session
    pub filename: String,
    /// Opaque handle managed by the storage collaborator
    pub handle: StorageHandle,
    /// Symbolic tag, unset until assigned
    pub tag: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Where a lineage prompt came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptSource {
    /// Direct caller input
    #[serde(rename = "original")]
    Original,
    /// Produced by the intent service from feedback
    #[serde(rename = "refined-from-feedback")]
    Refined,
}

/// Append-only record of a prompt that produced a generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEntry {
    pub prompt: String,
    pub source: PromptSource,
    pub at: DateTime<Utc>,
}

/// One entry of a batch tag request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAssignment {
    pub filename: String,
    pub tag: String,
}

/// Individually-reported outcome of one batch entry
#[derive(Debug)]
pub struct TagOutcome {
    pub filename: String,
    pub tag: String,
    /// `None` when the assignment was applied
    pub error: Option<TagcanvasError>,
}

impl TagOutcome {
    pub fn applied(&self) -> bool {
        self.error.is_none()
    }
}

/// Interior session state, guarded by the session mutex
#[derive(Debug)]
struct SessionState {
    /// Assets in upload order; filenames and tags are unique
    assets: Vec<Asset>,
    lineage: Vec<LineageEntry>,
    /// High-water mark for auto-tag numbering under `Continue`
    next_auto_tag: u32,
    /// Single-slot generation lock
    generating: bool,
    /// Tombstone set by deletion; blocks any further slot acquisition
    closed: bool,
    last_activity: DateTime<Utc>,
}

/// An ephemeral session owning uploaded assets and prompt lineage
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl Session {
    /// Create a new session with a fresh unguessable id
    pub fn new(config: SessionConfig) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            config,
            state: Mutex::new(SessionState {
                assets: Vec::new(),
                lineage: Vec::new(),
                next_auto_tag: 1,
                generating: false,
                closed: false,
                last_activity: now,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().expect("session lock poisoned")
    }

    /// Record activity, deferring an idle sweep
    pub fn touch(&self) {
        self.lock().last_activity = Utc::now();
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.lock().last_activity
    }

    /// Register an uploaded asset, untagged or auto-tagged per policy
    ///
    /// Returns the auto-assigned tag when the session's auto-tag policy
    /// is on.
    ///
    /// # Errors
    ///
    /// Returns `TagcanvasError::DuplicateAsset` if the filename is
    /// already registered in this session.
    pub fn add_asset(&self, filename: &str, handle: StorageHandle) -> Result<Option<String>> {
        let mut state = self.lock();
        if state.assets.iter().any(|a| a.filename == filename) {
            return Err(TagcanvasError::DuplicateAsset(filename.to_string()).into());
        }

        let tag = if self.config.auto_tag {
            Some(next_free_auto_tag(&mut state, self.config.numbering))
        } else {
            None
        };

        state.assets.push(Asset {
            filename: filename.to_string(),
            handle,
            tag: tag.clone(),
            uploaded_at: Utc::now(),
        });
        state.last_activity = Utc::now();
        tracing::debug!(session = %self.id, filename, ?tag, "asset registered");
        Ok(tag)
    }

    /// Assign a tag to an asset
    ///
    /// Reassigning a tag over the same filename is allowed and
    /// idempotent; moving a tag held by a different filename is not.
    ///
    /// # Errors
    ///
    /// Returns `TagcanvasError::UnknownAsset` if the filename is absent,
    /// or `TagcanvasError::DuplicateTag` if another filename in the
    /// session already holds the tag.
    pub fn set_tag(&self, filename: &str, tag: &str) -> Result<()> {
        let mut state = self.lock();
        set_tag_locked(&mut state, filename, tag)?;
        state.last_activity = Utc::now();
        Ok(())
    }

    /// Apply a batch of tag assignments, each reported individually
    ///
    /// Entries are applied independently under one lock: a failure on
    /// one does not prevent the others, and a concurrent reader never
    /// observes a half-applied batch.
    pub fn batch_set_tag(&self, assignments: Vec<TagAssignment>) -> Vec<TagOutcome> {
        let mut state = self.lock();
        let outcomes = assignments
            .into_iter()
            .map(|entry| {
                let error = set_tag_locked(&mut state, &entry.filename, &entry.tag).err();
                TagOutcome {
                    filename: entry.filename,
                    tag: entry.tag,
                    error,
                }
            })
            .collect();
        state.last_activity = Utc::now();
        outcomes
    }

    /// Full filename → tag mapping, in upload order
    ///
    /// Untagged assets are included with `None`.
    pub fn list_tags(&self) -> Vec<(String, Option<String>)> {
        self.lock()
            .assets
            .iter()
            .map(|a| (a.filename.clone(), a.tag.clone()))
            .collect()
    }

    /// Look up the asset holding a tag
    pub fn tagged_asset(&self, tag: &str) -> Option<(String, StorageHandle)> {
        self.lock()
            .assets
            .iter()
            .find(|a| a.tag.as_deref() == Some(tag))
            .map(|a| (a.filename.clone(), a.handle.clone()))
    }

    pub fn asset_count(&self) -> usize {
        self.lock().assets.len()
    }

    /// Acquire the session's single generation slot
    ///
    /// The returned guard releases the slot when dropped, on every
    /// return path. There is no queuing: a busy session rejects and the
    /// caller retries.
    ///
    /// # Errors
    ///
    /// Returns `TagcanvasError::SessionBusy` while another generation is
    /// in flight, or `TagcanvasError::SessionNotFound` if the session
    /// has been deleted.
    pub fn begin_generation(self: &Arc<Self>) -> Result<GenerationGuard> {
        let mut state = self.lock();
        if state.closed {
            return Err(TagcanvasError::SessionNotFound(self.id.to_string()).into());
        }
        if state.generating {
            return Err(TagcanvasError::SessionBusy.into());
        }
        state.generating = true;
        state.last_activity = Utc::now();
        tracing::debug!(session = %self.id, "generation slot acquired");
        Ok(GenerationGuard {
            session: Arc::clone(self),
        })
    }

    pub fn is_generating(&self) -> bool {
        self.lock().generating
    }

    /// Append a lineage entry for a successful generation
    pub fn append_lineage(&self, prompt: &str, source: PromptSource) {
        let mut state = self.lock();
        state.lineage.push(LineageEntry {
            prompt: prompt.to_string(),
            source,
            at: Utc::now(),
        });
        state.last_activity = Utc::now();
    }

    /// The most recent prompt that produced a generation
    pub fn last_prompt(&self) -> Option<String> {
        self.lock().lineage.last().map(|e| e.prompt.clone())
    }

    /// Snapshot of the session's prompt lineage
    pub fn lineage(&self) -> Vec<LineageEntry> {
        self.lock().lineage.clone()
    }

    /// Mark the session deleted, blocking further slot acquisition
    ///
    /// # Errors
    ///
    /// Returns `TagcanvasError::SessionBusy` while a generation is in
    /// flight; the caller must retry after it settles rather than tear
    /// state down under it.
    pub(crate) fn close(&self) -> Result<()> {
        let mut state = self.lock();
        if state.generating {
            return Err(TagcanvasError::SessionBusy.into());
        }
        state.closed = true;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Next unused `Image{n}` tag under the session's numbering policy
fn next_free_auto_tag(state: &mut SessionState, policy: NumberingPolicy) -> String {
    let mut n = match policy {
        NumberingPolicy::Continue => state.next_auto_tag,
        NumberingPolicy::Restart => state.assets.len() as u32 + 1,
    };
    loop {
        let candidate = format!("Image{n}");
        let taken = state
            .assets
            .iter()
            .any(|a| a.tag.as_deref() == Some(candidate.as_str()));
        if !taken {
            if policy == NumberingPolicy::Continue {
                state.next_auto_tag = n + 1;
            }
            return candidate;
        }
        n += 1;
    }
}

fn set_tag_locked(
    state: &mut SessionState,
    filename: &str,
    tag: &str,
) -> std::result::Result<(), TagcanvasError> {
    if !state.assets.iter().any(|a| a.filename == filename) {
        return Err(TagcanvasError::UnknownAsset(filename.to_string()));
    }
    if let Some(holder) = state
        .assets
        .iter()
        .find(|a| a.filename != filename && a.tag.as_deref() == Some(tag))
    {
        return Err(TagcanvasError::DuplicateTag {
            tag: tag.to_string(),
            holder: holder.filename.clone(),
        });
    }
    let asset = state
        .assets
        .iter_mut()
        .find(|a| a.filename == filename)
        .expect("presence checked above");
    asset.tag = Some(tag.to_string());
    Ok(())
}

/// RAII guard for the per-session generation slot
///
/// Dropping the guard returns the session to idle, whether the
/// generation succeeded, failed, or timed out.
pub struct GenerationGuard {
    session: Arc<Session>,
}

impl std::fmt::Debug for GenerationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationGuard")
            .field("session", &self.session.id)
            .finish()
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        let mut state = self.session.lock();
        state.generating = false;
        state.last_activity = Utc::now();
        tracing::debug!(session = %self.session.id, "generation slot released");
    }
}
