//! Collaborator boundaries for Tagcanvas
//!
//! The engine depends on three external collaborators, each behind a
//! trait: blob storage for uploaded assets and artifacts, the
//! compositing backend that renders directives, and the intent service
//! that rewrites prompts under feedback. Concrete adapters live next to
//! their traits; tests substitute hand-written fakes.

pub mod intent;
pub mod renderer;
pub mod storage;

pub use intent::{IntentService, OllamaIntent};
pub use renderer::{HttpRenderer, RenderOutput, Renderer};
pub use storage::{AssetStore, MemoryAssetStore, StorageHandle};
