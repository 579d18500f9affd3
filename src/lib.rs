//! Tagcanvas - session-scoped tag resolution and prompt compilation
//!
//! This library is the engine behind an image-composition UI: clients
//! upload images into an ephemeral session, assign short symbolic tags,
//! and submit free-form prompts that reference those tags with `@tag`
//! syntax. The engine binds the references to concrete assets, compiles
//! the prompt into a structured generation directive, dispatches it to
//! an external compositing backend, and supports feedback-driven
//! refinement that preserves prompt lineage.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: session model, asset registry, lineage, and the
//!   process-wide session store
//! - `resolver`: `@tag` extraction and all-or-nothing resolution
//! - `compiler`: rule-based translation of prompts into directives
//! - `orchestrator`: per-session serialization and collaborator calls
//! - `backends`: storage, renderer, and intent-service boundaries
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tagcanvas::backends::{HttpRenderer, MemoryAssetStore, OllamaIntent};
//! use tagcanvas::compiler::OutputKind;
//! use tagcanvas::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let orchestrator = Orchestrator::new(
//!         config.clone(),
//!         Arc::new(MemoryAssetStore::new()),
//!         Arc::new(HttpRenderer::new(&config.renderer.endpoint)?),
//!         Arc::new(OllamaIntent::new(config.intent.clone())?),
//!     );
//!
//!     let session = orchestrator.create_session();
//!     let receipt = orchestrator.upload(session, "bg.png", vec![/* bytes */]).await?;
//!     orchestrator.set_tag(session, &receipt.filename, "BG")?;
//!     let generation = orchestrator
//!         .generate(session, "Set @BG as background", OutputKind::Image)
//!         .await?;
//!     println!("image at {}", generation.image);
//!     Ok(())
//! }
//! ```

pub mod backends;
pub mod compiler;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod resolver;
pub mod session;

// Re-export commonly used types
pub use compiler::{GenerationDirective, OutputKind};
pub use config::Config;
pub use error::{Result, TagcanvasError};
pub use orchestrator::{Generation, Orchestrator, UploadReceipt};
pub use resolver::{extract_tags, TagBinding};
pub use session::{LineageEntry, PromptSource, Session, SessionStore};
