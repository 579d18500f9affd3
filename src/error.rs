//! Error types for Tagcanvas
//!
//! This module defines all error types used throughout the engine,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Tagcanvas operations
///
/// This enum encompasses all failures the engine can report: caller
/// mistakes (bad tags, unknown assets, unparseable prompts), per-session
/// contention, and failures from the external collaborators (asset
/// storage, the compositing backend, the intent service).
#[derive(Error, Debug)]
pub enum TagcanvasError {
    /// A filename was uploaded twice into the same session
    #[error("Asset '{0}' already exists in this session")]
    DuplicateAsset(String),

    /// A tag operation referenced a filename the session does not hold
    #[error("Asset '{0}' not found in this session")]
    UnknownAsset(String),

    /// A tag is already assigned to another filename in the session
    #[error("Tag '{tag}' is already assigned to '{holder}'")]
    DuplicateTag {
        /// The tag that was requested
        tag: String,
        /// The filename currently holding the tag
        holder: String,
    },

    /// The prompt contains no `@tag` references
    #[error("No @tag references found in prompt")]
    NoTagsFound,

    /// A `@tag` reference does not match any tagged asset in the session
    #[error("No asset is tagged '{0}' in this session")]
    UnresolvedTag(String),

    /// An animated directive needs motion data that cannot be defaulted
    #[error("Ambiguous directive: {0}")]
    AmbiguousDirective(String),

    /// Refinement was requested before any generation succeeded
    #[error("No prior generation to refine in this session")]
    NoPriorGeneration,

    /// A generation or refinement is already in flight for the session
    #[error("Session is busy with another generation")]
    SessionBusy,

    /// The session id is unknown or the session has been deleted
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    /// An external collaborator reported a failure
    #[error("{collaborator} error: {message}")]
    Collaborator {
        /// Which collaborator failed ("storage", "renderer", "intent")
        collaborator: &'static str,
        /// The failure reported by the collaborator
        message: String,
    },

    /// An external collaborator did not answer within its deadline
    #[error("{collaborator} timed out after {seconds}s")]
    CollaboratorTimeout {
        /// Which collaborator timed out ("renderer", "intent")
        collaborator: &'static str,
        /// The configured deadline that elapsed
        seconds: u64,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TagcanvasError {
    /// Whether this failure is a caller mistake that will not succeed on retry
    ///
    /// Input errors leave session state untouched (beyond what batch
    /// operations document) and must be fixed by the caller. Contention
    /// and collaborator errors, by contrast, may succeed when retried.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateAsset(_)
                | Self::UnknownAsset(_)
                | Self::DuplicateTag { .. }
                | Self::NoTagsFound
                | Self::UnresolvedTag(_)
                | Self::AmbiguousDirective(_)
                | Self::NoPriorGeneration
        )
    }
}

/// Result type alias for Tagcanvas operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_asset_display() {
        let error = TagcanvasError::DuplicateAsset("photo.png".to_string());
        assert_eq!(
            error.to_string(),
            "Asset 'photo.png' already exists in this session"
        );
    }

    #[test]
    fn test_duplicate_tag_display() {
        let error = TagcanvasError::DuplicateTag {
            tag: "BG".to_string(),
            holder: "a.png".to_string(),
        };
        assert_eq!(error.to_string(), "Tag 'BG' is already assigned to 'a.png'");
    }

    #[test]
    fn test_unresolved_tag_display() {
        let error = TagcanvasError::UnresolvedTag("missing".to_string());
        assert_eq!(
            error.to_string(),
            "No asset is tagged 'missing' in this session"
        );
    }

    #[test]
    fn test_collaborator_error_display() {
        let error = TagcanvasError::Collaborator {
            collaborator: "renderer",
            message: "connection refused".to_string(),
        };
        assert_eq!(error.to_string(), "renderer error: connection refused");
    }

    #[test]
    fn test_collaborator_timeout_display() {
        let error = TagcanvasError::CollaboratorTimeout {
            collaborator: "intent",
            seconds: 30,
        };
        assert_eq!(error.to_string(), "intent timed out after 30s");
    }

    #[test]
    fn test_session_busy_display() {
        let error = TagcanvasError::SessionBusy;
        assert_eq!(error.to_string(), "Session is busy with another generation");
    }

    #[test]
    fn test_input_error_classification() {
        assert!(TagcanvasError::NoTagsFound.is_input_error());
        assert!(TagcanvasError::NoPriorGeneration.is_input_error());
        assert!(TagcanvasError::UnknownAsset("x.png".into()).is_input_error());
        assert!(!TagcanvasError::SessionBusy.is_input_error());
        assert!(!TagcanvasError::Collaborator {
            collaborator: "storage",
            message: "boom".into()
        }
        .is_input_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: TagcanvasError = io_error.into();
        assert!(matches!(error, TagcanvasError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{bad json}").unwrap_err();
        let error: TagcanvasError = json_error.into();
        assert!(matches!(error, TagcanvasError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TagcanvasError>();
    }
}
