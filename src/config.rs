//! Configuration management for Tagcanvas
//!
//! This module handles loading, parsing, and validating configuration
//! from YAML files, with serde defaults for every field so a partial
//! (or absent) file still yields a working engine.

use crate::error::{Result, TagcanvasError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Tagcanvas
///
/// Holds everything the engine needs: collaborator endpoints and
/// deadlines, session policies, and directive-compilation defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Compositing backend configuration
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Intent service (prompt rewriting) configuration
    #[serde(default)]
    pub intent: IntentConfig,

    /// Session lifecycle and tagging policies
    #[serde(default)]
    pub session: SessionConfig,

    /// Directive compiler defaults
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Compositing backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Base URL of the compositing backend
    #[serde(default = "default_renderer_endpoint")]
    pub endpoint: String,

    /// Deadline for a single render call (seconds)
    #[serde(default = "default_renderer_timeout")]
    pub timeout_seconds: u64,
}

fn default_renderer_endpoint() -> String {
    "http://localhost:7860".to_string()
}

fn default_renderer_timeout() -> u64 {
    60
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            endpoint: default_renderer_endpoint(),
            timeout_seconds: default_renderer_timeout(),
        }
    }
}

/// Intent service configuration
///
/// The intent service rewrites the previous prompt under user feedback.
/// The default adapter talks to a local Ollama server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Intent service host
    #[serde(default = "default_intent_host")]
    pub host: String,

    /// Model used for prompt rewriting
    #[serde(default = "default_intent_model")]
    pub model: String,

    /// Deadline for a single rewrite call (seconds)
    #[serde(default = "default_intent_timeout")]
    pub timeout_seconds: u64,
}

fn default_intent_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_intent_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_intent_timeout() -> u64 {
    30
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            host: default_intent_host(),
            model: default_intent_model(),
            timeout_seconds: default_intent_timeout(),
        }
    }
}

/// Numbering policy for auto-assigned tags
///
/// Uploads receive sequential `Image{n}` tags before the user renames
/// them. After client-side removals the next number either continues
/// from the session's high-water mark or restarts from the live count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingPolicy {
    /// Never reuse a number within a session
    Continue,
    /// Next number is the current asset count plus one
    Restart,
}

/// Session lifecycle and tagging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Assign sequential `Image{n}` tags to uploads automatically
    #[serde(default = "default_auto_tag")]
    pub auto_tag: bool,

    /// How auto-tag numbers behave across the session's lifetime
    #[serde(default = "default_numbering")]
    pub numbering: NumberingPolicy,

    /// Idle age after which a sweep may delete a session (seconds)
    #[serde(default = "default_max_idle")]
    pub max_idle_seconds: u64,
}

fn default_auto_tag() -> bool {
    true
}

fn default_numbering() -> NumberingPolicy {
    NumberingPolicy::Continue
}

fn default_max_idle() -> u64 {
    3600
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_tag: default_auto_tag(),
            numbering: default_numbering(),
            max_idle_seconds: default_max_idle(),
        }
    }
}

/// Directive compiler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Canvas width when the prompt carries no size cue
    #[serde(default = "default_canvas_width")]
    pub default_width: u32,

    /// Canvas height when the prompt carries no size cue
    #[serde(default = "default_canvas_height")]
    pub default_height: u32,

    /// Frames rendered for a motion animation
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,

    /// Per-frame duration for motion animations (milliseconds)
    #[serde(default = "default_motion_frame_ms")]
    pub motion_frame_ms: u32,

    /// Per-frame duration for slideshow animations (milliseconds)
    #[serde(default = "default_slideshow_frame_ms")]
    pub slideshow_frame_ms: u32,
}

fn default_canvas_width() -> u32 {
    1080
}

fn default_canvas_height() -> u32 {
    1080
}

fn default_frame_count() -> u32 {
    10
}

fn default_motion_frame_ms() -> u32 {
    500
}

fn default_slideshow_frame_ms() -> u32 {
    2000
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_width: default_canvas_width(),
            default_height: default_canvas_height(),
            frame_count: default_frame_count(),
            motion_frame_ms: default_motion_frame_ms(),
            slideshow_frame_ms: default_slideshow_frame_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants
    ///
    /// # Errors
    ///
    /// Returns `TagcanvasError::Config` when a field is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.renderer.timeout_seconds == 0 {
            return Err(TagcanvasError::Config(
                "renderer.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }
        if self.intent.timeout_seconds == 0 {
            return Err(TagcanvasError::Config(
                "intent.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }
        if self.compiler.default_width == 0 || self.compiler.default_height == 0 {
            return Err(TagcanvasError::Config(
                "compiler default canvas dimensions must be non-zero".to_string(),
            )
            .into());
        }
        if self.compiler.frame_count < 2 {
            return Err(TagcanvasError::Config(
                "compiler.frame_count must be at least 2".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.renderer.endpoint, "http://localhost:7860");
        assert_eq!(config.intent.host, "http://localhost:11434");
        assert_eq!(config.intent.model, "llama3.2:latest");
        assert_eq!(config.compiler.default_width, 1080);
        assert_eq!(config.compiler.default_height, 1080);
        assert!(config.session.auto_tag);
        assert_eq!(config.session.numbering, NumberingPolicy::Continue);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
renderer:
  endpoint: "http://render:9000"
session:
  auto_tag: false
  numbering: restart
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.renderer.endpoint, "http://render:9000");
        assert_eq!(config.renderer.timeout_seconds, 60);
        assert!(!config.session.auto_tag);
        assert_eq!(config.session.numbering, NumberingPolicy::Restart);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.renderer.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_canvas_rejected() {
        let mut config = Config::default();
        config.compiler.default_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_count_floor() {
        let mut config = Config::default();
        config.compiler.frame_count = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.renderer.endpoint, config.renderer.endpoint);
        assert_eq!(parsed.compiler.frame_count, config.compiler.frame_count);
    }
}
