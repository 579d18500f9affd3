//! Tag extraction and resolution for prompt text.
//!
//! Prompts reference session assets with an `@tag` syntax. This module
//! finds those references in occurrence order and binds them against the
//! session's asset registry.
//!
//! # Tag Syntax
//!
//! A tag token is `@` followed by one or more word characters (letters,
//! digits, underscore): `@BG`, `@logo`, `@product_2`. A tag referenced
//! twice yields two tokens, because compilation may assign each
//! occurrence a distinct role.

use crate::backends::StorageHandle;
use crate::error::{Result, TagcanvasError};
use crate::session::Session;
use regex::Regex;
use std::sync::OnceLock;

/// A tag token found in prompt text, with its byte span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOccurrence {
    /// The tag name without the leading `@`
    pub tag: String,
    /// Byte range of the whole `@tag` token within the prompt
    pub span: (usize, usize),
}

/// A resolved pairing of a tag reference and a concrete session asset
///
/// Produced transiently per prompt; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TagBinding {
    pub tag: String,
    /// Stored filename of the asset within the session
    pub filename: String,
    /// Storage handle the renderer fetches bytes through
    pub handle: StorageHandle,
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@(\w+)").expect("static tag pattern"))
}

/// Find every `@tag` token in the prompt, in occurrence order
///
/// Duplicates are preserved. Returns an empty vector rather than an
/// error; [`extract_tags`] applies the at-least-one rule.
pub fn tag_occurrences(prompt: &str) -> Vec<TagOccurrence> {
    tag_pattern()
        .captures_iter(prompt)
        .map(|caps| {
            let whole = caps.get(0).expect("capture 0");
            TagOccurrence {
                tag: caps[1].to_string(),
                span: (whole.start(), whole.end()),
            }
        })
        .collect()
}

/// Extract `@tag` tokens from a prompt, in occurrence order
///
/// # Errors
///
/// Returns `TagcanvasError::NoTagsFound` if the prompt contains no
/// tag references — generation requires at least one grounded asset.
///
/// # Examples
///
/// ```
/// use tagcanvas::resolver::extract_tags;
///
/// let tags = extract_tags("Set @BG as background and @logo as front").unwrap();
/// assert_eq!(tags, vec!["BG".to_string(), "logo".to_string()]);
/// ```
pub fn extract_tags(prompt: &str) -> Result<Vec<String>> {
    let tags: Vec<String> = tag_occurrences(prompt).into_iter().map(|o| o.tag).collect();
    if tags.is_empty() {
        return Err(TagcanvasError::NoTagsFound.into());
    }
    Ok(tags)
}

/// Resolve tag tokens against a session's asset registry
///
/// Resolution is all-or-nothing: the first token whose tag is not held
/// by any asset fails the whole call, and no directive is compiled from
/// a partially resolved prompt.
///
/// # Errors
///
/// Returns `TagcanvasError::UnresolvedTag` naming the first token that
/// does not match a tagged asset.
pub fn resolve(session: &Session, tokens: &[String]) -> Result<Vec<TagBinding>> {
    let mut bindings = Vec::with_capacity(tokens.len());
    for token in tokens {
        let (filename, handle) = session
            .tagged_asset(token)
            .ok_or_else(|| TagcanvasError::UnresolvedTag(token.clone()))?;
        bindings.push(TagBinding {
            tag: token.clone(),
            filename,
            handle,
        });
    }
    Ok(bindings)
}
