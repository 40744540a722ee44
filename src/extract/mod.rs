//! Content extraction from provider responses.
//!
//! Content sources do not agree on a response schema: the JSON object we ask
//! for may arrive at the top level, wrapped under `output`, inside a list of
//! message segments, or serialised as text inside one of those.  The
//! [`Extractor`] holds an ordered list of [`ShapeMatcher`]s and returns the
//! result of the first one that recognises the response.
//!
//! ## For contributors: supporting a new response shape
//!
//! If the shape is just a new wrapper key, add it to `[extractor]` in the
//! config file; no code change is needed.  For anything else:
//!
//! 1. Write a struct in `shape.rs` and implement [`ShapeMatcher`] for it.
//!    `try_match` must never panic and must return `None` on any mismatch.
//! 2. Register it with [`Extractor::push`] (or in [`Extractor::new`] if it
//!    should always be active).  Earlier matchers win.

mod shape;

pub use shape::{Direct, Nesting, Wrapped, WrappedList};

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::ExtractorConfig;
use crate::error::{snippet, PublishError, Result};

/// Title used when the response does not provide one.
pub const DEFAULT_TITLE: &str = "Automated Story";

/// The three fields a story post is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub story_html: String,
    pub image_prompt: String,
}

/// One way of locating [`ExtractedContent`] inside a response.
pub trait ShapeMatcher: Send + Sync {
    /// Short label used in logs (e.g. `wrapped:output`).
    fn name(&self) -> &str;

    /// Return the content if `response` has this matcher's shape.
    fn try_match(&self, response: &Value) -> Option<ExtractedContent>;
}

/// Runs shape matchers in priority order; first match wins.
pub struct Extractor {
    matchers: Vec<Box<dyn ShapeMatcher>>,
}

impl Extractor {
    /// Build the standard matcher chain from the configured wrapper keys:
    /// the bare object first, then every object wrapper, then every list
    /// wrapper, each group in configuration order.
    pub fn new(config: &ExtractorConfig) -> Self {
        let nesting = Arc::new(Nesting::new(
            config.object_keys.clone(),
            config.list_keys.clone(),
        ));

        let mut matchers: Vec<Box<dyn ShapeMatcher>> = vec![Box::new(Direct)];
        for key in &config.object_keys {
            matchers.push(Box::new(Wrapped::new(key, Arc::clone(&nesting))));
        }
        for key in &config.list_keys {
            matchers.push(Box::new(WrappedList::new(key, Arc::clone(&nesting))));
        }

        Self { matchers }
    }

    /// Append a matcher with the lowest priority.
    pub fn push(&mut self, matcher: Box<dyn ShapeMatcher>) {
        self.matchers.push(matcher);
    }

    pub fn matcher_names(&self) -> Vec<&str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    /// Locate the story content in `response`.
    ///
    /// Fails with [`PublishError::Extraction`] carrying a bounded snippet of
    /// the serialised response when no matcher recognises it.
    pub fn extract(&self, response: &Value) -> Result<ExtractedContent> {
        for matcher in &self.matchers {
            if let Some(content) = matcher.try_match(response) {
                debug!(shape = matcher.name(), title = %content.title, "matched response shape");
                return Ok(content);
            }
        }

        Err(PublishError::Extraction {
            snippet: snippet(&response.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
