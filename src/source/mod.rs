//! Content source abstraction layer.
//!
//! This module defines the [`ContentSource`] trait.  A source returns the raw
//! JSON response of some story generator; it does not interpret it, since
//! that is the job of [`crate::extract`].  Concrete implementations live in
//! sub-modules.
//!
//! ## For contributors: adding a new source
//!
//! 1. Create a new file in this directory (e.g. `anthropic.rs`).
//! 2. Define a struct and implement [`ContentSource`] for it.
//! 3. Add `mod anthropic;` below and re-export your struct.
//! 4. Construct an instance in `main.rs` and add it to the `sources` vec.
//!
//! If the new API wraps its answer in a shape the extractor does not know,
//! add the wrapper key to the `[extractor]` config section first.

mod file;
mod openai;

pub use file::FileSource;
pub use openai::{Api, OpenAiSource, StoryPrompt};

use serde_json::Value;

use crate::error::Result;

/// Trait that every content source must implement.
///
/// The orchestrator tries sources in order and uses the first response the
/// extractor can read, so a source only needs to report its own failures.
pub trait ContentSource: Send {
    /// Label used in logs and in the publish report.
    fn name(&self) -> &str;

    /// Fetch one generated story as raw JSON.
    ///
    /// Implementations must not block indefinitely; network sources apply a
    /// timeout and surface it as [`PublishError::Timeout`](crate::error::PublishError::Timeout).
    fn fetch(&self) -> Result<Value>;
}
