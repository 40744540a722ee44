//! A source that replays a saved provider response from disk.
//!
//! Useful for offline runs (`--response-file`) and for checking how a newly
//! observed response shape is handled before touching the live API.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use super::ContentSource;
use crate::error::{snippet, PublishError, Result};

pub struct FileSource {
    path: PathBuf,
    label: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("file:{}", path.display());
        Self { path, label }
    }

    fn error(&self, message: String) -> PublishError {
        PublishError::Provider {
            source_name: self.label.clone(),
            message,
        }
    }
}

impl ContentSource for FileSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn fetch(&self) -> Result<Value> {
        let text = fs::read_to_string(&self.path).map_err(|e| self.error(e.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|e| self.error(format!("invalid JSON ({e}): {}", snippet(&text))))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
