//! Error taxonomy for a single publish attempt.
//!
//! Every variant is terminal: the attempt aborts and the feed on disk stays in
//! its last valid state.  Nothing in the core retries; re-running the binary
//! later is the retry mechanism.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Maximum number of characters of a provider payload kept for diagnostics.
pub const SNIPPET_LEN: usize = 800;

#[derive(Debug, Error)]
pub enum PublishError {
    /// No known response shape matched.
    #[error("no known response shape matched; response starts with: {snippet}")]
    Extraction { snippet: String },

    /// The existing feed document exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The existing feed document could not be parsed.
    #[error("feed document {} is malformed: {source}", path.display())]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    /// The constructed item breaks an invariant.
    #[error("invalid feed item: {0}")]
    Validation(String),

    /// The updated channel could not be serialized.
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: rss::Error,
    },

    /// Writing or renaming the feed document failed.
    #[error("failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The content source answered with an error or an unreadable body.
    #[error("content source {source_name} failed: {message}")]
    Provider {
        source_name: String,
        message: String,
    },

    #[error("content source {source_name} timed out")]
    Timeout { source_name: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PublishError {
    /// Short name of the pipeline stage that failed, for user-facing output.
    pub fn stage(&self) -> &'static str {
        match self {
            PublishError::Extraction { .. } => "extract",
            PublishError::Read { .. } | PublishError::MalformedDocument { .. } => "load",
            PublishError::Validation(_) => "validate",
            PublishError::Encode { .. } | PublishError::Persistence { .. } => "persist",
            PublishError::Provider { .. } | PublishError::Timeout { .. } => "fetch",
            PublishError::Config(_) => "config",
        }
    }
}

/// Why an existing feed document was refused.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Rss(#[from] rss::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    /// The `<rss>` root must hold exactly one `<channel>`.
    #[error("expected exactly one <channel>, found {0}")]
    ChannelCount(usize),
}

/// Truncate `text` to at most [`SNIPPET_LEN`] characters on a char boundary.
pub fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_LEN) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_keeps_short_text() {
        assert_eq!(snippet("abc"), "abc");
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let long = "é".repeat(SNIPPET_LEN + 10);
        let s = snippet(&long);
        assert_eq!(s.chars().count(), SNIPPET_LEN);
    }

    #[test]
    fn stage_names() {
        assert_eq!(PublishError::Validation("x".into()).stage(), "validate");
        assert_eq!(
            PublishError::Extraction { snippet: String::new() }.stage(),
            "extract"
        );
        assert_eq!(
            PublishError::Timeout { source_name: "a".into() }.stage(),
            "fetch"
        );
    }

    #[test]
    fn encode_error_keeps_its_cause() {
        use std::error::Error as _;

        let cause = rss::Channel::read_from(&b"<html/>"[..]).unwrap_err();
        let err = PublishError::Encode {
            path: PathBuf::from("feed.xml"),
            source: cause,
        };
        assert_eq!(err.stage(), "persist");
        assert!(err.source().is_some());
    }

    #[test]
    fn channel_count_message() {
        let err = PublishError::MalformedDocument {
            path: PathBuf::from("feed.xml"),
            source: DocumentError::ChannelCount(2),
        };
        assert_eq!(err.stage(), "load");
        assert!(err.to_string().contains("found 2"), "{err}");
    }
}
