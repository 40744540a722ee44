//! Runtime configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. built-in defaults ([`Config::default`]);
//! 2. a TOML file (`--config`, `$STORYFEED_CONFIG`, or `./storyfeed.toml`);
//! 3. environment variables (see [`Config::apply_env`]).
//!
//! Command-line flags are applied on top of that by `main`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PublishError, Result};
use crate::feed::{ChannelMeta, PostLinks, PostPages, StoreSettings};

pub const ENV_CONFIG_PATH: &str = "STORYFEED_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "storyfeed.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub extractor: ExtractorConfig,
    pub provider: ProviderConfig,
}

/// Where the feed lives and what its channel says about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub path: PathBuf,
    /// Oldest items are evicted beyond this count.
    pub max_items: usize,
    /// Public URL the site is served from; post links are built under it.
    pub base_url: String,
    pub title: String,
    pub description: String,
    /// Channel `<link>`; defaults to `<base_url>/`.
    pub link: Option<String>,
    /// Where post pages are written; defaults to `posts/` next to the feed.
    pub posts_dir: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("docs/feed.xml"),
            max_items: 99,
            base_url: "https://example.com/story-feed".into(),
            title: "Your Automated Stories".into(),
            description: "Auto-generated stories".into(),
            link: None,
            posts_dir: None,
        }
    }
}

impl FeedConfig {
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            max_items: self.max_items,
            meta: self.channel_meta(),
            links: PostLinks::new(&self.base_url),
        }
    }

    pub fn posts_dir(&self) -> PathBuf {
        match &self.posts_dir {
            Some(dir) => dir.clone(),
            None => self
                .path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join("posts"),
        }
    }

    pub fn post_pages(&self) -> PostPages {
        PostPages::new(self.posts_dir(), &self.base_url)
    }

    pub fn channel_meta(&self) -> ChannelMeta {
        ChannelMeta {
            title: self.title.trim().to_string(),
            link: self
                .link
                .clone()
                .unwrap_or_else(|| format!("{}/", self.base_url.trim_end_matches('/'))),
            description: self.description.trim().to_string(),
        }
    }
}

/// Wrapper keys the content extractor looks under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Keys whose value is a mapping that may hold the content.
    pub object_keys: Vec<String>,
    /// Keys whose value is a list of candidate elements.
    pub list_keys: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            object_keys: vec!["output".into(), "message".into()],
            list_keys: vec!["output".into(), "content".into(), "choices".into()],
        }
    }
}

/// The upstream content-generation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_base: String,
    pub model: String,
    /// Usually supplied through `OPENAI_API_KEY` rather than the file.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub topic: String,
    pub min_words: u32,
    pub max_words: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".into(),
            model: "gpt-5".into(),
            api_key: None,
            timeout_secs: 120,
            topic: "a horror story in three sentences".into(),
            min_words: 10,
            max_words: 55,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load the file layer (if any) and the environment layer, then validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var(ENV_CONFIG_PATH)
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    let p = PathBuf::from(DEFAULT_CONFIG_PATH);
                    p.exists().then_some(p)
                }),
        };

        let mut config = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PublishError::Config(format!("reading {}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| PublishError::Config(e.to_string()))
    }

    /// Override settings from environment variables.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a closure over a
    /// map.  Unparsable numbers are ignored and keep the previous value.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("OPENAI_API_KEY") {
            self.provider.api_key = Some(v);
        }
        if let Some(v) = non_empty("MODEL") {
            self.provider.model = v;
        }
        if let Some(v) = non_empty("POST_TOPIC") {
            self.provider.topic = v;
        }
        if let Some(v) = non_empty("POST_MIN_WORDS").and_then(|v| v.trim().parse().ok()) {
            self.provider.min_words = v;
        }
        if let Some(v) = non_empty("POST_MAX_WORDS").and_then(|v| v.trim().parse().ok()) {
            self.provider.max_words = v;
        }
        if let Some(v) = non_empty("PUBLIC_BASE_URL") {
            self.feed.base_url = v;
        }
        if let Some(v) = non_empty("MAX_FEED_POSTS").and_then(|v| v.trim().parse().ok()) {
            self.feed.max_items = v;
        }
        if let Some(v) = non_empty("FEED_PATH") {
            self.feed.path = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed.max_items == 0 {
            return Err(PublishError::Config("feed.max_items must be at least 1".into()));
        }
        if self.feed.base_url.trim().is_empty() {
            return Err(PublishError::Config("feed.base_url must not be empty".into()));
        }
        if self.feed.title.trim().is_empty() {
            return Err(PublishError::Config("feed.title must not be empty".into()));
        }
        if self.provider.min_words > self.provider.max_words {
            return Err(PublishError::Config(format!(
                "provider.min_words ({}) exceeds provider.max_words ({})",
                self.provider.min_words, self.provider.max_words
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
