//! The entry type appended to the feed.
//!
//! `FeedItem` is built once per publish run by the orchestrator and handed to
//! [`FeedStore::append`](super::FeedStore::append).  After that it only exists
//! as an `<item>` inside the persisted document and is never modified again.
//!
//! ## For contributors
//!
//! If you add a field here, map it in [`FeedItem::to_rss`] as well; the store
//! never looks at anything that is not written into the `<item>`.

use rss::{EnclosureBuilder, GuidBuilder, ItemBuilder};

use crate::error::{PublishError, Result};
use crate::timestamp::PublishTime;

/// Builds post URLs (and therefore item identifiers) from slugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLinks {
    base_url: String,
}

impl PostLinks {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `https://host/site` + `cats` → `https://host/site/posts/cats.html`.
    pub fn url_for(&self, slug: &str) -> String {
        format!("{}/posts/{slug}.html", self.base_url)
    }
}

/// An image attached to a post, written as the item's `<enclosure>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Illustration {
    pub url: String,
    pub mime_type: String,
}

impl Illustration {
    /// The MIME type is guessed from the URL's extension, defaulting to PNG.
    pub fn new(url: &str) -> Self {
        let url = url.trim().to_string();
        let mime_type = mime_for(&url).to_string();
        Self { url, mime_type }
    }
}

fn mime_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or_default();
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "gif" => "image/gif",
        _ => "image/png",
    }
}

/// A single story post, ready to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Headline shown by feed readers.
    pub title: String,

    /// URL-safe identifier the link is derived from.
    pub slug: String,

    /// Post URL; also written as the item's permalink `<guid>`.
    pub link: String,

    /// Shared by `<pubDate>` and the channel's `<lastBuildDate>`.
    pub published: PublishTime,

    /// HTML fragment written as `<description>`.
    pub body: String,

    pub illustration: Option<Illustration>,
}

impl FeedItem {
    pub fn new(
        title: &str,
        slug: &str,
        links: &PostLinks,
        published: PublishTime,
        body: &str,
    ) -> Self {
        Self {
            title: title.trim().to_string(),
            slug: slug.to_string(),
            link: links.url_for(slug),
            published,
            body: body.trim().to_string(),
            illustration: None,
        }
    }

    pub fn with_illustration(mut self, illustration: Option<Illustration>) -> Self {
        self.illustration = illustration;
        self
    }

    /// Replace the slug (and the link derived from it).
    pub fn relink(&mut self, slug: String, links: &PostLinks) {
        self.link = links.url_for(&slug);
        self.slug = slug;
    }

    /// Check the invariants a persisted item must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.title.is_empty() {
            return Err(PublishError::Validation("title is empty".into()));
        }
        if self.body.is_empty() {
            return Err(PublishError::Validation("body is empty".into()));
        }
        if self.slug.is_empty() {
            return Err(PublishError::Validation("slug is empty".into()));
        }
        // The body is written as a CDATA section.
        if self.body.contains("]]>") {
            return Err(PublishError::Validation(
                "body contains a CDATA terminator (\"]]>\")".into(),
            ));
        }
        Ok(())
    }

    pub fn to_rss(&self) -> rss::Item {
        ItemBuilder::default()
            .title(self.title.clone())
            .link(self.link.clone())
            .guid(
                GuidBuilder::default()
                    .permalink(true)
                    .value(self.link.clone())
                    .build(),
            )
            .pub_date(self.published.as_str().to_string())
            .description(self.body.clone())
            .enclosure(self.illustration.as_ref().map(|image| {
                // Length is unknown for a remote image; RSS uses 0 for that.
                EnclosureBuilder::default()
                    .url(image.url.clone())
                    .mime_type(image.mime_type.clone())
                    .length("0".to_string())
                    .build()
            }))
            .build()
    }
}

/// Identifier of an existing `<item>`: its guid, falling back to its link.
pub fn identifier(item: &rss::Item) -> Option<&str> {
    item.guid()
        .map(|g| g.value())
        .or_else(|| item.link())
        .filter(|id| !id.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
