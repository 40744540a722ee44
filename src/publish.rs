//! The publish run: fetch → extract → build item → append.
//!
//! Sources are tried in order; the first one whose response the extractor can
//! read supplies the story.  A failing source is logged and skipped, and only
//! when every source has failed does the run fail, with the last error.
//!
//! ## For contributors
//!
//! Keep this module free of I/O of its own.  Network and disk access belong
//! to the sources and to [`FeedStore`]; that way every failure carries the
//! stage it came from.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PublishError, Result};
use crate::extract::{ExtractedContent, Extractor};
use crate::feed::{FeedItem, FeedStore, Illustration, PostLinks, PostPages};
use crate::slug::slugify;
use crate::source::ContentSource;
use crate::timestamp::PublishTime;

/// Summary of a successful run, printed by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub source: String,
    pub title: String,
    pub slug: String,
    pub post_url: String,
    pub published: String,
    pub image_prompt: String,
    pub image_url: Option<String>,
    /// Path of the post page, when pages are written.
    pub page: Option<String>,
    pub items: usize,
    pub evicted: usize,
}

impl PublishReport {
    /// Markdown block for a CI job summary.
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## New post published\n- **Title:** {}\n- **URL:** {}\n",
            self.title, self.post_url
        );
        if let Some(image) = &self.image_url {
            out.push_str(&format!("- **Image:** {image}\n"));
        }
        out.push('\n');
        out
    }
}

pub struct Publisher {
    sources: Vec<Box<dyn ContentSource>>,
    extractor: Extractor,
    pages: Option<PostPages>,
}

impl Publisher {
    pub fn new(sources: Vec<Box<dyn ContentSource>>, extractor: Extractor) -> Self {
        Self {
            sources,
            extractor,
            pages: None,
        }
    }

    /// Also write a standalone page for each published post.
    pub fn with_pages(mut self, pages: PostPages) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Fetch from each source in turn until one yields extractable content.
    ///
    /// Returns the winning source's name alongside the content.
    pub fn obtain(&self) -> Result<(String, ExtractedContent)> {
        let mut last_err = None;

        for src in &self.sources {
            let attempt = src.fetch().and_then(|value| self.extractor.extract(&value));
            match attempt {
                Ok(content) => {
                    info!(source = src.name(), title = %content.title, "story obtained");
                    return Ok((src.name().to_string(), content));
                }
                Err(e) => {
                    warn!(source = src.name(), stage = e.stage(), error = %e, "content source failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| PublishError::Config("no content sources configured".into())))
    }

    /// Run one full publish against `store`.
    ///
    /// `now` is clamped so the feed's build date never moves backwards.
    /// `image_url`, when given, is embedded under the story and attached as
    /// the item's enclosure.  The post page, if enabled, is written at the
    /// final slug before the feed is touched.
    pub fn publish(
        &self,
        store: &mut FeedStore,
        now: DateTime<Utc>,
        image_url: Option<&str>,
    ) -> Result<PublishReport> {
        let (source, content) = self.obtain()?;

        let published = PublishTime::not_before(now, store.last_build());
        let mut item = build_item(&content, store.links(), published.clone(), image_url);
        item.validate()?;
        store.claim_slug(&mut item);

        let page = match &self.pages {
            Some(pages) => Some(pages.write(&item, &content.story_html)?),
            None => None,
        };
        let illustration = item.illustration.as_ref().map(|i| i.url.clone());
        let outcome = store.append(item)?;

        Ok(PublishReport {
            source,
            title: content.title,
            slug: outcome.slug,
            post_url: outcome.link,
            published: published.as_str().to_string(),
            image_prompt: content.image_prompt,
            image_url: illustration,
            page: page.map(|p| p.display().to_string()),
            items: outcome.total,
            evicted: outcome.evicted,
        })
    }
}

/// Turn extracted content into a feed item stamped with `published`.
pub fn build_item(
    content: &ExtractedContent,
    links: &PostLinks,
    published: PublishTime,
    image_url: Option<&str>,
) -> FeedItem {
    let slug = slugify(&content.title);
    let body = render_body(&content.story_html, image_url);
    FeedItem::new(&content.title, &slug, links, published, &body)
        .with_illustration(given(image_url).map(Illustration::new))
}

fn given(url: Option<&str>) -> Option<&str> {
    url.map(str::trim).filter(|u| !u.is_empty())
}

/// The story HTML, followed by the illustration when there is one.
pub fn render_body(story_html: &str, image_url: Option<&str>) -> String {
    match given(image_url) {
        Some(url) => format!(
            "{}<p><img src=\"{}\" alt=\"illustration\"/></p>",
            story_html.trim(),
            html_escape::encode_double_quoted_attribute(url)
        ),
        None => story_html.trim().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
