//! Standalone HTML page for each post.
//!
//! Every item's `<link>` points at `<base_url>/posts/<slug>.html`; this
//! module writes that file into the site's posts directory so the link
//! resolves.  Pages are written atomically, like the feed.

use std::io::Write;
use std::path::{Path, PathBuf};

use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::info;

use super::item::FeedItem;
use super::store::write_file_atomically;
use crate::error::{PublishError, Result};

const STYLE: &str = "\
    body { margin: 0; font: 16px/1.65 system-ui, sans-serif; background: #0e0f11; color: #f6f7fb; }
    @media (prefers-color-scheme: light) { body { background: #fff; color: #121317; } }
    header, main { max-width: 900px; margin: 0 auto; padding: 12px 16px; }
    header { display: flex; justify-content: space-between; align-items: center; }
    h1 { font-size: 1.5rem; margin: 0; }
    figure { margin: 0 0 18px 0; border-radius: 16px; overflow: hidden; }
    figure img { width: 100%; height: auto; display: block; }
    footer { margin-top: 28px; opacity: .7; font-size: .95rem; text-align: center; }";

/// Writes post pages under one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPages {
    dir: PathBuf,
    home_url: String,
}

impl PostPages {
    /// `home_url` is where the page's "All stories" link goes.
    pub fn new(dir: impl Into<PathBuf>, home_url: &str) -> Self {
        Self {
            dir: dir.into(),
            home_url: home_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{slug}.html"))
    }

    /// The full page for `item`, with `story_html` as the article.
    pub fn render(&self, item: &FeedItem, story_html: &str) -> String {
        let title = encode_text(&item.title);
        let figure = match &item.illustration {
            Some(image) => format!(
                "<figure><img src=\"{}\" alt=\"illustration for {}\"></figure>\n    ",
                encode_double_quoted_attribute(&image.url),
                encode_double_quoted_attribute(&item.title)
            ),
            None => String::new(),
        };

        format!(
            r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title}</title>
  <style>
{STYLE}
  </style>
</head>
<body>
  <header>
    <h1>{title}</h1>
    <a href="{home}/">All stories</a>
  </header>
  <main>
    {figure}<article>{story}</article>
    <footer><time>{published}</time></footer>
  </main>
</body>
</html>
"#,
            home = encode_double_quoted_attribute(&self.home_url),
            story = story_html.trim(),
            published = item.published.as_str(),
        )
    }

    /// Write the page for `item` at its current slug and return its path.
    pub fn write(&self, item: &FeedItem, story_html: &str) -> Result<PathBuf> {
        let path = self.path_for(&item.slug);
        let html = self.render(item, story_html);

        write_file_atomically(&path, |file| file.write_all(html.as_bytes())).map_err(
            |source| PublishError::Persistence {
                path: path.clone(),
                source,
            },
        )?;

        info!(path = %path.display(), "wrote post page");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
