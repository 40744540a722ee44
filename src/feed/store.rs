//! Load, grow, and atomically persist the feed document.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use rss::{Channel, ChannelBuilder};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::item::{identifier, FeedItem, PostLinks};
use super::ChannelMeta;
use crate::error::{DocumentError, PublishError, Result};
use crate::slug::disambiguate;
use crate::timestamp::{parse_rfc822, PublishTime};

const GENERATOR: &str = concat!("storyfeed ", env!("CARGO_PKG_VERSION"));

/// Everything the store needs besides the file location.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Items beyond this count are evicted, oldest first.  Treated as at
    /// least 1.
    pub max_items: usize,
    pub meta: ChannelMeta,
    pub links: PostLinks,
}

/// What [`FeedStore::append`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Final slug, after collision handling.
    pub slug: String,
    pub link: String,
    /// Number of old items dropped to stay within the bound.
    pub evicted: usize,
    /// Item count after the append.
    pub total: usize,
}

pub struct FeedStore {
    path: PathBuf,
    settings: StoreSettings,
    channel: Channel,
}

impl FeedStore {
    /// Load the feed at `path`, or start an empty one if the file is absent.
    ///
    /// A file that exists but does not parse is an error; it is never
    /// replaced, since that would throw away everything published so far.
    /// Nothing is written until the first [`append`](Self::append).
    pub fn open(path: impl Into<PathBuf>, settings: StoreSettings) -> Result<Self> {
        let path = path.into();

        let channel = match fs::read(&path) {
            Ok(bytes) => {
                parse_channel(&bytes).map_err(|source| PublishError::MalformedDocument {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no feed yet, starting empty");
                empty_channel(&settings.meta)
            }
            Err(source) => return Err(PublishError::Read { path, source }),
        };

        debug!(path = %path.display(), items = channel.items().len(), "feed loaded");
        Ok(Self {
            path,
            settings,
            channel,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn items(&self) -> &[rss::Item] {
        self.channel.items()
    }

    pub fn len(&self) -> usize {
        self.channel.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.items().is_empty()
    }

    pub fn links(&self) -> &PostLinks {
        &self.settings.links
    }

    /// The channel's `<lastBuildDate>`, if present and parseable.
    pub fn last_build(&self) -> Option<DateTime<Utc>> {
        self.channel.last_build_date().and_then(parse_rfc822)
    }

    /// Validate, de-duplicate, append, bound, and persist `item`.
    ///
    /// An item stamped earlier than the current build date is restamped
    /// with that date, so `<lastBuildDate>` never moves backwards.
    ///
    /// On any error the file on disk and this store's in-memory state are
    /// both left as they were before the call.
    pub fn append(&mut self, mut item: FeedItem) -> Result<AppendOutcome> {
        item.validate()?;
        self.claim_slug(&mut item);

        let stamped = PublishTime::not_before(item.published.instant(), self.last_build());
        if stamped != item.published {
            debug!(from = item.published.as_str(), to = stamped.as_str(), "restamped item");
            item.published = stamped;
        }

        let mut next = self.channel.clone();
        let mut items = next.items().to_vec();
        items.push(item.to_rss());

        let max = self.settings.max_items.max(1);
        let evicted = items.len().saturating_sub(max);
        items.drain(..evicted);
        let total = items.len();

        next.set_items(items);
        next.set_last_build_date(item.published.as_str().to_string());

        self.persist(&next)?;
        self.channel = next;

        if evicted > 0 {
            info!(evicted, max, "evicted oldest feed items");
        }
        info!(link = %item.link, total, path = %self.path.display(), "appended feed item");

        Ok(AppendOutcome {
            slug: item.slug,
            link: item.link,
            evicted,
            total,
        })
    }

    /// Suffix the slug with `-2`, `-3`, ... until the link is unused.
    ///
    /// [`append`](Self::append) does this itself; call it beforehand when
    /// the final slug is needed earlier, e.g. to name the post page.
    pub fn claim_slug(&self, item: &mut FeedItem) {
        let taken: HashSet<&str> = self
            .channel
            .items()
            .iter()
            .flat_map(|i| [identifier(i), i.link()])
            .flatten()
            .collect();

        if !taken.contains(item.link.as_str()) {
            return;
        }

        let base = item.slug.clone();
        let mut n = 2;
        loop {
            let candidate = disambiguate(&base, n);
            if !taken.contains(self.settings.links.url_for(&candidate).as_str()) {
                debug!(from = %base, to = %candidate, "slug collision");
                item.relink(candidate, &self.settings.links);
                return;
            }
            n += 1;
        }
    }

    fn persist(&self, channel: &Channel) -> Result<()> {
        let xml = channel
            .write_to(Vec::new())
            .map_err(|source| PublishError::Encode {
                path: self.path.clone(),
                source,
            })?;
        self.write_atomically(|file| file.write_all(&xml))
    }

    fn write_atomically<F>(&self, fill: F) -> Result<()>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        write_file_atomically(&self.path, fill).map_err(|e| self.persistence_error(e))
    }

    fn persistence_error(&self, source: io::Error) -> PublishError {
        PublishError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

/// Write through a temp file in the target directory, then rename it over
/// `path`.  Readers see either the old file or the new one.
pub(super) fn write_file_atomically<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    fill(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    if let Some(perms) = target_permissions(path)? {
        tmp.as_file().set_permissions(perms)?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Keep the existing file's mode; new files are world-readable since they
/// are usually served as static files.
fn target_permissions(path: &Path) -> io::Result<Option<fs::Permissions>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.permissions())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(default_permissions()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

fn parse_channel(bytes: &[u8]) -> std::result::Result<Channel, DocumentError> {
    let channel = Channel::read_from(bytes)?;
    // The parser keeps only the last <channel>; refuse rather than drop the others.
    match count_channels(bytes)? {
        1 => Ok(channel),
        n => Err(DocumentError::ChannelCount(n)),
    }
}

/// Count `<channel>` elements directly under the root element.
fn count_channels(bytes: &[u8]) -> std::result::Result<usize, quick_xml::Error> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut channels = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if depth == 1 && e.local_name().as_ref() == b"channel" {
                    channels += 1;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 1 && e.local_name().as_ref() == b"channel" {
                    channels += 1;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(channels)
}

fn empty_channel(meta: &ChannelMeta) -> Channel {
    ChannelBuilder::default()
        .title(meta.title.clone())
        .link(meta.link.clone())
        .description(meta.description.clone())
        .generator(GENERATOR.to_string())
        .build()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
