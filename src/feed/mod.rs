//! The persisted RSS feed.
//!
//! [`FeedStore`] owns the on-disk document and is the only code that writes
//! it; everything else hands it [`FeedItem`] values.
//!
//! Items are kept in insertion order, oldest first: a new item goes to the
//! end of the channel and eviction removes from the front.

mod item;
mod page;
mod store;

pub use item::{identifier, FeedItem, Illustration, PostLinks};
pub use page::PostPages;
pub use store::{AppendOutcome, FeedStore, StoreSettings};

/// Channel metadata written when a feed is first created.
///
/// Once a feed exists on disk its own metadata wins; these values are never
/// re-applied to an existing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMeta {
    pub title: String,
    pub link: String,
    pub description: String,
}
