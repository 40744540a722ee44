//! Library surface of `storyfeed`, shared by the binary and its tests.
//!
//! See `main.rs` for the architecture overview.

pub mod config;
pub mod error;
pub mod extract;
pub mod feed;
pub mod publish;
pub mod slug;
pub mod source;
pub mod timestamp;

pub use error::{PublishError, Result};
