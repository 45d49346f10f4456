//! Feed transport: the structures a fetched feed is reduced to, and the
//! [`FeedFetcher`] seam sources fetch through.

pub mod http;

pub use http::{HttpFeedFetcher, parse_feed};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid feed URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed returned HTTP {0}")]
    Status(u16),

    #[error("Malformed feed: {0}")]
    Malformed(String),
}

/// A fetched feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub mime_type: Option<String>,
    pub href: String,
}

/// One feed item, reduced to the fields release mapping looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub filename: Option<String>,
    pub magnet_uri: Option<String>,
    pub info_hash: Option<String>,
    pub enclosures: Vec<Enclosure>,
    pub links: Vec<String>,
    /// Raw published date as found in the feed.
    pub published: Option<String>,
}

impl FeedEntry {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    #[must_use]
    pub fn with_magnet(mut self, magnet: impl Into<String>) -> Self {
        self.magnet_uri = Some(magnet.into());
        self
    }

    #[must_use]
    pub fn with_info_hash(mut self, hash: impl Into<String>) -> Self {
        self.info_hash = Some(hash.into());
        self
    }

    #[must_use]
    pub fn with_enclosure(mut self, mime_type: Option<&str>, href: impl Into<String>) -> Self {
        self.enclosures.push(Enclosure {
            mime_type: mime_type.map(String::from),
            href: href.into(),
        });
        self
    }

    #[must_use]
    pub fn with_link(mut self, href: impl Into<String>) -> Self {
        self.links.push(href.into());
        self
    }
}

/// Fetches and parses a feed. Implementations report transport problems as
/// errors; they must not panic.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Feed, FeedError>;
}
