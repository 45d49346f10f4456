//! Feed sources.
//!
//! Every configured feed becomes a [`SourceAdapter`]. The shipped adapters
//! are all [`FeedSource`]s that differ only in their [`EntryMapper`]: the
//! fetch, cache and refresh-cadence logic is shared by composition.

pub mod showrss;
pub mod torrent;

pub use showrss::ShowRssMapper;
pub use torrent::TorrentMapper;

use crate::config::{Config, SourceConfig, SourceKind};
use crate::domain::SourceRef;
use crate::feed::{Feed, FeedEntry, FeedError, FeedFetcher};
use crate::models::Release;
use crate::parser::{NameParser, NumberingRegistry};
use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub type TorrentSource = FeedSource<TorrentMapper>;
pub type ShowRssSource = FeedSource<ShowRssMapper>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Fetching '{source_name}' failed: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: FeedError,
    },

    #[error("Fetching '{0}' timed out after {1:?}")]
    Timeout(String, Duration),

    #[error("Source '{0}' is misconfigured: {1}")]
    Misconfigured(String, String),
}

/// A feed origin that can produce releases.
///
/// Adapters own their cache and refresh timestamp; only their own
/// [`get_latest`](SourceAdapter::get_latest) call mutates them.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }

    /// True if the source was never fetched or its minimum refresh interval
    /// has elapsed since the last successful fetch.
    fn is_due(&self) -> bool {
        self.is_due_at(Utc::now())
    }

    fn is_due_at(&self, now: DateTime<Utc>) -> bool;

    /// Fetches the feed and maps its entries. Entries that do not map to a
    /// release are dropped; only transport failures are errors.
    async fn fetch_and_parse(&self) -> Result<Vec<Release>, SourceError>;

    /// Returns the cached releases, refreshing them first when due. A failed
    /// refresh leaves the cache untouched.
    async fn get_latest(&mut self) -> Result<Vec<Release>, SourceError>;
}

/// Cache and refresh bookkeeping of one source.
#[derive(Debug, Clone, Default)]
pub struct SourceState {
    latest: Vec<Release>,
    last_fetch: Option<DateTime<Utc>>,
}

impl SourceState {
    #[must_use]
    pub fn latest(&self) -> &[Release] {
        &self.latest
    }

    #[must_use]
    pub const fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.last_fetch
    }

    #[must_use]
    pub fn is_due_at(&self, now: DateTime<Utc>, min_refresh: Duration) -> bool {
        let Some(last) = self.last_fetch else {
            return true;
        };
        let min_refresh = TimeDelta::from_std(min_refresh).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(last) > min_refresh
    }

    fn record(&mut self, releases: Vec<Release>, at: DateTime<Utc>) {
        self.latest = releases;
        self.last_fetch = Some(at);
    }
}

/// Runtime settings of a feed source.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub min_refresh: Duration,
    pub fetch_timeout: Duration,
    /// Position in the configured source list; lower is preferred.
    pub priority: usize,
}

impl SourceSettings {
    #[must_use]
    pub fn from_config(config: &SourceConfig, priority: usize) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            enabled: config.enabled,
            min_refresh: Duration::from_secs(config.min_refresh_secs),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            priority,
        }
    }
}

/// What an [`EntryMapper`] needs besides the entry itself.
pub struct ParseContext<'a> {
    pub parser: &'a dyn NameParser,
    pub source: &'a SourceRef,
    /// Substituted for missing or malformed publish dates.
    pub now: DateTime<Utc>,
}

/// Maps one feed entry to a release, or to nothing.
pub trait EntryMapper: Send + Sync {
    fn map_entry(&self, entry: &FeedEntry, ctx: &ParseContext<'_>) -> Option<Release>;
}

pub struct FeedSource<M> {
    settings: SourceSettings,
    source_ref: SourceRef,
    fetcher: Arc<dyn FeedFetcher>,
    parser: Arc<dyn NameParser>,
    mapper: M,
    state: SourceState,
}

impl<M: EntryMapper> FeedSource<M> {
    #[must_use]
    pub fn new(
        settings: SourceSettings,
        fetcher: Arc<dyn FeedFetcher>,
        parser: Arc<dyn NameParser>,
        mapper: M,
    ) -> Self {
        let source_ref = SourceRef::new(settings.name.clone(), settings.priority);
        Self {
            settings,
            source_ref,
            fetcher,
            parser,
            mapper,
            state: SourceState::default(),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    #[must_use]
    pub const fn state(&self) -> &SourceState {
        &self.state
    }

    /// Maps every entry of `feed`, keeping feed order.
    pub fn map_feed(&self, feed: &Feed, now: DateTime<Utc>) -> Vec<Release> {
        let ctx = ParseContext {
            parser: self.parser.as_ref(),
            source: &self.source_ref,
            now,
        };

        let releases: Vec<Release> = feed
            .entries
            .iter()
            .filter_map(|entry| {
                let release = self.mapper.map_entry(entry, &ctx);
                if release.is_none() {
                    debug!(source = %self.settings.name, title = %entry.title, "Entry not recognised");
                }
                release
            })
            .collect();

        metrics::counter!("showarr_releases_parsed_total", "source" => self.settings.name.clone())
            .increment(releases.len() as u64);

        releases
    }
}

#[async_trait::async_trait]
impl<M: EntryMapper + 'static> SourceAdapter for FeedSource<M> {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        self.state.is_due_at(now, self.settings.min_refresh)
    }

    async fn fetch_and_parse(&self) -> Result<Vec<Release>, SourceError> {
        let timeout = self.settings.fetch_timeout;
        let feed = tokio::time::timeout(timeout, self.fetcher.fetch(&self.settings.url))
            .await
            .map_err(|_| SourceError::Timeout(self.settings.name.clone(), timeout))?
            .map_err(|error| SourceError::Fetch {
                source_name: self.settings.name.clone(),
                error,
            })?;

        Ok(self.map_feed(&feed, Utc::now()))
    }

    async fn get_latest(&mut self) -> Result<Vec<Release>, SourceError> {
        if self.is_due() {
            match self.fetch_and_parse().await {
                Ok(releases) => {
                    info!(
                        event = "source_refreshed",
                        source = %self.settings.name,
                        releases = releases.len(),
                        "Source refreshed"
                    );
                    self.state.record(releases, Utc::now());
                }
                Err(e) => {
                    metrics::counter!("showarr_fetch_failures_total", "source" => self.settings.name.clone())
                        .increment(1);
                    warn!(
                        source = %self.settings.name,
                        error = %e,
                        cached = self.state.latest().len(),
                        "Refresh failed, keeping cached releases"
                    );
                }
            }
        } else {
            debug!(source = %self.settings.name, "Source not due, serving cache");
        }

        Ok(self.state.latest().to_vec())
    }
}

/// Builds the configured sources in priority order.
///
/// # Errors
/// Returns an error if a source names a numbering scheme the registry cannot
/// resolve.
pub fn build_sources(
    config: &Config,
    registry: &NumberingRegistry,
    fetcher: &Arc<dyn FeedFetcher>,
) -> anyhow::Result<Vec<Box<dyn SourceAdapter>>> {
    config
        .sources
        .iter()
        .enumerate()
        .map(|(priority, source)| {
            let parser = registry.parser(source.numbering).with_context(|| {
                format!(
                    "No parser registered for numbering '{}' (source '{}')",
                    source.numbering, source.name
                )
            })?;
            let settings = SourceSettings::from_config(source, priority);
            let fetcher = Arc::clone(fetcher);

            let adapter: Box<dyn SourceAdapter> = match source.kind {
                SourceKind::Torrent => Box::new(TorrentSource::new(
                    settings,
                    fetcher,
                    parser,
                    TorrentMapper,
                )),
                SourceKind::ShowRss => Box::new(ShowRssSource::new(
                    settings,
                    fetcher,
                    parser,
                    ShowRssMapper::default(),
                )),
            };
            Ok(adapter)
        })
        .collect()
}
