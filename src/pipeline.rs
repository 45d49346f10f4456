//! One poll of every source, resolved and dispatched.

use crate::aggregator::{Aggregator, SourceReport};
use crate::config::Config;
use crate::constants::intervals::DEFAULT_FETCH_TIMEOUT;
use crate::dispatch::{DownloadDispatcher, LogDispatcher, QBitDispatcher};
use crate::domain::ShowId;
use crate::feed::{FeedFetcher, HttpFeedFetcher};
use crate::parser::{NumberingRegistry, ShowIndex};
use crate::resolver::{DispatchSummary, resolve};
use crate::sources::build_sources;
use crate::want::{SubscriptionList, WantList};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub sources: Vec<SourceReport>,
    pub releases: usize,
    pub wanted: usize,
    pub episodes: usize,
    pub dispatch: DispatchSummary,
    pub duration_ms: u128,
}

pub struct Pipeline {
    aggregator: Aggregator,
    want: Arc<dyn WantList>,
    dispatcher: Arc<dyn DownloadDispatcher>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        aggregator: Aggregator,
        want: Arc<dyn WantList>,
        dispatcher: Arc<dyn DownloadDispatcher>,
    ) -> Self {
        Self {
            aggregator,
            want,
            dispatcher,
        }
    }

    /// Builds the pipeline described by `config`. With `dry_run`, or when
    /// qBittorrent is disabled, winners are only logged.
    ///
    /// # Errors
    /// Returns an error if the HTTP clients cannot be built or a source
    /// cannot be set up.
    pub fn from_config(config: &Config, dry_run: bool) -> anyhow::Result<Self> {
        let fetcher: Arc<dyn FeedFetcher> = Arc::new(HttpFeedFetcher::new(
            feed_client_timeout(config),
            Some(config.general.user_agent.as_str()),
        )?);

        let dispatcher: Arc<dyn DownloadDispatcher> = if config.qbittorrent.enabled && !dry_run {
            Arc::new(QBitDispatcher::from_config(&config.qbittorrent)?)
        } else {
            Arc::new(LogDispatcher)
        };

        Self::with_collaborators(config, fetcher, dispatcher)
    }

    /// Builds the pipeline for `config` around the given feed fetcher and
    /// dispatcher.
    ///
    /// # Errors
    /// Returns an error if a source cannot be set up.
    pub fn with_collaborators(
        config: &Config,
        fetcher: Arc<dyn FeedFetcher>,
        dispatcher: Arc<dyn DownloadDispatcher>,
    ) -> anyhow::Result<Self> {
        let registry = NumberingRegistry::with_defaults(Arc::new(show_index(config)));
        let sources = build_sources(config, &registry, &fetcher)?;
        let want: Arc<dyn WantList> = Arc::new(SubscriptionList::from_config(&config.shows));

        Ok(Self::new(Aggregator::new(sources), want, dispatcher))
    }

    #[must_use]
    pub const fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub async fn run_once(&mut self) -> RunStats {
        let started = Instant::now();

        let aggregated = self.aggregator.collect().await;
        let resolution = resolve(&aggregated.releases, self.want.as_ref());
        let dispatch = resolution.dispatch(self.dispatcher.as_ref()).await;

        let elapsed = started.elapsed();
        metrics::histogram!("showarr_run_duration_seconds").record(elapsed.as_secs_f64());

        let stats = RunStats {
            releases: aggregated.releases.len(),
            wanted: resolution.wanted(),
            episodes: resolution.len(),
            sources: aggregated.reports,
            dispatch,
            duration_ms: elapsed.as_millis(),
        };

        info!(
            event = "run_complete",
            releases = stats.releases,
            wanted = stats.wanted,
            episodes = stats.episodes,
            dispatched = stats.dispatch.dispatched,
            failed = stats.dispatch.failed,
            duration_ms = stats.duration_ms,
            "Run complete"
        );

        stats
    }
}

/// Show lookup table of every configured show, monitored or not, so
/// unmonitored shows still parse and are then filtered by the want-list.
#[must_use]
pub fn show_index(config: &Config) -> ShowIndex {
    let mut index = ShowIndex::new();
    for show in &config.shows {
        let id = ShowId::new(show.id);
        index.insert(id, &show.name);
        for alias in &show.aliases {
            index.insert(id, alias);
        }
    }
    index
}

/// The shared feed client must outlast the slowest source's own timeout.
fn feed_client_timeout(config: &Config) -> Duration {
    config
        .sources
        .iter()
        .map(|source| Duration::from_secs(source.fetch_timeout_secs))
        .max()
        .unwrap_or(DEFAULT_FETCH_TIMEOUT)
        .max(DEFAULT_FETCH_TIMEOUT)
}
