//! Picks one release per episode out of everything the sources offered.
//!
//! Releases are indexed by episode, then by quality. Within an
//! `(episode, quality)` slot the first release seen wins, so the order the
//! aggregator produces (source priority, then feed order) is the only
//! tie-breaker. Per episode the highest known quality wins; an episode only
//! available as `Unknown` falls back to that release.

use crate::dispatch::DownloadDispatcher;
use crate::domain::EpisodeRef;
use crate::models::Release;
use crate::quality::Quality;
use crate::want::WantList;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// The winning release of every wanted episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    winners: BTreeMap<EpisodeRef, &'a Release>,
    considered: usize,
    wanted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub failed: usize,
}

/// Resolves `releases`, given in aggregation order, to one winner per
/// episode. `want` is asked exactly once per release.
#[must_use]
pub fn resolve<'a>(releases: &'a [Release], want: &dyn WantList) -> Resolution<'a> {
    let mut index: BTreeMap<EpisodeRef, BTreeMap<Quality, &'a Release>> = BTreeMap::new();
    let mut wanted = 0;

    for release in releases {
        if !want.is_wanted(release) {
            continue;
        }
        wanted += 1;

        for episode in release.episodes() {
            let by_quality = index.entry(*episode).or_default();
            if let Some(existing) = by_quality.get(&release.quality) {
                debug!(
                    episode = %episode,
                    quality = %release.quality,
                    kept = %existing.name,
                    discarded = %release.name,
                    "Same quality already offered"
                );
            } else {
                by_quality.insert(release.quality, release);
            }
        }
    }

    let winners = index
        .into_iter()
        .filter_map(|(episode, by_quality)| select_winner(&by_quality).map(|w| (episode, w)))
        .collect();

    Resolution {
        winners,
        considered: releases.len(),
        wanted,
    }
}

/// Highest known quality, else the `Unknown` entry.
#[must_use]
pub fn select_winner<'a>(by_quality: &BTreeMap<Quality, &'a Release>) -> Option<&'a Release> {
    by_quality
        .iter()
        .rev()
        .find(|(quality, _)| quality.is_known())
        .or_else(|| by_quality.get_key_value(&Quality::Unknown))
        .map(|(_, release)| *release)
}

impl<'a> Resolution<'a> {
    #[must_use]
    pub const fn winners(&self) -> &BTreeMap<EpisodeRef, &'a Release> {
        &self.winners
    }

    #[must_use]
    pub fn winner(&self, episode: &EpisodeRef) -> Option<&'a Release> {
        self.winners.get(episode).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.winners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    /// Number of releases passed to [`resolve`].
    #[must_use]
    pub const fn considered(&self) -> usize {
        self.considered
    }

    /// Number of releases the want-list accepted.
    #[must_use]
    pub const fn wanted(&self) -> usize {
        self.wanted
    }

    /// Hands every winner to `dispatcher`, once per episode and in episode
    /// order. A release winning several episodes is dispatched for each of
    /// them. Failures are logged and do not stop the remaining dispatches.
    pub async fn dispatch(&self, dispatcher: &dyn DownloadDispatcher) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for (episode, release) in &self.winners {
            match dispatcher.dispatch(release).await {
                Ok(()) => {
                    summary.dispatched += 1;
                    metrics::counter!("showarr_dispatches_total", "outcome" => "ok").increment(1);
                    info!(
                        event = "release_dispatched",
                        episode = %episode,
                        release = %release.name,
                        quality = %release.quality,
                        source = %release.source.name,
                        "Dispatched release"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    metrics::counter!("showarr_dispatches_total", "outcome" => "error").increment(1);
                    warn!(
                        episode = %episode,
                        release = %release.name,
                        error = %e,
                        "Dispatch failed"
                    );
                }
            }
        }

        summary
    }
}
