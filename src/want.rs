//! Which releases the user wants.

use crate::config::ShowConfig;
use crate::domain::ShowId;
use crate::models::Release;
use crate::quality::Quality;
use std::collections::HashMap;

/// Predicate deciding whether a release is wanted.
pub trait WantList: Send + Sync {
    fn is_wanted(&self, release: &Release) -> bool;
}

impl<F> WantList for F
where
    F: Fn(&Release) -> bool + Send + Sync,
{
    fn is_wanted(&self, release: &Release) -> bool {
        self(release)
    }
}

#[derive(Debug, Clone)]
struct Subscription {
    /// Empty means any quality.
    qualities: Vec<Quality>,
}

/// Wants releases of monitored shows, restricted to each show's accepted
/// qualities when it lists any.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionList {
    shows: HashMap<ShowId, Subscription>,
}

impl SubscriptionList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to every monitored show. Unrecognised quality names are
    /// skipped here; `Config::validate` reports them.
    #[must_use]
    pub fn from_config(shows: &[ShowConfig]) -> Self {
        let mut list = Self::new();
        for show in shows.iter().filter(|s| s.monitored) {
            let qualities = show
                .qualities
                .iter()
                .filter_map(|q| q.parse::<Quality>().ok())
                .collect();
            list.subscribe(ShowId::new(show.id), qualities);
        }
        list
    }

    pub fn subscribe(&mut self, show: ShowId, qualities: Vec<Quality>) {
        self.shows.insert(show, Subscription { qualities });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }
}

impl WantList for SubscriptionList {
    fn is_wanted(&self, release: &Release) -> bool {
        release.episodes().iter().any(|episode| {
            self.shows.get(&episode.show).is_some_and(|sub| {
                sub.qualities.is_empty() || sub.qualities.contains(&release.quality)
            })
        })
    }
}
