//! Identity types for the release resolution pipeline.
//!
//! Newtypes keep show ids from being mixed with season or episode numbers,
//! and give [`EpisodeRef`] the total order the resolver relies on for
//! deterministic output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, externally assigned series identifier (e.g. a TVDB id).
///
/// # Examples
///
/// ```rust
/// use showarr::domain::ShowId;
///
/// let id = ShowId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ShowId(u32);

impl ShowId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ShowId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

impl From<ShowId> for u32 {
    fn from(id: ShowId) -> Self {
        id.0
    }
}

/// One aired episode of a show, as numbered by the source's numbering scheme.
///
/// Ordered by show, then season, then episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EpisodeRef {
    pub show: ShowId,
    pub season: u32,
    pub episode: u32,
}

impl EpisodeRef {
    #[must_use]
    pub const fn new(show: ShowId, season: u32, episode: u32) -> Self {
        Self {
            show,
            season,
            episode,
        }
    }
}

impl fmt::Display for EpisodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} S{:02}E{:02}",
            self.show, self.season, self.episode
        )
    }
}

/// The configured source a release came from.
///
/// `priority` is the source's position in the configuration; lower values are
/// preferred when two releases have the same quality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceRef {
    pub name: String,
    pub priority: usize,
}

impl SourceRef {
    #[must_use]
    pub fn new(name: impl Into<String>, priority: usize) -> Self {
        Self {
            name: name.into(),
            priority,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_ref_ordering() {
        let a = EpisodeRef::new(ShowId::new(1), 1, 9);
        let b = EpisodeRef::new(ShowId::new(1), 2, 1);
        let c = EpisodeRef::new(ShowId::new(2), 1, 1);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_episode_ref_display() {
        let ep = EpisodeRef::new(ShowId::new(42), 1, 5);
        assert_eq!(ep.to_string(), "42 S01E05");
    }

    #[test]
    fn test_show_id_serde_transparent() {
        let json = serde_json::to_string(&ShowId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: ShowId = serde_json::from_str("7").unwrap();
        assert_eq!(back, ShowId::new(7));
    }
}
