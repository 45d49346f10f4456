use crate::constants::torrent::MAGNET_PREFIX;
use crate::domain::{EpisodeRef, SourceRef};
use crate::quality::Quality;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A feed entry that was recognised as one or more episodes and carries at
/// least one retrieval URL.
///
/// Built only through [`Release::new`], which refuses to produce a release
/// without URLs or without episodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Release {
    urls: Vec<String>,

    episodes: Vec<EpisodeRef>,

    pub name: String,

    pub quality: Quality,

    pub published: DateTime<Utc>,

    pub source: SourceRef,
}

impl Release {
    /// Builds a release, deduplicating URLs and episodes while keeping their
    /// first-seen order.
    ///
    /// Returns `None` when no URL or no episode remains.
    #[must_use]
    pub fn new(
        urls: impl IntoIterator<Item = String>,
        episodes: impl IntoIterator<Item = EpisodeRef>,
        name: impl Into<String>,
        quality: Quality,
        published: DateTime<Utc>,
        source: SourceRef,
    ) -> Option<Self> {
        let mut unique_urls: Vec<String> = Vec::new();
        for url in urls {
            let url = url.trim();
            if !url.is_empty() && !unique_urls.iter().any(|u| u == url) {
                unique_urls.push(url.to_string());
            }
        }

        let mut unique_episodes: Vec<EpisodeRef> = Vec::new();
        for episode in episodes {
            if !unique_episodes.contains(&episode) {
                unique_episodes.push(episode);
            }
        }

        if unique_urls.is_empty() || unique_episodes.is_empty() {
            return None;
        }

        Some(Self {
            urls: unique_urls,
            episodes: unique_episodes,
            name: name.into(),
            quality,
            published,
            source,
        })
    }

    #[must_use]
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    #[must_use]
    pub fn episodes(&self) -> &[EpisodeRef] {
        &self.episodes
    }

    /// The URL handed to a download client: the first magnet link if any,
    /// otherwise the first URL collected.
    #[must_use]
    pub fn preferred_url(&self) -> &str {
        self.urls
            .iter()
            .find(|u| u.starts_with(MAGNET_PREFIX))
            .or_else(|| self.urls.first())
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn is_multi_episode(&self) -> bool {
        self.episodes.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ShowId;

    fn ep(n: u32) -> EpisodeRef {
        EpisodeRef::new(ShowId::new(1), 1, n)
    }

    fn source() -> SourceRef {
        SourceRef::new("test", 0)
    }

    #[test]
    fn test_no_urls_no_release() {
        let release = Release::new(
            Vec::new(),
            vec![ep(1)],
            "Show S01E01",
            Quality::Hd720p,
            Utc::now(),
            source(),
        );
        assert!(release.is_none());

        let blank = Release::new(
            vec!["  ".to_string()],
            vec![ep(1)],
            "Show S01E01",
            Quality::Hd720p,
            Utc::now(),
            source(),
        );
        assert!(blank.is_none());
    }

    #[test]
    fn test_no_episodes_no_release() {
        let release = Release::new(
            vec!["magnet:?xt=urn:btih:abc".to_string()],
            Vec::new(),
            "Show",
            Quality::Unknown,
            Utc::now(),
            source(),
        );
        assert!(release.is_none());
    }

    #[test]
    fn test_urls_deduplicated_in_order() {
        let release = Release::new(
            vec![
                "http://a/x.torrent".to_string(),
                "magnet:?xt=urn:btih:abc".to_string(),
                "http://a/x.torrent".to_string(),
            ],
            vec![ep(1), ep(2), ep(1)],
            "Show S01E01E02",
            Quality::Hd1080p,
            Utc::now(),
            source(),
        )
        .unwrap();

        assert_eq!(release.urls().len(), 2);
        assert_eq!(release.urls()[0], "http://a/x.torrent");
        assert_eq!(release.episodes(), &[ep(1), ep(2)]);
        assert!(release.is_multi_episode());
    }

    #[test]
    fn test_preferred_url_is_magnet() {
        let release = Release::new(
            vec![
                "http://a/x.torrent".to_string(),
                "magnet:?xt=urn:btih:abc".to_string(),
            ],
            vec![ep(1)],
            "Show S01E01",
            Quality::Hd1080p,
            Utc::now(),
            source(),
        )
        .unwrap();
        assert_eq!(release.preferred_url(), "magnet:?xt=urn:btih:abc");
    }
}
