//! Generic torrent feed mapping.

use super::{EntryMapper, ParseContext};
use crate::constants::torrent::{BITTORRENT_MIME, BTIH_MAGNET_PREFIX, MAGNET_PREFIX, TORRENT_SUFFIX};
use crate::feed::FeedEntry;
use crate::models::Release;
use crate::quality::Quality;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Maps torrent feed entries: collects every retrieval URL the entry offers
/// and parses the filename, or the title when there is none.
#[derive(Debug, Clone, Copy, Default)]
pub struct TorrentMapper;

impl TorrentMapper {
    /// Maps `entry` using `title` in place of its title, optionally replacing
    /// an `Unknown` quality. Shared with mappers that rewrite titles.
    pub(crate) fn map_with_title(
        entry: &FeedEntry,
        title: &str,
        fallback_quality: Option<Quality>,
        ctx: &ParseContext<'_>,
    ) -> Option<Release> {
        let urls = collect_urls(entry);
        if urls.is_empty() {
            return None;
        }

        let parsed = match entry.filename.as_deref().filter(|f| !f.trim().is_empty()) {
            Some(filename) => ctx.parser.parse(filename, true),
            None => ctx.parser.parse(title, false),
        };
        let name = parsed.known()?;

        let quality = match fallback_quality {
            Some(fallback) if name.quality == Quality::Unknown => fallback,
            _ => name.quality,
        };

        Release::new(
            urls,
            name.episode_refs(),
            title,
            quality,
            parse_published(entry.published.as_deref(), ctx.now),
            ctx.source.clone(),
        )
    }
}

impl EntryMapper for TorrentMapper {
    fn map_entry(&self, entry: &FeedEntry, ctx: &ParseContext<'_>) -> Option<Release> {
        Self::map_with_title(entry, &entry.title, None, ctx)
    }
}

/// Collects retrieval URLs in discovery order: the magnet field, torrent
/// enclosures, torrent links, then a magnet built from the info hash if no
/// magnet was found. Duplicates are dropped.
#[must_use]
pub fn collect_urls(entry: &FeedEntry) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();

    if let Some(magnet) = &entry.magnet_uri {
        push_unique(&mut urls, magnet);
    }

    for enclosure in &entry.enclosures {
        let is_torrent_type = enclosure
            .mime_type
            .as_deref()
            .is_some_and(|mime| mime.eq_ignore_ascii_case(BITTORRENT_MIME));
        if is_torrent_type || is_torrent_link(&enclosure.href) {
            push_unique(&mut urls, &enclosure.href);
        }
    }

    for link in entry.links.iter().filter(|l| is_torrent_link(l)) {
        push_unique(&mut urls, link);
    }

    let has_magnet = urls.iter().any(|u| u.starts_with(MAGNET_PREFIX));
    if !has_magnet && let Some(magnet) = entry.info_hash.as_deref().and_then(magnet_from_info_hash) {
        push_unique(&mut urls, &magnet);
    }

    urls
}

fn push_unique(urls: &mut Vec<String>, url: &str) {
    let url = url.trim();
    if !url.is_empty() && !urls.iter().any(|u| u == url) {
        urls.push(url.to_string());
    }
}

/// A magnet URI or a link to a `.torrent` file.
#[must_use]
pub fn is_torrent_link(href: &str) -> bool {
    let href = href.trim();
    if href.starts_with(MAGNET_PREFIX) {
        return true;
    }

    // Ignore query strings and fragments when checking the suffix.
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.to_ascii_lowercase().ends_with(TORRENT_SUFFIX)
}

#[must_use]
pub fn magnet_from_info_hash(hash: &str) -> Option<String> {
    let hash = hash.trim();
    (!hash.is_empty()).then(|| format!("{BTIH_MAGNET_PREFIX}{hash}"))
}

/// Parses an RFC 2822 or RFC 3339 date, falling back to `now`.
#[must_use]
pub fn parse_published(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        debug!("Entry has no publish date, using current time");
        return now;
    };

    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            debug!(raw, error = %e, "Malformed publish date, using current time");
            now
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EpisodeRef, ShowId, SourceRef};
    use crate::parser::{NameParser, SceneNameParser, ShowIndex};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn parser() -> SceneNameParser {
        let shows = ShowIndex::new().with_show(ShowId::new(7), ["Show Name"]);
        SceneNameParser::new(Arc::new(shows))
    }

    fn map(entry: &FeedEntry) -> Option<Release> {
        let parser = parser();
        let source = SourceRef::new("torrents", 0);
        let ctx = ParseContext {
            parser: &parser as &dyn NameParser,
            source: &source,
            now: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        TorrentMapper.map_entry(entry, &ctx)
    }

    #[test]
    fn test_entry_without_urls_is_dropped() {
        let entry = FeedEntry::new("Show.Name.S01E02.Bad");
        assert!(map(&entry).is_none());

        let html_only = FeedEntry::new("Show.Name.S01E02.720p").with_link("http://example.com/page");
        assert!(map(&html_only).is_none());
    }

    #[test]
    fn test_url_collection_order_and_dedup() {
        let entry = FeedEntry::new("Show Name S01E02 720p")
            .with_magnet("magnet:?xt=urn:btih:aaa")
            .with_enclosure(Some("application/x-bittorrent"), "http://x/dl/123")
            .with_enclosure(Some("text/html"), "http://x/page")
            .with_link("http://x/file.torrent")
            .with_link("magnet:?xt=urn:btih:aaa")
            .with_info_hash("bbb");

        assert_eq!(
            collect_urls(&entry),
            vec![
                "magnet:?xt=urn:btih:aaa".to_string(),
                "http://x/dl/123".to_string(),
                "http://x/file.torrent".to_string(),
            ]
        );
    }

    #[test]
    fn test_info_hash_magnet_only_without_magnet() {
        let entry = FeedEntry::new("Show Name S01E02")
            .with_link("http://x/file.torrent?passkey=1")
            .with_info_hash("ABC123");

        assert_eq!(
            collect_urls(&entry),
            vec![
                "http://x/file.torrent?passkey=1".to_string(),
                "magnet:?xt=urn:btih:ABC123".to_string(),
            ]
        );
    }

    #[test]
    fn test_filename_preferred_over_title() {
        let entry = FeedEntry::new("Something unrelated")
            .with_filename("Show.Name.S02E05.1080p.WEB.mkv")
            .with_link("http://x/a.torrent");

        let release = map(&entry).unwrap();
        assert_eq!(release.episodes(), &[EpisodeRef::new(ShowId::new(7), 2, 5)]);
        assert_eq!(release.quality, Quality::Hd1080p);
        assert_eq!(release.name, "Something unrelated");
        assert_eq!(release.source.name, "torrents");
    }

    #[test]
    fn test_unknown_show_is_dropped() {
        let entry = FeedEntry::new("Other Show S01E01 720p").with_link("http://x/a.torrent");
        assert!(map(&entry).is_none());
    }

    #[test]
    fn test_published_dates() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let rfc2822 = parse_published(Some("Mon, 13 May 2013 02:00:00 +0000"), now);
        assert_eq!(rfc2822, Utc.with_ymd_and_hms(2013, 5, 13, 2, 0, 0).unwrap());

        let rfc3339 = parse_published(Some("2020-02-03T04:05:06+01:00"), now);
        assert_eq!(rfc3339, Utc.with_ymd_and_hms(2020, 2, 3, 3, 5, 6).unwrap());

        assert_eq!(parse_published(Some("yesterday"), now), now);
        assert_eq!(parse_published(None, now), now);
    }

    #[test]
    fn test_is_torrent_link() {
        assert!(is_torrent_link("magnet:?xt=urn:btih:abc"));
        assert!(is_torrent_link("http://x/A.TORRENT"));
        assert!(is_torrent_link("http://x/a.torrent#frag"));
        assert!(!is_torrent_link("http://x/view/123"));
    }

    #[test]
    fn test_magnet_from_info_hash_trims_only() {
        assert_eq!(magnet_from_info_hash(" "), None);
        assert_eq!(
            magnet_from_info_hash(" abcd\n").as_deref(),
            Some("magnet:?xt=urn:btih:abcd")
        );
        assert_eq!(
            magnet_from_info_hash("SR-04").as_deref(),
            Some("magnet:?xt=urn:btih:SR-04")
        );
    }
}
