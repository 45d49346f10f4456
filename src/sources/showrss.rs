//! showRSS feeds prefix high definition items with `HD 720p: ` instead of
//! putting the resolution in the release name.

use super::torrent::TorrentMapper;
use super::{EntryMapper, ParseContext};
use crate::feed::FeedEntry;
use crate::models::Release;
use crate::quality::Quality;

const HD_720P_PREFIX: &str = "HD 720p: ";

#[derive(Debug, Clone)]
pub struct ShowRssMapper {
    prefix: String,
    quality: Quality,
}

impl Default for ShowRssMapper {
    fn default() -> Self {
        Self {
            prefix: HD_720P_PREFIX.to_string(),
            quality: Quality::Hd720p,
        }
    }
}

impl EntryMapper for ShowRssMapper {
    fn map_entry(&self, entry: &FeedEntry, ctx: &ParseContext<'_>) -> Option<Release> {
        match entry.title.strip_prefix(self.prefix.as_str()) {
            Some(stripped) => TorrentMapper::map_with_title(entry, stripped, Some(self.quality), ctx),
            None => TorrentMapper::map_with_title(entry, &entry.title, None, ctx),
        }
    }
}
