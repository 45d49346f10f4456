//! Scene numbering: `Show.Name.S01E02.720p.HDTV.x264-GROUP` and friends.

use super::{
    EpisodeName, NameParser, NumberingScheme, ParsedName, ShowIndex, clean_series, get_regex,
    strip_extension,
};
use crate::constants::limits::MAX_EPISODE_RANGE;
use crate::quality::detect_quality;
use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};

/// Where the episode marker sits in a name and which episodes it covers.
#[derive(Debug, PartialEq, Eq)]
struct EpisodeMarker {
    start: usize,
    end: usize,
    episodes: Vec<(u32, u32)>,
}

pub struct SceneNameParser {
    shows: Arc<ShowIndex>,
}

impl SceneNameParser {
    #[must_use]
    pub const fn new(shows: Arc<ShowIndex>) -> Self {
        Self { shows }
    }
}

impl NameParser for SceneNameParser {
    fn scheme(&self) -> NumberingScheme {
        NumberingScheme::Scene
    }

    fn parse(&self, name: &str, has_extension: bool) -> ParsedName {
        let base = if has_extension {
            strip_extension(name)
        } else {
            name
        };

        let Some(marker) = find_episode_marker(base) else {
            return ParsedName::Unknown;
        };

        let series = clean_series(&base[..marker.start]);
        if series.is_empty() {
            return ParsedName::Unknown;
        }

        let Some(show) = self.shows.lookup(&series) else {
            return ParsedName::Unknown;
        };

        ParsedName::Known(EpisodeName {
            show,
            series,
            episodes: marker.episodes,
            quality: detect_quality(&base[marker.end..]),
        })
    }
}

fn find_episode_marker(name: &str) -> Option<EpisodeMarker> {
    parse_sxxexx(name)
        .or_else(|| parse_nxnn(name))
        .or_else(|| parse_verbose(name))
}

fn parse_sxxexx(name: &str) -> Option<EpisodeMarker> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)\bS(?P<season>\d{1,3})[ ._-]?E(?P<episode>\d{1,4})(?P<more>(?:[ ._]?E\d{1,4}\b|-E?\d{1,4}\b)*)",
    );

    let caps = re.captures(name)?;
    let season = capture_u32(&caps, "season")?;
    let first = capture_u32(&caps, "episode")?;
    let more = caps.name("more").map_or("", |m| m.as_str());

    let whole = caps.get(0)?;
    Some(EpisodeMarker {
        start: whole.start(),
        end: whole.end(),
        episodes: expand_episodes(season, first, more),
    })
}

fn parse_nxnn(name: &str) -> Option<EpisodeMarker> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)\b(?P<season>\d{1,2})x(?P<episode>\d{2,3})(?P<more>(?:-\d{2,3}\b)?)\b",
    );

    let caps = re.captures(name)?;
    let season = capture_u32(&caps, "season")?;
    let first = capture_u32(&caps, "episode")?;
    let more = caps.name("more").map_or("", |m| m.as_str());

    let whole = caps.get(0)?;
    Some(EpisodeMarker {
        start: whole.start(),
        end: whole.end(),
        episodes: expand_episodes(season, first, more),
    })
}

fn parse_verbose(name: &str) -> Option<EpisodeMarker> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)\bSeason[ ._-]?(?P<season>\d{1,3})[ ._,-]*Episode[ ._-]?(?P<episode>\d{1,4})\b",
    );

    let caps = re.captures(name)?;
    let season = capture_u32(&caps, "season")?;
    let episode = capture_u32(&caps, "episode")?;

    let whole = caps.get(0)?;
    Some(EpisodeMarker {
        start: whole.start(),
        end: whole.end(),
        episodes: vec![(season, episode)],
    })
}

fn capture_u32(caps: &Captures, name: &str) -> Option<u32> {
    caps.name(name)?.as_str().parse().ok()
}

/// Expands the tail after the first episode number.
///
/// `E03E04` lists episodes, `-E05` / `-05` closes a range started by the
/// previous number. A range that runs backwards or spans more than
/// [`MAX_EPISODE_RANGE`] episodes is ignored.
fn expand_episodes(season: u32, first: u32, more: &str) -> Vec<(u32, u32)> {
    static PART: OnceLock<Regex> = OnceLock::new();
    let part = get_regex(&PART, r"(?i)(?P<dash>-)?E?(?P<num>\d{1,4})");

    let mut episodes = vec![(season, first)];
    let mut last = first;

    for caps in part.captures_iter(more) {
        let Some(num) = capture_u32(&caps, "num") else {
            continue;
        };

        if caps.name("dash").is_some() {
            if num <= last || num - last > MAX_EPISODE_RANGE {
                continue;
            }
            episodes.extend((last + 1..=num).map(|e| (season, e)));
        } else if !episodes.contains(&(season, num)) {
            episodes.push((season, num));
        }
        last = num;
    }

    episodes
}
