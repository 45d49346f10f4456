//! Absolute numbering as used by fansub releases:
//! `[Group] Title - 05 [1080p]`, `Title - 05 (1080p) [Group]`, batches like
//! `[Group] Title - 01~12`.
//!
//! The season comes from markers in the title (`Season 2`, `2nd Season`,
//! `Part II`, ...) and defaults to 1.

use super::{
    EpisodeName, NameParser, NumberingScheme, ParsedName, ShowIndex, get_regex, strip_extension,
};
use crate::constants::limits::MAX_EPISODE_RANGE;
use crate::quality::detect_quality;
use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};

/// Pieces pulled out of an absolute-numbered name before show lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AbsoluteMatch {
    title: String,
    first: u32,
    last: u32,
}

pub struct AbsoluteNameParser {
    shows: Arc<ShowIndex>,
}

impl AbsoluteNameParser {
    #[must_use]
    pub const fn new(shows: Arc<ShowIndex>) -> Self {
        Self { shows }
    }
}

impl NameParser for AbsoluteNameParser {
    fn scheme(&self) -> NumberingScheme {
        NumberingScheme::Absolute
    }

    fn parse(&self, name: &str, has_extension: bool) -> ParsedName {
        let base = if has_extension {
            strip_extension(name)
        } else {
            name
        };
        let spaced = base.replace('_', " ");

        let Some(found) = parse_bracketed(&spaced)
            .or_else(|| parse_group_at_end(&spaced))
            .or_else(|| parse_dash_episode(&spaced))
        else {
            return ParsedName::Unknown;
        };

        let series = clean_title(&found.title);
        let Some(show) = self
            .shows
            .lookup(&series)
            .or_else(|| self.shows.lookup(&normalize_title(&series)))
        else {
            return ParsedName::Unknown;
        };

        let season = detect_season_from_title(&series).unwrap_or(1);

        ParsedName::Known(EpisodeName {
            show,
            series,
            episodes: (found.first..=found.last).map(|e| (season, e)).collect(),
            quality: detect_quality(&spaced),
        })
    }
}

fn parse_bracketed(name: &str) -> Option<AbsoluteMatch> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"^\[(?P<group>[^\]]+)\]\s*(?P<title>.+?)\s+-\s+(?P<episode>\d{1,4})(?:\s*[~-]\s*(?P<last>\d{1,4}))?(?:v\d+)?(?:\s|\[|\(|$)",
    );

    let caps = re.captures(name)?;
    build_match(&caps)
}

fn parse_group_at_end(name: &str) -> Option<AbsoluteMatch> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"^(?P<title>[^\[].*?)\s+-\s+(?P<episode>\d{1,4})(?:\s*[~-]\s*(?P<last>\d{1,4}))?(?:v\d+)?\s*(?:\([^)]*\))?\s*\[(?P<group>[^\]]+)\]",
    );

    let caps = re.captures(name)?;
    build_match(&caps)
}

fn parse_dash_episode(name: &str) -> Option<AbsoluteMatch> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"^(?P<title>[^\[].*?)\s+-\s+(?P<episode>\d{1,4})(?:v\d+)?(?:\s|\[|\(|$)",
    );

    let caps = re.captures(name)?;
    build_match(&caps)
}

fn build_match(caps: &Captures) -> Option<AbsoluteMatch> {
    let title = caps.name("title")?.as_str().trim().to_string();
    let first: u32 = caps.name("episode")?.as_str().parse().ok()?;

    // Years and resolutions sit in the same position as episode numbers.
    if (1990..=2099).contains(&first) || [480, 576, 720, 1080, 2160].contains(&first) {
        return None;
    }

    let last = match caps.name("last").and_then(|m| m.as_str().parse::<u32>().ok()) {
        Some(last) if last > first && last - first <= MAX_EPISODE_RANGE => last,
        Some(_) => return None,
        None => first,
    };

    Some(AbsoluteMatch {
        title,
        first,
        last,
    })
}

#[must_use]
pub fn detect_season_from_title(title: &str) -> Option<u32> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)\b(?:Season|S)\s*(\d+)\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\b(\d+)(?:st|nd|rd|th)\s+Season\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\bPart\s+(\d+|I{1,3}V?|VI{0,3})\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\bCour\s+(\d+)\b").expect("Invalid Regex"),
            Regex::new(r"\b(I{2,3}V?|VI{0,3})\s*$").expect("Invalid Regex"),
        ]
    });

    for pattern in patterns {
        if let Some(caps) = pattern.captures(title)
            && let Some(m) = caps.get(1)
        {
            let num_str = m.as_str();

            if let Ok(n) = num_str.parse::<u32>() {
                return Some(n);
            }

            if let Some(n) = roman_to_int(num_str) {
                return Some(n);
            }
        }
    }

    None
}

fn roman_to_int(s: &str) -> Option<u32> {
    match s.to_uppercase().as_str() {
        "I" => Some(1),
        "II" => Some(2),
        "III" => Some(3),
        "IV" => Some(4),
        "V" => Some(5),
        "VI" => Some(6),
        "VII" => Some(7),
        "VIII" => Some(8),
        "IX" => Some(9),
        "X" => Some(10),
        _ => None,
    }
}

/// Collapses whitespace/underscores and drops a trailing `(YYYY)`.
#[must_use]
pub fn clean_title(title: &str) -> String {
    let mut title = title.trim().trim_end_matches(['-', '_']).trim();

    if let Some(idx) = title.rfind('(')
        && let Some(end) = title.rfind(')')
        && end > idx
    {
        let inside = &title[idx + 1..end];
        if inside.len() == 4 && inside.chars().all(|c| c.is_ascii_digit()) {
            title = title[..idx].trim();
        }
    }

    title
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strips season/part/cour markers so `Oshi no Ko 2nd Season` resolves to the
/// same show as `Oshi no Ko`.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    static NORMALIZE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

    let patterns = NORMALIZE_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)\s*\d+(?:st|nd|rd|th)\s+Season\s*$").expect("Invalid Regex"),
            Regex::new(r"(?i)\s*(?:Season|S)\s*\d+\s*$").expect("Invalid Regex"),
            Regex::new(r"(?i)\s*Part\s+(?:\d+|I{1,3}V?|VI{0,3})\s*$").expect("Invalid Regex"),
            Regex::new(r"(?i)\s*Cour\s+\d+\s*$").expect("Invalid Regex"),
            Regex::new(r"\s+(?:I{2,3}V?|VI{0,3})\s*$").expect("Invalid Regex"),
            Regex::new(r"\s*[:–—-]\s*$").expect("Invalid Regex"),
        ]
    });

    let mut result = clean_title(title);
    for pattern in patterns {
        result = pattern.replace_all(&result, "").to_string();
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}
