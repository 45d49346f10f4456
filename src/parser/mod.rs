//! Release name parsing.
//!
//! A [`NameParser`] turns a title or filename into a show identity, the
//! episodes it covers and a quality tier. Each numbering scheme has its own
//! parser; sources look theirs up through [`NumberingRegistry`].

pub mod absolute;
pub mod numbering;
pub mod scene;

pub use absolute::AbsoluteNameParser;
pub use numbering::{NumberingRegistry, NumberingScheme};
pub use scene::SceneNameParser;

use crate::constants::VIDEO_EXTENSIONS;
use crate::domain::{EpisodeRef, ShowId};
use crate::quality::Quality;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

pub(crate) fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Outcome of parsing a release name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedName {
    Known(EpisodeName),
    Unknown,
}

impl ParsedName {
    #[must_use]
    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    #[must_use]
    pub fn known(self) -> Option<EpisodeName> {
        match self {
            Self::Known(name) => Some(name),
            Self::Unknown => None,
        }
    }
}

/// A successfully identified release name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeName {
    pub show: ShowId,

    /// Series name as it appeared in the release, cleaned up.
    pub series: String,

    /// `(season, episode)` pairs, never empty.
    pub episodes: Vec<(u32, u32)>,

    pub quality: Quality,
}

impl EpisodeName {
    #[must_use]
    pub fn episode_refs(&self) -> Vec<EpisodeRef> {
        self.episodes
            .iter()
            .map(|&(season, episode)| EpisodeRef::new(self.show, season, episode))
            .collect()
    }
}

pub trait NameParser: Send + Sync {
    fn scheme(&self) -> NumberingScheme;

    /// Parses `name`. When `has_extension` is set the trailing file extension
    /// is ignored. Never fails: anything not understood is
    /// [`ParsedName::Unknown`].
    fn parse(&self, name: &str, has_extension: bool) -> ParsedName;
}

/// Lookup table from normalized series names and aliases to show ids.
#[derive(Debug, Clone, Default)]
pub struct ShowIndex {
    by_name: HashMap<String, ShowId>,
}

impl ShowIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` for `show`. Later registrations of the same
    /// normalized name replace earlier ones.
    pub fn insert(&mut self, show: ShowId, name: &str) {
        let key = normalize_show_name(name);
        if !key.is_empty() {
            self.by_name.insert(key, show);
        }
    }

    #[must_use]
    pub fn with_show<I, S>(mut self, show: ShowId, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.insert(show, name.as_ref());
        }
        self
    }

    /// Resolves a series name, retrying without a trailing year
    /// (`Doctor Who 2005`) when the exact name is not registered.
    #[must_use]
    pub fn lookup(&self, series: &str) -> Option<ShowId> {
        let key = normalize_show_name(series);
        if key.is_empty() {
            return None;
        }

        if let Some(id) = self.by_name.get(&key) {
            return Some(*id);
        }

        let (head, last) = key.rsplit_once(' ')?;
        let is_year = last.len() == 4 && last.chars().all(|c| c.is_ascii_digit());
        if is_year {
            self.by_name.get(head).copied()
        } else {
            None
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Lowercases, maps `.`/`_`/`-` to spaces, `&` to `and`, drops remaining
/// punctuation and collapses whitespace.
#[must_use]
pub fn normalize_show_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '.' | '_' | '-' => out.push(' '),
            '&' => out.push_str(" and "),
            c if c.is_alphanumeric() || c.is_whitespace() => out.extend(c.to_lowercase()),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops a trailing `.ext` when it looks like a file extension.
#[must_use]
pub fn strip_extension(name: &str) -> &str {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return name;
    };

    let lower = ext.to_ascii_lowercase();
    let looks_like_ext = VIDEO_EXTENSIONS.contains(&lower.as_str())
        || (!ext.is_empty()
            && ext.len() <= 4
            && ext.chars().all(|c| c.is_ascii_alphanumeric())
            && ext.chars().any(|c| c.is_ascii_alphabetic()));

    if looks_like_ext && !stem.is_empty() {
        stem
    } else {
        name
    }
}

/// Trims separator and bracket debris around a series name and drops a
/// leading `[Group]` tag.
pub(crate) fn clean_series(raw: &str) -> String {
    let mut series = raw.trim();
    if series.starts_with('[')
        && let Some(end) = series.find(']')
    {
        series = &series[end + 1..];
    }

    series
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '.' | '_' | '-' | '[' | '(' | ':'))
        .replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
