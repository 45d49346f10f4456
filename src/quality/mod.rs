use crate::parser::get_regex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Release quality, ordered from worst to best.
///
/// `Unknown` sorts lowest but is never treated as "better" or "worse" than a
/// detected quality by the resolver; it is only the fallback when nothing
/// else was recorded for an episode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Quality {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "sd")]
    Sd,
    #[serde(rename = "720p")]
    Hd720p,
    #[serde(rename = "1080p")]
    Hd1080p,
    #[serde(rename = "2160p")]
    Uhd2160p,
}

impl Quality {
    pub const ALL: [Self; 5] = [
        Self::Unknown,
        Self::Sd,
        Self::Hd720p,
        Self::Hd1080p,
        Self::Uhd2160p,
    ];

    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Sd => "sd",
            Self::Hd720p => "720p",
            Self::Hd1080p => "1080p",
            Self::Uhd2160p => "2160p",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown quality name: {0}")]
pub struct ParseQualityError(String);

impl FromStr for Quality {
    type Err = ParseQualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "sd" | "sdtv" | "480p" | "576p" => Ok(Self::Sd),
            "720p" | "hd" | "hd720p" => Ok(Self::Hd720p),
            "1080p" | "fullhd" | "hd1080p" => Ok(Self::Hd1080p),
            "2160p" | "4k" | "uhd" => Ok(Self::Uhd2160p),
            other => Err(ParseQualityError(other.to_string())),
        }
    }
}

/// Detects the quality tier from the tokens of a release name.
///
/// Resolution tokens win over source tokens. Plain TV/DVD rips without a
/// resolution are SD. Anything else is [`Quality::Unknown`].
#[must_use]
pub fn detect_quality(name: &str) -> Quality {
    static RESOLUTION: OnceLock<Regex> = OnceLock::new();
    static SD_SOURCE: OnceLock<Regex> = OnceLock::new();

    let resolution = get_regex(
        &RESOLUTION,
        r"(?i)\b(2160p|4k|uhd|1080[pi]|720p|576p|480p)\b",
    );

    if let Some(m) = resolution.find(name) {
        return match m.as_str().to_lowercase().as_str() {
            "2160p" | "4k" | "uhd" => Quality::Uhd2160p,
            "1080p" | "1080i" => Quality::Hd1080p,
            "720p" => Quality::Hd720p,
            _ => Quality::Sd,
        };
    }

    let sd_source = get_regex(
        &SD_SOURCE,
        r"(?i)\b(sdtv|hdtv|pdtv|dsr|dvdrip|dvdscr|xvid|divx)\b",
    );

    if sd_source.is_match(name) {
        Quality::Sd
    } else {
        Quality::Unknown
    }
}
