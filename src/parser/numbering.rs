use super::{AbsoluteNameParser, NameParser, SceneNameParser, ShowIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// How a source numbers its episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingScheme {
    /// Season/episode markers as embedded in scene release names (`S01E02`).
    #[default]
    Scene,
    /// A single running episode number (`Title - 27`), season from the title.
    Absolute,
}

impl NumberingScheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Absolute => "absolute",
        }
    }
}

impl fmt::Display for NumberingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown numbering scheme: {0}")]
pub struct ParseSchemeError(String);

impl FromStr for NumberingScheme {
    type Err = ParseSchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scene" => Ok(Self::Scene),
            "absolute" => Ok(Self::Absolute),
            other => Err(ParseSchemeError(other.to_string())),
        }
    }
}

/// Maps numbering schemes to the parser that understands them.
#[derive(Clone, Default)]
pub struct NumberingRegistry {
    parsers: HashMap<NumberingScheme, Arc<dyn NameParser>>,
}

impl NumberingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the scene and absolute parsers sharing one show index.
    #[must_use]
    pub fn with_defaults(shows: Arc<ShowIndex>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SceneNameParser::new(Arc::clone(&shows))));
        registry.register(Arc::new(AbsoluteNameParser::new(shows)));
        registry
    }

    /// Registers `parser` under its own scheme, replacing any previous one.
    pub fn register(&mut self, parser: Arc<dyn NameParser>) {
        self.parsers.insert(parser.scheme(), parser);
    }

    #[must_use]
    pub fn parser(&self, scheme: NumberingScheme) -> Option<Arc<dyn NameParser>> {
        self.parsers.get(&scheme).cloned()
    }

    #[must_use]
    pub fn schemes(&self) -> Vec<NumberingScheme> {
        let mut schemes: Vec<_> = self.parsers.keys().copied().collect();
        schemes.sort_by_key(|s| s.as_str());
        schemes
    }
}

impl fmt::Debug for NumberingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumberingRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
