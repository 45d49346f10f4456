//! Gathers releases from every source, in source priority order.

use crate::models::Release;
use crate::sources::SourceAdapter;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SourceOutcome {
    Collected(usize),
    Disabled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregated {
    /// Releases of all sources, highest priority source first, each source's
    /// releases in feed order.
    pub releases: Vec<Release>,
    pub reports: Vec<SourceReport>,
}

pub struct Aggregator {
    sources: Vec<Box<dyn SourceAdapter>>,
}

impl Aggregator {
    /// `sources` must already be in priority order.
    #[must_use]
    pub fn new(sources: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self { sources }
    }

    #[must_use]
    pub fn sources(&self) -> &[Box<dyn SourceAdapter>] {
        &self.sources
    }

    /// Asks each enabled source for its latest releases, one at a time. A
    /// source that fails is skipped; the others still contribute.
    pub async fn collect(&mut self) -> Aggregated {
        let mut aggregated = Aggregated::default();

        for source in &mut self.sources {
            let name = source.name().to_string();

            if !source.is_enabled() {
                debug!(source = %name, "Source disabled, skipping");
                aggregated.reports.push(SourceReport {
                    name,
                    outcome: SourceOutcome::Disabled,
                });
                continue;
            }

            let outcome = match source.get_latest().await {
                Ok(releases) => {
                    let count = releases.len();
                    aggregated.releases.extend(releases);
                    SourceOutcome::Collected(count)
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "Source failed, skipping for this run");
                    SourceOutcome::Failed(e.to_string())
                }
            };

            aggregated.reports.push(SourceReport { name, outcome });
        }

        aggregated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EpisodeRef, ShowId, SourceRef};
    use crate::quality::Quality;
    use crate::sources::SourceError;
    use chrono::{DateTime, Utc};

    struct FakeSource {
        name: &'static str,
        enabled: bool,
        result: Result<Vec<&'static str>, ()>,
    }

    impl FakeSource {
        fn ok(name: &'static str, releases: Vec<&'static str>) -> Box<dyn SourceAdapter> {
            Box::new(Self {
                name,
                enabled: true,
                result: Ok(releases),
            })
        }

        fn failing(name: &'static str) -> Box<dyn SourceAdapter> {
            Box::new(Self {
                name,
                enabled: true,
                result: Err(()),
            })
        }

        fn disabled(name: &'static str) -> Box<dyn SourceAdapter> {
            Box::new(Self {
                name,
                enabled: false,
                result: Ok(vec!["x"]),
            })
        }
    }

    #[async_trait::async_trait]
    impl SourceAdapter for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn is_due_at(&self, _now: DateTime<Utc>) -> bool {
            true
        }

        async fn fetch_and_parse(&self) -> Result<Vec<Release>, SourceError> {
            match &self.result {
                Ok(names) => Ok(names
                    .iter()
                    .filter_map(|n| {
                        Release::new(
                            vec![format!("magnet:?xt=urn:btih:{n}")],
                            vec![EpisodeRef::new(ShowId::new(1), 1, 1)],
                            *n,
                            Quality::Hd720p,
                            Utc::now(),
                            SourceRef::new(self.name, 0),
                        )
                    })
                    .collect()),
                Err(()) => Err(SourceError::Misconfigured(
                    self.name.to_string(),
                    "broken".to_string(),
                )),
            }
        }

        async fn get_latest(&mut self) -> Result<Vec<Release>, SourceError> {
            self.fetch_and_parse().await
        }
    }

    #[tokio::test]
    async fn test_concatenates_in_priority_order() {
        let mut aggregator = Aggregator::new(vec![
            FakeSource::ok("first", vec!["a", "b"]),
            FakeSource::ok("second", vec!["c"]),
        ]);

        let aggregated = aggregator.collect().await;
        let names: Vec<_> = aggregated.releases.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(aggregated.reports[0].outcome, SourceOutcome::Collected(2));
        assert_eq!(aggregated.reports[1].outcome, SourceOutcome::Collected(1));
    }

    #[tokio::test]
    async fn test_failed_and_disabled_sources_are_skipped() {
        let mut aggregator = Aggregator::new(vec![
            FakeSource::failing("broken"),
            FakeSource::disabled("off"),
            FakeSource::ok("good", vec!["y"]),
        ]);

        let aggregated = aggregator.collect().await;
        assert_eq!(aggregated.releases.len(), 1);
        assert_eq!(aggregated.releases[0].name, "y");
        assert!(matches!(aggregated.reports[0].outcome, SourceOutcome::Failed(_)));
        assert_eq!(aggregated.reports[1].outcome, SourceOutcome::Disabled);
        assert_eq!(aggregator.sources().len(), 3);
    }

    #[tokio::test]
    async fn test_no_sources() {
        let aggregated = Aggregator::new(Vec::new()).collect().await;
        assert!(aggregated.releases.is_empty());
        assert!(aggregated.reports.is_empty());
    }
}
