//! End-to-end runs of the pipeline over canned RSS documents.

use showarr::aggregator::SourceOutcome;
use showarr::config::{Config, ShowConfig, SourceConfig, SourceKind};
use showarr::dispatch::DownloadDispatcher;
use showarr::feed::{Feed, FeedError, FeedFetcher, parse_feed};
use showarr::models::Release;
use showarr::pipeline::Pipeline;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const EZTV_URL: &str = "http://feeds.test/eztv.rss";
const SHOWRSS_URL: &str = "http://feeds.test/showrss.rss";

const EZTV_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:torrent="http://xmlns.ezrss.it/0.1/">
<channel>
  <title>eztv</title>
  <item>
    <title>Show Name S01E02 720p HDTV x264</title>
    <link>http://feeds.test/dl/show.name.s01e02.720p.torrent</link>
    <pubDate>Mon, 13 May 2013 02:00:00 +0000</pubDate>
  </item>
  <item>
    <title>Show Name S01E03 720p</title>
    <torrent:magnetURI><![CDATA[magnet:?xt=urn:btih:EZ03]]></torrent:magnetURI>
  </item>
  <item>
    <title>Show.Name.S01E02.Bad</title>
  </item>
  <item>
    <title>Other Show S01E01 1080p</title>
    <link>http://feeds.test/dl/other.torrent</link>
  </item>
  <item>
    <title>Ignored Show S01E01 720p</title>
    <link>http://feeds.test/dl/ignored.torrent</link>
  </item>
</channel>
</rss>"#;

const SHOWRSS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:tv="http://showrss.info">
<channel>
  <title>showRSS</title>
  <item>
    <title>HD 720p: Show Name S01E02</title>
    <tv:info_hash>SR02</tv:info_hash>
    <enclosure url="magnet:?xt=urn:btih:SR02" length="0" type="application/x-bittorrent" />
  </item>
  <item>
    <title>Show Name S01E03 1080p</title>
    <link>magnet:?xt=urn:btih:SR03&amp;dn=Show.Name.S01E03</link>
  </item>
  <item>
    <title>Show Name S01E04</title>
    <tv:info_hash>SR04</tv:info_hash>
  </item>
</channel>
</rss>"#;

/// Serves canned documents by URL; unknown URLs answer 404.
#[derive(Default)]
struct StaticFetcher {
    documents: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    fn with(documents: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            documents: Mutex::new(
                documents
                    .iter()
                    .map(|(url, xml)| ((*url).to_string(), (*xml).to_string()))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        })
    }

    fn remove(&self, url: &str) {
        self.documents.lock().unwrap().remove(url);
    }
}

#[async_trait::async_trait]
impl FeedFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Feed, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let xml = self.documents.lock().unwrap().get(url).cloned();
        match xml {
            Some(xml) => parse_feed(&xml),
            None => Err(FeedError::Status(404)),
        }
    }
}

#[derive(Default)]
struct RecordingDispatcher {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingDispatcher {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DownloadDispatcher for RecordingDispatcher {
    async fn dispatch(&self, release: &Release) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((release.name.clone(), release.preferred_url().to_string()));
        Ok(())
    }
}

fn config() -> Config {
    Config {
        sources: vec![
            SourceConfig {
                name: "eztv".to_string(),
                kind: SourceKind::Torrent,
                url: EZTV_URL.to_string(),
                ..Default::default()
            },
            SourceConfig {
                name: "showrss".to_string(),
                kind: SourceKind::ShowRss,
                url: SHOWRSS_URL.to_string(),
                ..Default::default()
            },
        ],
        shows: vec![
            ShowConfig {
                id: 1,
                name: "Show Name".to_string(),
                aliases: Vec::new(),
                monitored: true,
                qualities: Vec::new(),
            },
            ShowConfig {
                id: 2,
                name: "Ignored Show".to_string(),
                aliases: Vec::new(),
                monitored: false,
                qualities: Vec::new(),
            },
        ],
        ..Default::default()
    }
}

fn pipeline(fetcher: Arc<StaticFetcher>, dispatcher: Arc<RecordingDispatcher>) -> Pipeline {
    Pipeline::with_collaborators(&config(), fetcher, dispatcher).expect("pipeline builds")
}

fn expected_dispatches() -> Vec<(String, String)> {
    vec![
        (
            "Show Name S01E02 720p HDTV x264".to_string(),
            "http://feeds.test/dl/show.name.s01e02.720p.torrent".to_string(),
        ),
        (
            "Show Name S01E03 1080p".to_string(),
            "magnet:?xt=urn:btih:SR03&dn=Show.Name.S01E03".to_string(),
        ),
        (
            "Show Name S01E04".to_string(),
            "magnet:?xt=urn:btih:SR04".to_string(),
        ),
    ]
}

#[tokio::test]
async fn test_best_release_per_episode_is_dispatched() {
    let fetcher = StaticFetcher::with(&[(EZTV_URL, EZTV_FEED), (SHOWRSS_URL, SHOWRSS_FEED)]);
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let mut pipeline = pipeline(fetcher, Arc::clone(&dispatcher));

    let stats = pipeline.run_once().await;

    // eztv: 3 recognised (E02, E03, ignored show); showrss: 3.
    assert_eq!(stats.releases, 6);
    assert_eq!(stats.wanted, 5);
    assert_eq!(stats.episodes, 3);
    assert_eq!(stats.dispatch.dispatched, 3);
    assert_eq!(stats.sources[0].outcome, SourceOutcome::Collected(3));
    assert_eq!(stats.sources[1].outcome, SourceOutcome::Collected(3));

    assert_eq!(dispatcher.sent(), expected_dispatches());
}

#[tokio::test]
async fn test_second_run_serves_cache_and_is_identical() {
    let fetcher = StaticFetcher::with(&[(EZTV_URL, EZTV_FEED), (SHOWRSS_URL, SHOWRSS_FEED)]);
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let mut pipeline = pipeline(Arc::clone(&fetcher), Arc::clone(&dispatcher));

    pipeline.run_once().await;
    pipeline.run_once().await;

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

    let sent = dispatcher.sent();
    assert_eq!(sent.len(), 6);
    assert_eq!(sent[..3], sent[3..]);
}

#[tokio::test]
async fn test_failing_source_does_not_stop_the_run() {
    let fetcher = StaticFetcher::with(&[(EZTV_URL, EZTV_FEED), (SHOWRSS_URL, SHOWRSS_FEED)]);
    fetcher.remove(EZTV_URL);
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let mut pipeline = pipeline(fetcher, Arc::clone(&dispatcher));

    let stats = pipeline.run_once().await;

    assert_eq!(stats.sources[0].outcome, SourceOutcome::Collected(0));
    assert_eq!(stats.sources[1].outcome, SourceOutcome::Collected(3));

    // Without eztv, showRSS's E02 wins with its prefix-derived 720p.
    let names: Vec<String> = dispatcher.sent().into_iter().map(|(name, _)| name).collect();
    assert_eq!(
        names,
        vec!["Show Name S01E02", "Show Name S01E03 1080p", "Show Name S01E04"]
    );
}

#[tokio::test]
async fn test_disabled_source_is_reported_and_skipped() {
    let fetcher = StaticFetcher::with(&[(EZTV_URL, EZTV_FEED), (SHOWRSS_URL, SHOWRSS_FEED)]);
    let dispatcher = Arc::new(RecordingDispatcher::default());

    let mut config = config();
    config.sources[1].enabled = false;
    let mut pipeline = Pipeline::with_collaborators(&config, Arc::clone(&fetcher) as _, dispatcher)
        .expect("pipeline builds");

    let stats = pipeline.run_once().await;

    assert_eq!(stats.sources[1].outcome, SourceOutcome::Disabled);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(stats.episodes, 2);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["sources"][1]["outcome"]["status"], "disabled");
}
