use super::{Enclosure, Feed, FeedEntry, FeedError, FeedFetcher};
use crate::constants::USER_AGENT;
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Consolidates regexes for RSS parsing to avoid per-call overhead.
struct FeedRegex {
    item: Regex,
    entry: Regex,
    channel_title: Regex,
    feed_title: Regex,
    title: Regex,
    link: Regex,
    link_element: Regex,
    enclosure: Regex,
    attribute: Regex,
    magnet_uri: Regex,
    info_hash: Regex,
    filename: Regex,
    pub_date: Regex,
    cdata: Regex,
}

impl FeedRegex {
    fn get() -> Option<&'static Self> {
        static INSTANCE: OnceLock<Option<FeedRegex>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| {
                Some(Self {
                    item: Regex::new(r"(?s)<item(?:\s[^>]*)?>(.*?)</item>").ok()?,
                    entry: Regex::new(r"(?s)<entry(?:\s[^>]*)?>(.*?)</entry>").ok()?,
                    channel_title: Regex::new(
                        r"(?s)<channel(?:\s[^>]*)?>.*?<title(?:\s[^>]*)?>(.*?)</title>",
                    )
                    .ok()?,
                    feed_title: Regex::new(
                        r"(?s)<feed(?:\s[^>]*)?>.*?<title(?:\s[^>]*)?>(.*?)</title>",
                    )
                    .ok()?,
                    title: Regex::new(r"(?s)<title(?:\s[^>]*)?>(.*?)</title>").ok()?,
                    link: Regex::new(r"(?s)<link>(.*?)</link>").ok()?,
                    link_element: Regex::new(r"<(?:atom:)?link\s([^>]*?)/?>").ok()?,
                    enclosure: Regex::new(r"<enclosure\s([^>]*?)/?>").ok()?,
                    attribute: Regex::new(r#"\b(url|href|type|rel)\s*=\s*["']([^"']*)["']"#)
                        .ok()?,
                    magnet_uri: Regex::new(r"(?s)<torrent:magnetURI>(.*?)</torrent:magnetURI>")
                        .ok()?,
                    info_hash: Regex::new(
                        r"(?s)<(?:torrent:infoHash|nyaa:infoHash|showrss:info_hash|tv:info_hash)>(.*?)</",
                    )
                    .ok()?,
                    filename: Regex::new(r"(?s)<torrent:fileName>(.*?)</torrent:fileName>").ok()?,
                    pub_date: Regex::new(r"(?s)<(?:pubDate|dc:date|published|updated)>(.*?)</")
                        .ok()?,
                    cdata: Regex::new(r"(?s)^\s*<!\[CDATA\[(.*?)\]\]>\s*$").ok()?,
                })
            })
            .as_ref()
    }
}

/// CDATA content is literal; only plain text carries entities.
fn decode_text(re: &FeedRegex, raw: &str) -> String {
    match re.cdata.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => html_escape::decode_html_entities(raw.trim()).to_string(),
    }
}

fn extract_tag(xml: &str, tag: &Regex, re: &FeedRegex) -> Option<String> {
    tag.captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| decode_text(re, m.as_str()))
        .filter(|s| !s.is_empty())
}

/// Attributes of one `<enclosure>` or `<link>` element.
#[derive(Default)]
struct ElementAttrs {
    href: Option<String>,
    mime_type: Option<String>,
    rel: Option<String>,
}

fn parse_attrs(attrs: &str, re: &FeedRegex) -> ElementAttrs {
    let mut parsed = ElementAttrs::default();
    for caps in re.attribute.captures_iter(attrs) {
        let value = html_escape::decode_html_entities(&caps[2]).to_string();
        match &caps[1] {
            "url" | "href" => parsed.href = Some(value),
            "type" => parsed.mime_type = Some(value),
            _ => parsed.rel = Some(value),
        }
    }
    parsed
}

/// RSS `<enclosure>` elements plus Atom `<link rel="enclosure">` elements.
fn parse_enclosures(xml: &str, re: &FeedRegex) -> Vec<Enclosure> {
    let rss = re
        .enclosure
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|attrs| parse_attrs(attrs.as_str(), re));

    let atom = re
        .link_element
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|attrs| parse_attrs(attrs.as_str(), re))
        .filter(|attrs| attrs.rel.as_deref() == Some("enclosure"));

    rss.chain(atom)
        .filter_map(|attrs| {
            let ElementAttrs {
                href, mime_type, ..
            } = attrs;
            href.filter(|h| !h.is_empty())
                .map(|href| Enclosure { mime_type, href })
        })
        .collect()
}

fn parse_links(xml: &str, re: &FeedRegex) -> Vec<String> {
    let plain = re
        .link
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| decode_text(re, m.as_str()));

    let elements = re
        .link_element
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .filter_map(|attrs| parse_attrs(attrs.as_str(), re).href);

    plain.chain(elements).filter(|l| !l.is_empty()).collect()
}

fn parse_item(item_xml: &str, re: &FeedRegex) -> FeedEntry {
    FeedEntry {
        title: extract_tag(item_xml, &re.title, re).unwrap_or_default(),
        filename: extract_tag(item_xml, &re.filename, re),
        magnet_uri: extract_tag(item_xml, &re.magnet_uri, re),
        info_hash: extract_tag(item_xml, &re.info_hash, re),
        enclosures: parse_enclosures(item_xml, re),
        links: parse_links(item_xml, re),
        published: extract_tag(item_xml, &re.pub_date, re),
    }
}

/// Extracts the items of an RSS 2.0 document or the entries of an Atom one,
/// including the common torrent namespaces (`torrent:`, `nyaa:`,
/// `showrss:`/`tv:`).
///
/// # Errors
/// Returns [`FeedError::Malformed`] when the body is neither RSS nor Atom.
pub fn parse_feed(xml: &str) -> Result<Feed, FeedError> {
    let Some(re) = FeedRegex::get() else {
        return Err(FeedError::Malformed("feed regexes failed to build".into()));
    };

    let is_rss = xml.contains("<rss") || xml.contains("<channel");
    let is_atom = !is_rss && xml.contains("<feed");
    if !is_rss && !is_atom {
        return Err(FeedError::Malformed(
            "no <rss>, <channel> or <feed> element".into(),
        ));
    }

    let (element, title) = if is_atom {
        (&re.entry, &re.feed_title)
    } else {
        (&re.item, &re.channel_title)
    };

    let entries = element
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| parse_item(m.as_str(), re))
        .collect();

    Ok(Feed {
        title: extract_tag(xml, title, re),
        entries,
    })
}

#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    /// Creates a fetcher with its own HTTP client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.unwrap_or(USER_AGENT))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Feed, FeedError> {
        let parsed = Url::parse(url).map_err(|e| FeedError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let xml = response.text().await?;
        let feed = parse_feed(&xml)?;
        debug!(url, entries = feed.entries.len(), "Fetched feed");
        Ok(feed)
    }
}
