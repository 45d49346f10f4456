use super::DownloadDispatcher;
use crate::config::QBittorrentConfig;
use crate::constants::USER_AGENT;
use crate::models::Release;
use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct QBitConfig {
    pub base_url: String,

    pub username: String,

    pub password: String,
}

impl From<&QBittorrentConfig> for QBitConfig {
    fn from(config: &QBittorrentConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddTorrentOptions {
    pub save_path: Option<String>,

    pub category: Option<String>,
}

impl AddTorrentOptions {
    fn into_form(self, urls: &str) -> HashMap<&'static str, String> {
        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("urls", urls.to_string());

        if let Some(path) = self.save_path {
            form.insert("savepath", path);
        }
        if let Some(cat) = self.category {
            form.insert("category", cat);
        }
        form
    }
}

#[derive(Debug, Clone)]
pub struct QBitClient {
    client: Client,
    config: QBitConfig,
}

impl QBitClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: QBitConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    pub async fn login(&self) -> Result<()> {
        let url = format!("{}/api/v2/auth/login", self.config.base_url);

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .header("Referer", &self.config.base_url)
            .form(&params)
            .send()
            .await
            .context("Failed to connect to qBittorrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK && body.contains("Ok") {
            debug!("Authenticated with qBittorrent");
            Ok(())
        } else if body.contains("Fails") {
            bail!("qBittorrent authentication failed: invalid credentials")
        } else {
            bail!("qBittorrent authentication failed: status={status}, body={body}")
        }
    }

    async fn ensure_auth(&self) -> Result<()> {
        let url = format!("{}/api/v2/app/version", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .header("Referer", &self.config.base_url)
            .send()
            .await
            .context("Failed to connect to qBittorrent")?;

        if response.status() == StatusCode::FORBIDDEN {
            debug!(reason = "session_expired", "Logging in...");
            self.login().await?;
        }

        Ok(())
    }

    pub async fn get_version(&self) -> Result<String> {
        self.ensure_auth().await?;

        let url = format!("{}/api/v2/app/version", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .header("Referer", &self.config.base_url)
            .send()
            .await?;

        Ok(response.text().await?)
    }

    pub async fn add_torrent_url(&self, url: &str, options: AddTorrentOptions) -> Result<()> {
        self.ensure_auth().await?;

        let api_url = format!("{}/api/v2/torrents/add", self.config.base_url);
        let form = options.into_form(url);

        let response = self
            .client
            .post(&api_url)
            .header("Referer", &self.config.base_url)
            .form(&form)
            .send()
            .await
            .context("Failed to add torrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK {
            debug!("Torrent added");
            Ok(())
        } else if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
            bail!("Torrent file is not valid")
        } else {
            bail!("Failed to add torrent: status={status}, body={body}")
        }
    }

    pub async fn is_available(&self) -> bool {
        match self.get_version().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "qBittorrent not available");
                false
            }
        }
    }
}

/// Sends releases to qBittorrent under a fixed category and save path.
#[derive(Debug, Clone)]
pub struct QBitDispatcher {
    client: QBitClient,
    category: Option<String>,
    save_path: Option<String>,
}

impl QBitDispatcher {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &QBittorrentConfig) -> Result<Self> {
        Ok(Self {
            client: QBitClient::new(QBitConfig::from(config))?,
            category: Some(sanitize_category(&config.category)).filter(|c| !c.is_empty()),
            save_path: config.save_path.clone().filter(|p| !p.is_empty()),
        })
    }

    fn options(&self) -> AddTorrentOptions {
        AddTorrentOptions {
            save_path: self.save_path.clone(),
            category: self.category.clone(),
        }
    }
}

#[async_trait::async_trait]
impl DownloadDispatcher for QBitDispatcher {
    async fn dispatch(&self, release: &Release) -> Result<()> {
        self.client
            .add_torrent_url(release.preferred_url(), self.options())
            .await
            .with_context(|| format!("Failed to send '{}' to qBittorrent", release.name))
    }
}

#[must_use]
pub fn sanitize_category(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
