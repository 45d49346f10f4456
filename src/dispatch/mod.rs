//! Download backends the resolver hands winning releases to.

pub mod qbittorrent;

pub use qbittorrent::{QBitClient, QBitConfig, QBitDispatcher};

use crate::models::Release;
use tracing::info;

#[async_trait::async_trait]
pub trait DownloadDispatcher: Send + Sync {
    /// Starts downloading `release`. Errors are reported back to the caller,
    /// which logs them; nothing is retried.
    async fn dispatch(&self, release: &Release) -> anyhow::Result<()>;
}

/// Only logs what would be downloaded. Used for dry runs and when no download
/// client is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait::async_trait]
impl DownloadDispatcher for LogDispatcher {
    async fn dispatch(&self, release: &Release) -> anyhow::Result<()> {
        info!(
            event = "release_selected",
            release = %release.name,
            quality = %release.quality,
            source = %release.source.name,
            url = %release.preferred_url(),
            "Would download release"
        );
        Ok(())
    }
}
