pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "webm", "mov", "wmv", "flv", "m4v", "ts", "torrent",
];

pub const USER_AGENT: &str = "Showarr/0.1";

pub mod torrent {

    pub const BITTORRENT_MIME: &str = "application/x-bittorrent";

    pub const MAGNET_PREFIX: &str = "magnet:";

    pub const TORRENT_SUFFIX: &str = ".torrent";

    pub const BTIH_MAGNET_PREFIX: &str = "magnet:?xt=urn:btih:";
}

pub mod intervals {
    use std::time::Duration;

    /// Minimum time between two refreshes of the same source.
    pub const DEFAULT_MIN_REFRESH: Duration = Duration::from_secs(15 * 60);

    pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
}

pub mod limits {

    /// Upper bound on the episodes a single `S01E01-E99` range may expand to.
    pub const MAX_EPISODE_RANGE: u32 = 100;
}
