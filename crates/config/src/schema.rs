/// Config schema types (download pacing, encoding, output location).
use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Fixed pause between consecutive downloads in a batch.
pub const DEFAULT_DELAY_MS: u64 = 300;

/// JPEG quality used when re-encoding non-JPEG media (0.95 on a 0-1 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub download: DownloadConfig,
    pub output: OutputConfig,
}

/// Batch download behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Pause between items, in milliseconds. Defaults to 300.
    pub delay_ms: u64,
    /// Quality used when transcoding to JPEG (1-100). Defaults to 95.
    pub jpeg_quality: u8,
    /// Per-request timeout. Unset means requests may wait indefinitely.
    pub fetch_timeout_secs: Option<u64>,
    /// `User-Agent` sent with every fetch.
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            fetch_timeout_secs: None,
            user_agent: concat!("folio/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl DownloadConfig {
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

/// Where saved files land.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Target directory. Created on first save if missing.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = FolioConfig::default();
        assert_eq!(cfg.download.delay(), Duration::from_millis(300));
        assert_eq!(cfg.download.jpeg_quality, 95);
        assert!(cfg.download.fetch_timeout().is_none());
        assert!(cfg.download.user_agent.starts_with("folio/"));
        assert_eq!(cfg.output.dir, PathBuf::from("."));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: FolioConfig = toml::from_str(
            r#"
[download]
fetch_timeout_secs = 30
"#,
        )
        .unwrap();
        assert_eq!(cfg.download.fetch_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.download.delay_ms, DEFAULT_DELAY_MS);
    }
}
