//! Optional RON configuration file.
//!
//! ```ron
//! (
//!     base_url: Some("http://figures.local:8000"),
//!     max_retries: Some(8),
//!     reconnect_delay_ms: Some(2000),
//! )
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use autofigure_client::ClientSettings;
use serde::Deserialize;
use tracker_logging::tracker_info;

pub const DEFAULT_CONFIG_FILE: &str = "autofigure.ron";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub channel_read_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub reconnect_delay_ms: Option<u64>,
    pub log_poll_interval_ms: Option<u64>,
    pub max_upload_bytes: Option<u64>,
}

impl FileConfig {
    /// Loads `explicit` if given, otherwise `autofigure.ron` when it exists.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::read(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
        tracker_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Applies the file values over the built-in defaults.
    pub fn into_settings(self) -> ClientSettings {
        let mut settings = ClientSettings::default();
        if let Some(base_url) = self.base_url {
            settings.base_url = base_url;
        }
        if let Some(secs) = self.connect_timeout_secs {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.request_timeout_secs {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.channel_read_timeout_secs {
            settings.channel_read_timeout = Duration::from_secs(secs);
        }
        if let Some(max_retries) = self.max_retries {
            settings.retry.max_retries = max_retries;
        }
        if let Some(ms) = self.reconnect_delay_ms {
            settings.retry.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.log_poll_interval_ms {
            settings.log_poll_interval = Duration::from_millis(ms);
        }
        if let Some(bytes) = self.max_upload_bytes {
            settings.max_upload_bytes = bytes;
        }
        settings
    }
}
