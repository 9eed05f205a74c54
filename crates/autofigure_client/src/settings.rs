use std::time::Duration;

use autofigure_core::{RetryPolicy, DEFAULT_LOG_POLL_INTERVAL};

/// Server rejects uploads above this size.
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Applies to plain request/response calls, not the live channel.
    pub request_timeout: Duration,
    /// Longest silence tolerated on the live channel. The server sends a
    /// keepalive every ten seconds.
    pub channel_read_timeout: Duration,
    pub retry: RetryPolicy,
    pub log_poll_interval: Duration,
    pub max_upload_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            channel_read_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            log_poll_interval: DEFAULT_LOG_POLL_INTERVAL,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl ClientSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
