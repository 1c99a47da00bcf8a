//! Runtime configuration for parsing limits and viewer behaviour

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_AUTOPLAY_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Largest PGN payload accepted, in bytes
    pub max_upload_bytes: u64,
    /// Lower-case file extensions accepted for uploads, without the dot
    pub allowed_extensions: Vec<String>,
    /// Delay between autoplay steps
    pub autoplay_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: vec!["pgn".to_string(), "txt".to_string()],
            autoplay_interval_ms: DEFAULT_AUTOPLAY_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Defaults, overridden by `PGN_MAX_UPLOAD_BYTES` and `PGN_AUTOPLAY_INTERVAL_MS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(bytes) = read_env_u64("PGN_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = bytes;
        }
        if let Some(ms) = read_env_u64("PGN_AUTOPLAY_INTERVAL_MS") {
            config.autoplay_interval_ms = ms.max(1);
        }

        config
    }

    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_millis(self.autoplay_interval_ms.max(1))
    }

    pub fn with_autoplay_interval(mut self, interval: Duration) -> Self {
        self.autoplay_interval_ms = interval.as_millis().max(1) as u64;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}

fn read_env_u64(key: &str) -> Option<u64> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring {}='{}': {}", key, raw, e);
            None
        }
    }
}
