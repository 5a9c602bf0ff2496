use std::fs;
use std::path::Path;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

/// Client settings, read from `bitfetch.toml` in the working directory
/// when present. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Leading bytes of the generated peer id.
    pub peer_id_prefix: String,
    /// Port reported to the tracker.
    pub listen_port: u16,
    pub dial_timeout_secs: u64,
    /// A session with no progress for this long is abandoned.
    pub stall_timeout_secs: u64,
    /// Block requests kept in flight per peer.
    pub request_window: usize,
    /// Download attempts per piece, per peer, before giving up.
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            peer_id_prefix: "-BF0001-".to_string(),
            listen_port: 6881,
            dial_timeout_secs: 4,
            stall_timeout_secs: 30,
            request_window: 5,
            max_retries: 3,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let path = Path::new("bitfetch.toml");
        if !path.exists() {
            return Self::default();
        }
        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| toml::from_str(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => config,
            Err(err) => {
                warn!("ignoring bitfetch.toml: {err}");
                Self::default()
            }
        }
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }
}
