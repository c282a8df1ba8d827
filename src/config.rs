use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{DualcastError, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7878;
pub const DEFAULT_STORE_TIMEOUT_SECONDS: u64 = 15;
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_QUEUE_DEPTH: usize = 64;
pub const DEFAULT_POLL_SECONDS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 20;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentStoreConfig {
    pub api_url: String,
    pub timeout_seconds: Option<u64>,
    pub pubsub_enabled: Option<bool>,
    pub pin: Option<bool>,
    pub gateways: Option<Vec<String>>,
}

impl ContentStoreConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout_seconds: None,
            pubsub_enabled: None,
            pin: None,
            gateways: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.timeout_seconds
                .unwrap_or(DEFAULT_STORE_TIMEOUT_SECONDS)
                .max(1),
        )
    }

    pub fn pubsub_enabled(&self) -> bool {
        self.pubsub_enabled.unwrap_or(true)
    }

    pub fn pin(&self) -> bool {
        self.pin.unwrap_or(true)
    }

    pub fn gateways(&self) -> Vec<String> {
        match &self.gateways {
            Some(list) => list
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
            None => vec!["https://ipfs.io".to_string(), "https://dweb.link".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LiveChannelConfig {
    pub send_timeout_ms: Option<u64>,
    pub queue_depth: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HealthConfig {
    pub poll_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DispatchConfig {
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub server: Option<ServerConfig>,
    pub content_store: Option<ContentStoreConfig>,
    pub live_channel: Option<LiveChannelConfig>,
    pub health: Option<HealthConfig>,
    pub dispatch: Option<DispatchConfig>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DualcastError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| DualcastError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn host(&self) -> String {
        self.server
            .as_ref()
            .and_then(|server| server.host.as_deref())
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    pub fn port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|server| server.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn send_timeout(&self) -> Duration {
        let ms = self
            .live_channel
            .as_ref()
            .and_then(|live| live.send_timeout_ms)
            .unwrap_or(DEFAULT_SEND_TIMEOUT_MS);
        Duration::from_millis(ms.max(1))
    }

    pub fn queue_depth(&self) -> usize {
        self.live_channel
            .as_ref()
            .and_then(|live| live.queue_depth)
            .unwrap_or(DEFAULT_QUEUE_DEPTH)
            .max(1)
    }

    pub fn poll_interval(&self) -> Duration {
        let seconds = self
            .health
            .as_ref()
            .and_then(|health| health.poll_seconds)
            .unwrap_or(DEFAULT_POLL_SECONDS);
        Duration::from_secs(seconds.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        let seconds = self
            .dispatch
            .as_ref()
            .and_then(|dispatch| dispatch.request_timeout_seconds)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS);
        Duration::from_secs(seconds.max(1))
    }

    pub fn gateways(&self) -> Vec<String> {
        self.content_store
            .as_ref()
            .map(|store| store.gateways())
            .unwrap_or_default()
    }

    pub fn pin(&self) -> bool {
        self.content_store
            .as_ref()
            .map(|store| store.pin())
            .unwrap_or(true)
    }
}
