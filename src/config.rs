// Configuration - server and extractor settings
//
// Sources, lowest to highest precedence: built-in defaults, a JSON config
// file, then command-line flags / environment variables (applied by the
// binary).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::downloader::NetworkConfig;
use crate::extractor::ExtractorBackend;

pub const DEFAULT_PORT: u16 = 8080;

/// Listener and connection handling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Connections handled concurrently; accept waits for a free slot
    pub max_connections: usize,
    /// Size of the single read taken from each connection
    pub read_buffer_size: usize,
    pub read_timeout_secs: u64,
    /// How long `stop()` waits for in-flight requests before aborting them
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_connections: 64,
            read_buffer_size: 8192,
            read_timeout_secs: 10,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Configuration for metadata extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub backend: ExtractorBackend,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// YouTube player client (android, ios, web...)
    pub player_client: Option<String>,
    /// Explicit yt-dlp binary, otherwise searched in common locations
    pub ytdlp_path: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            backend: ExtractorBackend::Youtube,
            proxy: None,
            timeout_seconds: 30,
            player_client: None,
            ytdlp_path: None,
        }
    }
}

impl ExtractorConfig {
    pub fn with_backend(mut self, backend: ExtractorBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_player_client(mut self, client: Option<String>) -> Self {
        self.player_client = client;
        self
    }

    pub fn with_ytdlp_path(mut self, path: Option<String>) -> Self {
        self.ytdlp_path = path;
        self
    }

    /// Transport settings for the HTTP Downloader
    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            proxy: self.proxy.clone(),
            timeout: Some(self.timeout_seconds),
            ..NetworkConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub extractor: ExtractorConfig,
    /// Default tracing filter, overridden by RUST_LOG
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            extractor: ExtractorConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// `<config_dir>/ytaudio-server/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ytaudio-server").join("config.json"))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load an explicit file, else the default location if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}
