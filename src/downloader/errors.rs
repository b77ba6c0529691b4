// Transport errors raised by Downloader implementations

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// Request did not complete within the configured timeout
    NetworkTimeout,

    /// Could not establish a connection to the remote host
    Connect(String),

    /// URL could not be parsed or uses an unsupported scheme
    InvalidUrl(String),

    /// Proxy URL rejected by the HTTP client
    InvalidProxy(String),

    /// Any other transport failure (TLS, body read, redirect loop...)
    Transport(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkTimeout => write!(f, "Network timeout: remote host is not responding"),
            Self::Connect(msg) => write!(f, "Connection failed: {}", msg),
            Self::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            Self::InvalidProxy(proxy) => write!(f, "Invalid proxy: {}", proxy),
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::NetworkTimeout;
        }
        if e.is_connect() {
            return Self::Connect(e.to_string());
        }
        if e.is_builder() {
            return Self::InvalidUrl(e.to_string());
        }
        Self::Transport(e.to_string())
    }
}
