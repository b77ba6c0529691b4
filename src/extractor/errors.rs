// Error types for extractors

use std::fmt;

use super::diagnostics::{diagnose_error, looks_like_network_failure, BlockingReason};
use crate::downloader::DownloadError;

/// Category of an extraction failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionErrorKind {
    /// `stream_info` called before a successful `init`
    NotInitialized,

    /// External tool (yt-dlp) missing from the system
    ToolNotFound,

    /// Source URL does not name a video
    InvalidUrl,

    /// Transport failure while talking to YouTube
    Network,

    /// Response could not be understood
    Parse,

    /// YouTube refused to serve the video
    Restricted(BlockingReason),

    Unknown,
}

impl ExtractionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::ToolNotFound => "tool_not_found",
            Self::InvalidUrl => "invalid_url",
            Self::Network => "network",
            Self::Parse => "parse",
            Self::Restricted(reason) => reason.as_str(),
            Self::Unknown => "unknown",
        }
    }

    pub fn blocking_reason(&self) -> Option<BlockingReason> {
        match self {
            Self::Restricted(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub message: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_initialized(extractor: &str) -> Self {
        Self::new(
            ExtractionErrorKind::NotInitialized,
            format!("Extractor {} is not initialized", extractor),
        )
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Parse, message)
    }

    /// Classify free-form failure text (stderr, playability reason...)
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();

        if let Some(reason) = diagnose_error(&message) {
            return Self::new(ExtractionErrorKind::Restricted(reason), message);
        }

        if looks_like_network_failure(&message) {
            return Self::new(ExtractionErrorKind::Network, message);
        }

        if message.contains("Invalid URL") || message.contains("Unsupported URL") {
            return Self::new(ExtractionErrorKind::InvalidUrl, message);
        }

        Self::new(ExtractionErrorKind::Unknown, message)
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExtractionError {}

impl From<DownloadError> for ExtractionError {
    fn from(e: DownloadError) -> Self {
        let kind = match e {
            DownloadError::InvalidUrl(_) => ExtractionErrorKind::InvalidUrl,
            _ => ExtractionErrorKind::Network,
        };
        Self::new(kind, e.to_string())
    }
}
