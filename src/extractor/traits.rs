// Extractor trait and stream metadata model

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::ExtractionError;
use crate::downloader::Downloader;

/// Extraction backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorBackend {
    /// Player endpoint queried through the injected Downloader
    #[default]
    Youtube,
    /// Native `yt-dlp` binary
    Ytdlp,
}

impl fmt::Display for ExtractorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Youtube => write!(f, "youtube"),
            Self::Ytdlp => write!(f, "ytdlp"),
        }
    }
}

/// One audio-only stream offered for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStream {
    pub url: String,
    /// e.g. `audio/mp4; codecs="mp4a.40.2"`
    pub mime_type: Option<String>,
    /// Bits per second
    pub bitrate: Option<u64>,
}

/// Metadata extracted for a single video.
///
/// Lists keep the order the source reported them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub name: String,
    pub thumbnails: Vec<String>,
    pub audio_streams: Vec<AudioStream>,
}

/// Synchronous metadata extraction capability.
///
/// `init` is called once per process before the first `stream_info`;
/// callers are responsible for that gate.
pub trait Extractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Install the transport used for the extractor's own fetches
    fn init(&self, downloader: Arc<dyn Downloader>) -> Result<(), ExtractionError>;

    /// Look up a video by its canonical watch URL
    fn stream_info(&self, url: &str) -> Result<StreamInfo, ExtractionError>;
}
