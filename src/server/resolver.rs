// Video info resolver - one-time extractor init and id lookup

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::downloader::Downloader;
use crate::extractor::{ExtractionError, ExtractionErrorKind, Extractor};

/// Title, thumbnail and audio URL for one video, as sent to clients.
///
/// Missing attributes are empty strings, never omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    pub title: String,
    pub thumbnail: String,
    pub audio_url: String,
}

/// Extraction failure contained at the resolver boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    pub message: String,
    pub kind: Option<ExtractionErrorKind>,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ResolutionError {}

impl From<ExtractionError> for ResolutionError {
    fn from(e: ExtractionError) -> Self {
        Self {
            message: e.message,
            kind: Some(e.kind),
        }
    }
}

/// Canonical watch URL for a video id
pub fn source_url(video_id: &str) -> String {
    format!(
        "https://www.youtube.com/watch?v={}",
        urlencoding::encode(video_id)
    )
}

/// Resolves video ids through the Extractor.
///
/// The extractor is initialized with the downloader at most once, on the
/// first resolution; concurrent first calls wait on the same gate. No
/// retries, no caching.
pub struct VideoInfoResolver {
    extractor: Arc<dyn Extractor>,
    downloader: Arc<dyn Downloader>,
    init: OnceLock<Result<(), ExtractionError>>,
}

impl VideoInfoResolver {
    pub fn new(extractor: Arc<dyn Extractor>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            extractor,
            downloader,
            init: OnceLock::new(),
        }
    }

    /// Run the one-time extractor initialization if it has not happened yet.
    ///
    /// A failed initialization is logged and not retried; lookups then fail
    /// with whatever the uninitialized extractor reports.
    pub fn ensure_initialized(&self) -> Result<(), &ExtractionError> {
        self.init
            .get_or_init(|| {
                let result = self.extractor.init(Arc::clone(&self.downloader));
                match &result {
                    Ok(()) => tracing::info!(
                        extractor = self.extractor.name(),
                        downloader = self.downloader.name(),
                        "extractor initialized"
                    ),
                    Err(e) => tracing::error!(
                        extractor = self.extractor.name(),
                        kind = %e.kind,
                        error = %e,
                        "extractor initialization failed"
                    ),
                }
                result
            })
            .as_ref()
            .map(|_| ())
    }

    /// Blocking: performs network I/O through the extractor.
    pub fn resolve(&self, video_id: &str) -> Result<VideoInfo, ResolutionError> {
        let _ = self.ensure_initialized();

        let url = source_url(video_id);
        let info = self.extractor.stream_info(&url).map_err(|e| {
            tracing::warn!(
                extractor = self.extractor.name(),
                video_id,
                kind = %e.kind,
                blocked = e.kind.blocking_reason().map(|reason| reason.description()),
                error = %e,
                "extraction failed"
            );
            ResolutionError::from(e)
        })?;

        // First available entry wins; no quality ranking.
        let thumbnail = info.thumbnails.into_iter().next().unwrap_or_default();
        let audio_url = info
            .audio_streams
            .into_iter()
            .next()
            .map(|stream| stream.url)
            .unwrap_or_default();

        tracing::debug!(video_id, title = %info.name, "resolved");

        Ok(VideoInfo {
            title: info.name,
            thumbnail,
            audio_url,
        })
    }
}
