// Extractor module - video metadata extraction behind a synchronous trait
//
// Two backends:
// - youtube: player endpoint queried through the injected Downloader
// - ytdlp: native `yt-dlp` binary doing its own fetches

mod cli;
mod diagnostics;
mod errors;
mod traits;
mod youtube;

use std::sync::Arc;

pub use cli::YtDlpExtractor;
pub use diagnostics::{diagnose_error, BlockingReason};
pub use errors::{ExtractionError, ExtractionErrorKind};
pub use traits::{AudioStream, Extractor, ExtractorBackend, StreamInfo};
pub use youtube::{ClientProfile, YoutubeExtractor};

use crate::config::ExtractorConfig;

/// Build the extractor selected by configuration
pub fn build_extractor(config: &ExtractorConfig) -> Arc<dyn Extractor> {
    match config.backend {
        ExtractorBackend::Youtube => Arc::new(YoutubeExtractor::new(ClientProfile::from_name(
            config.player_client.as_deref(),
        ))),
        ExtractorBackend::Ytdlp => Arc::new(YtDlpExtractor::new(config.clone())),
    }
}
