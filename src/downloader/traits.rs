// Downloader trait definition

use super::errors::DownloadError;
use super::models::{Request, Response};

/// Pluggable transport used by extractors for their own network fetches.
///
/// Implementations are synchronous: callers run on blocking worker threads,
/// never inside an async task.
pub trait Downloader: Send + Sync {
    /// Name of the transport (for logging)
    fn name(&self) -> &'static str;

    /// Perform one request and return the full response
    fn execute(&self, request: &Request) -> Result<Response, DownloadError>;
}
