// HTTP metadata service: accept, parse, route, resolve, respond

pub mod connection;
pub mod lifecycle;
pub mod listener;
pub mod request;
pub mod resolver;
pub mod router;

use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Handle;

pub use connection::{frame_response, ConnectionHandler, Outcome};
pub use lifecycle::{LifecycleError, ServiceLifecycle, ServiceState};
pub use listener::Listener;
pub use request::{parse_query_string, parse_request, ParseError, ParsedRequest};
pub use resolver::{source_url, ResolutionError, VideoInfo, VideoInfoResolver};
pub use router::{ApiResponse, Router, METADATA_PATH, MISSING_ID_MESSAGE};

use crate::config::AppConfig;
use crate::downloader::HttpDownloader;
use crate::extractor::build_extractor;

/// Wire the configured downloader, extractor and router into a service.
///
/// `runtime` drives the HTTP downloader's blocking calls.
pub fn build_service(config: &AppConfig, runtime: Handle) -> anyhow::Result<ServiceLifecycle> {
    let downloader = HttpDownloader::new(&config.extractor.network(), runtime)
        .context("failed to build HTTP downloader")?;
    let extractor = build_extractor(&config.extractor);
    tracing::info!(
        backend = %config.extractor.backend,
        extractor = extractor.name(),
        proxy = config.extractor.proxy.as_deref().unwrap_or("none"),
        "extractor selected"
    );

    let resolver = VideoInfoResolver::new(extractor, Arc::new(downloader));
    let router = Arc::new(Router::new(resolver));
    Ok(ServiceLifecycle::new(config.server.clone(), router))
}
