pub mod config;
pub mod downloader;
pub mod extractor;
pub mod logging;
pub mod server;

pub use config::{AppConfig, ExtractorConfig, ServerConfig};
pub use server::{build_service, ServiceLifecycle, ServiceState};
