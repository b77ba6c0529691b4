// Downloader module - pluggable transport handed to extractors at init time

pub mod errors;
pub mod http;
pub mod models;
pub mod traits;

pub use errors::DownloadError;
pub use http::HttpDownloader;
pub use models::{NetworkConfig, Request, Response};
pub use traits::Downloader;
