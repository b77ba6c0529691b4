// Router - maps a parsed request to a JSON response body

use serde::Serialize;

use super::request::ParsedRequest;
use super::resolver::{ResolutionError, VideoInfo, VideoInfoResolver};

pub const METADATA_PATH: &str = "/ytinfo";
pub const MISSING_ID_MESSAGE: &str = "Missing id parameter";

/// JSON payload written for a request.
///
/// Serializes untagged: each variant is the bare object clients receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    VideoInfo(VideoInfo),
    Error {
        error: String,
    },
    Descriptor {
        status: String,
        message: String,
        endpoints: Vec<String>,
    },
}

impl ApiResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Static description of the service's single endpoint
    pub fn descriptor() -> Self {
        Self::Descriptor {
            status: "success".to_string(),
            message: "YT Audio Server running".to_string(),
            endpoints: vec![format!("{}?id=VIDEO_ID", METADATA_PATH)],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl From<Result<VideoInfo, ResolutionError>> for ApiResponse {
    fn from(result: Result<VideoInfo, ResolutionError>) -> Self {
        match result {
            Ok(info) => Self::VideoInfo(info),
            Err(e) => Self::error(e.message),
        }
    }
}

/// Maps every request to a response; there is no "not found".
pub struct Router {
    resolver: VideoInfoResolver,
}

impl Router {
    pub fn new(resolver: VideoInfoResolver) -> Self {
        Self { resolver }
    }

    /// Blocking when the request reaches the resolver.
    pub fn route(&self, request: &ParsedRequest) -> ApiResponse {
        if request.method != "GET" || request.path != METADATA_PATH {
            return ApiResponse::descriptor();
        }

        match request.query("id") {
            Some(id) if !id.is_empty() => self.resolver.resolve(id).into(),
            _ => ApiResponse::error(MISSING_ID_MESSAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::{DownloadError, Downloader, Request, Response};
    use crate::extractor::{AudioStream, ExtractionError, Extractor, StreamInfo};
    use crate::server::request::parse_request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct NoopDownloader;

    impl Downloader for NoopDownloader {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn execute(&self, _request: &Request) -> Result<Response, DownloadError> {
            Err(DownloadError::Transport("unused".to_string()))
        }
    }

    /// Succeeds for every id except "bad"
    struct CountingExtractor {
        lookups: AtomicUsize,
        info: StreamInfo,
    }

    impl Extractor for CountingExtractor {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn init(&self, _downloader: Arc<dyn Downloader>) -> Result<(), ExtractionError> {
            Ok(())
        }

        fn stream_info(&self, url: &str) -> Result<StreamInfo, ExtractionError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("v=bad") {
                return Err(ExtractionError::from_message("This video is private"));
            }
            Ok(self.info.clone())
        }
    }

    fn router_with(info: StreamInfo) -> (Router, Arc<CountingExtractor>) {
        let extractor = Arc::new(CountingExtractor {
            lookups: AtomicUsize::new(0),
            info,
        });
        let resolver = VideoInfoResolver::new(extractor.clone(), Arc::new(NoopDownloader));
        (Router::new(resolver), extractor)
    }

    fn full_info() -> StreamInfo {
        StreamInfo {
            name: "T".to_string(),
            thumbnails: vec!["u1".to_string()],
            audio_streams: vec![AudioStream {
                url: "a1".to_string(),
                mime_type: None,
                bitrate: None,
            }],
        }
    }

    fn route_raw(router: &Router, raw: &str) -> serde_json::Value {
        let request = parse_request(raw.as_bytes()).unwrap();
        serde_json::to_value(router.route(&request)).unwrap()
    }

    #[test]
    fn test_descriptor_for_other_paths_and_methods() {
        let (router, extractor) = router_with(full_info());
        let expected = serde_json::json!({
            "status": "success",
            "message": "YT Audio Server running",
            "endpoints": ["/ytinfo?id=VIDEO_ID"],
        });

        for raw in [
            "GET / HTTP/1.1\r\n\r\n",
            "GET /other?id=abc HTTP/1.1\r\n\r\n",
            "POST /ytinfo?id=abc HTTP/1.1\r\n\r\n",
            "DELETE /ytinfo HTTP/1.1\r\n\r\n",
            "GET /ytinfo/ HTTP/1.1\r\n\r\n",
        ] {
            assert_eq!(route_raw(&router, raw), expected, "request {:?}", raw);
        }
        assert_eq!(extractor.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_or_empty_id_never_reaches_extractor() {
        let (router, extractor) = router_with(full_info());
        let expected = serde_json::json!({ "error": "Missing id parameter" });

        assert_eq!(route_raw(&router, "GET /ytinfo HTTP/1.1\r\n\r\n"), expected);
        assert_eq!(route_raw(&router, "GET /ytinfo?id= HTTP/1.1\r\n\r\n"), expected);
        assert_eq!(route_raw(&router, "GET /ytinfo?other=1 HTTP/1.1\r\n\r\n"), expected);
        assert_eq!(extractor.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_success_shape() {
        let (router, _) = router_with(full_info());
        assert_eq!(
            route_raw(&router, "GET /ytinfo?id=abc123 HTTP/1.1\r\n\r\n"),
            serde_json::json!({ "title": "T", "thumbnail": "u1", "audio_url": "a1" })
        );
    }

    #[test]
    fn test_empty_lists_yield_empty_strings() {
        let (router, _) = router_with(StreamInfo {
            name: "T".to_string(),
            ..StreamInfo::default()
        });
        assert_eq!(
            route_raw(&router, "GET /ytinfo?id=abc123 HTTP/1.1\r\n\r\n"),
            serde_json::json!({ "title": "T", "thumbnail": "", "audio_url": "" })
        );
    }

    #[test]
    fn test_extraction_failure_becomes_error_object() {
        let (router, _) = router_with(full_info());
        let request = parse_request(b"GET /ytinfo?id=bad HTTP/1.1\r\n\r\n").unwrap();
        let response = router.route(&request);
        assert!(response.is_error());
        assert_eq!(response, ApiResponse::error("This video is private"));
    }

    #[test]
    fn test_serialized_field_order() {
        let body = serde_json::to_string(&ApiResponse::descriptor()).unwrap();
        assert_eq!(
            body,
            r#"{"status":"success","message":"YT Audio Server running","endpoints":["/ytinfo?id=VIDEO_ID"]}"#
        );
    }
}
