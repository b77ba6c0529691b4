// YouTube extractor - queries the player endpoint through the injected Downloader
//
// One POST per lookup with a mobile client profile. Mobile clients receive
// direct stream URLs for most public videos, so no signature handling is
// needed for the audio entries we keep.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{json, Value};

use super::diagnostics::BlockingReason;
use super::errors::{ExtractionError, ExtractionErrorKind};
use super::traits::{AudioStream, Extractor, StreamInfo};
use crate::downloader::{Downloader, Request};

const PLAYER_ENDPOINT: &str = "https://www.youtube.com/youtubei/v1/player?prettyPrint=false";

lazy_static::lazy_static! {
    static ref VIDEO_ID_RE: Regex =
        Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/|/embed/)([^&#?/]+)").unwrap();
}

/// Client identity sent to the player endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientProfile {
    pub name: &'static str,
    pub version: &'static str,
    /// Numeric id sent in `X-YouTube-Client-Name`
    pub id: &'static str,
    pub user_agent: &'static str,
}

impl ClientProfile {
    pub const ANDROID: ClientProfile = ClientProfile {
        name: "ANDROID",
        version: "19.09.37",
        id: "3",
        user_agent: "com.google.android.youtube/19.09.37 (Linux; U; Android 11) gzip",
    };

    pub const IOS: ClientProfile = ClientProfile {
        name: "IOS",
        version: "19.09.3",
        id: "5",
        user_agent: "com.google.ios.youtube/19.09.3 (iPhone14,3; U; CPU iOS 15_6 like Mac OS X)",
    };

    /// Resolve a configured player client name ("android", "ios")
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|n| n.to_ascii_lowercase()) {
            Some(n) if n == "ios" => Self::IOS,
            _ => Self::ANDROID,
        }
    }

    fn context(&self) -> Value {
        let mut client = json!({
            "clientName": self.name,
            "clientVersion": self.version,
            "hl": "en",
            "gl": "US",
        });
        if self.name == "ANDROID" {
            client["androidSdkVersion"] = json!(30);
        } else {
            client["deviceModel"] = json!("iPhone14,3");
        }
        json!({ "client": client })
    }
}

pub struct YoutubeExtractor {
    client: ClientProfile,
    downloader: OnceLock<Arc<dyn Downloader>>,
}

impl YoutubeExtractor {
    pub fn new(client: ClientProfile) -> Self {
        Self {
            client,
            downloader: OnceLock::new(),
        }
    }

    /// Pull the video id out of a watch/short/embed URL
    pub fn video_id_from_url(url: &str) -> Option<String> {
        let raw = VIDEO_ID_RE.captures(url)?.get(1)?.as_str();
        let id = urlencoding::decode(raw)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    fn build_request(&self, video_id: &str) -> Result<Request, ExtractionError> {
        let body = json!({
            "context": self.client.context(),
            "videoId": video_id,
            "contentCheckOk": true,
            "racyCheckOk": true,
        });
        let body = serde_json::to_vec(&body)
            .map_err(|e| ExtractionError::parse(format!("Failed to encode player request: {}", e)))?;

        Ok(Request::post(PLAYER_ENDPOINT, body)
            .header("Content-Type", "application/json")
            .header("User-Agent", self.client.user_agent)
            .header("X-YouTube-Client-Name", self.client.id)
            .header("X-YouTube-Client-Version", self.client.version)
            .header("Origin", "https://www.youtube.com"))
    }

    /// Turn a player endpoint JSON body into StreamInfo
    pub fn parse_player_response(body: &str) -> Result<StreamInfo, ExtractionError> {
        let json: Value = serde_json::from_str(body)
            .map_err(|e| ExtractionError::parse(format!("Invalid JSON: {}", e)))?;

        let playability = json
            .get("playabilityStatus")
            .ok_or_else(|| ExtractionError::parse("No playabilityStatus in player response"))?;

        let status = playability["status"].as_str().unwrap_or("");
        if status != "OK" {
            let reason = playability["reason"]
                .as_str()
                .or_else(|| playability["messages"][0].as_str())
                .unwrap_or("Video is not playable");
            let mut err = ExtractionError::from_message(reason);
            if err.kind == ExtractionErrorKind::Unknown {
                err.kind = ExtractionErrorKind::Restricted(BlockingReason::Unknown);
            }
            return Err(err);
        }

        let details = json
            .get("videoDetails")
            .ok_or_else(|| ExtractionError::parse("No videoDetails in player response"))?;

        let thumbnails = details["thumbnail"]["thumbnails"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|t| t["url"].as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        let audio_streams = json["streamingData"]["adaptiveFormats"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter(|f| {
                        f["mimeType"]
                            .as_str()
                            .map_or(false, |m| m.starts_with("audio/"))
                    })
                    .filter_map(|f| {
                        Some(AudioStream {
                            url: f["url"].as_str()?.to_string(),
                            mime_type: f["mimeType"].as_str().map(|s| s.to_string()),
                            bitrate: f["bitrate"].as_u64(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(StreamInfo {
            name: details["title"].as_str().unwrap_or("").to_string(),
            thumbnails,
            audio_streams,
        })
    }
}

impl Default for YoutubeExtractor {
    fn default() -> Self {
        Self::new(ClientProfile::ANDROID)
    }
}

impl Extractor for YoutubeExtractor {
    fn name(&self) -> &'static str {
        "youtube-player"
    }

    fn init(&self, downloader: Arc<dyn Downloader>) -> Result<(), ExtractionError> {
        let name = downloader.name();
        if self.downloader.set(downloader).is_err() {
            tracing::debug!(extractor = self.name(), "already initialized, keeping first downloader");
        } else {
            tracing::debug!(extractor = self.name(), downloader = name, "initialized");
        }
        Ok(())
    }

    fn stream_info(&self, url: &str) -> Result<StreamInfo, ExtractionError> {
        let downloader = self
            .downloader
            .get()
            .ok_or_else(|| ExtractionError::not_initialized(self.name()))?;

        let video_id = Self::video_id_from_url(url).ok_or_else(|| {
            ExtractionError::new(
                ExtractionErrorKind::InvalidUrl,
                format!("Invalid URL: no video id in {}", url),
            )
        })?;

        let request = self.build_request(&video_id)?;
        let resp = downloader.execute(&request)?;

        if !resp.is_success() {
            let mut err =
                ExtractionError::from_message(format!("HTTP {} {}", resp.status, resp.message));
            if err.kind == ExtractionErrorKind::Unknown {
                err.kind = ExtractionErrorKind::Network;
            }
            return Err(err);
        }

        Self::parse_player_response(&resp.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::{DownloadError, Response};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct CannedDownloader {
        status: u16,
        body: String,
        seen: Mutex<Vec<Request>>,
    }

    impl CannedDownloader {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Downloader for CannedDownloader {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn execute(&self, request: &Request) -> Result<Response, DownloadError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(Response {
                status: self.status,
                message: if self.status == 429 { "Too Many Requests" } else { "OK" }.to_string(),
                headers: HashMap::new(),
                body: self.body.clone(),
                latest_url: request.url.clone(),
            })
        }
    }

    const PLAYABLE: &str = r#"{
        "playabilityStatus": {"status": "OK"},
        "videoDetails": {
            "videoId": "abc123",
            "title": "Test Video",
            "thumbnail": {"thumbnails": [
                {"url": "https://i.ytimg.com/vi/abc123/default.jpg", "width": 120},
                {"url": "https://i.ytimg.com/vi/abc123/hqdefault.jpg", "width": 480}
            ]}
        },
        "streamingData": {"adaptiveFormats": [
            {"itag": 137, "mimeType": "video/mp4; codecs=\"avc1.640028\"", "url": "https://v/137"},
            {"itag": 251, "mimeType": "audio/webm; codecs=\"opus\"", "signatureCipher": "s=xyz"},
            {"itag": 140, "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"", "bitrate": 130000, "url": "https://a/140"},
            {"itag": 249, "mimeType": "audio/webm; codecs=\"opus\"", "url": "https://a/249"}
        ]}
    }"#;

    #[test]
    fn test_video_id_from_url() {
        assert_eq!(
            YoutubeExtractor::video_id_from_url("https://www.youtube.com/watch?v=abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(
            YoutubeExtractor::video_id_from_url("https://youtu.be/xyz?t=3"),
            Some("xyz".to_string())
        );
        assert_eq!(
            YoutubeExtractor::video_id_from_url("https://www.youtube.com/watch?v=a%20b"),
            Some("a b".to_string())
        );
        assert_eq!(YoutubeExtractor::video_id_from_url("https://www.youtube.com/"), None);
    }

    #[test]
    fn test_parse_keeps_source_order_and_skips_ciphered_audio() {
        let info = YoutubeExtractor::parse_player_response(PLAYABLE).unwrap();
        assert_eq!(info.name, "Test Video");
        assert_eq!(info.thumbnails[0], "https://i.ytimg.com/vi/abc123/default.jpg");
        assert_eq!(info.audio_streams.len(), 2);
        assert_eq!(info.audio_streams[0].url, "https://a/140");
        assert_eq!(info.audio_streams[0].bitrate, Some(130000));
    }

    #[test]
    fn test_parse_without_thumbnails_or_audio() {
        let body = r#"{"playabilityStatus":{"status":"OK"},"videoDetails":{"title":"T"}}"#;
        let info = YoutubeExtractor::parse_player_response(body).unwrap();
        assert_eq!(info.name, "T");
        assert!(info.thumbnails.is_empty());
        assert!(info.audio_streams.is_empty());
    }

    #[test]
    fn test_parse_unplayable_reports_reason() {
        let body = r#"{"playabilityStatus":{"status":"LOGIN_REQUIRED","reason":"Sign in to confirm your age"}}"#;
        let err = YoutubeExtractor::parse_player_response(body).unwrap_err();
        assert_eq!(
            err.kind,
            ExtractionErrorKind::Restricted(BlockingReason::AgeRestricted)
        );
        assert_eq!(err.message, "Sign in to confirm your age");

        let body = r#"{"playabilityStatus":{"status":"UNPLAYABLE","reason":"Something new"}}"#;
        let err = YoutubeExtractor::parse_player_response(body).unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::Restricted(BlockingReason::Unknown));
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let err = YoutubeExtractor::parse_player_response("<html>").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::Parse);
        let err = YoutubeExtractor::parse_player_response("{}").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::Parse);
    }

    #[test]
    fn test_stream_info_requires_init() {
        let extractor = YoutubeExtractor::default();
        let err = extractor
            .stream_info("https://www.youtube.com/watch?v=abc123")
            .unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::NotInitialized);
    }

    #[test]
    fn test_stream_info_posts_player_request() {
        let downloader = CannedDownloader::new(200, PLAYABLE);
        let extractor = YoutubeExtractor::new(ClientProfile::IOS);
        extractor.init(downloader.clone()).unwrap();

        let info = extractor
            .stream_info("https://www.youtube.com/watch?v=abc123")
            .unwrap();
        assert_eq!(info.name, "Test Video");

        let seen = downloader.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "POST");
        assert!(seen[0].url.starts_with("https://www.youtube.com/youtubei/v1/player"));
        let body: Value = serde_json::from_slice(seen[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["videoId"], "abc123");
        assert_eq!(body["context"]["client"]["clientName"], "IOS");
    }

    #[test]
    fn test_http_429_is_rate_limited() {
        let downloader = CannedDownloader::new(429, "");
        let extractor = YoutubeExtractor::default();
        extractor.init(downloader).unwrap();

        let err = extractor
            .stream_info("https://www.youtube.com/watch?v=abc123")
            .unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::Restricted(BlockingReason::RateLimited));
    }

    #[test]
    fn test_client_profile_from_name() {
        assert_eq!(ClientProfile::from_name(Some("iOS")), ClientProfile::IOS);
        assert_eq!(ClientProfile::from_name(Some("tv")), ClientProfile::ANDROID);
        assert_eq!(ClientProfile::from_name(None), ClientProfile::ANDROID);
    }
}
