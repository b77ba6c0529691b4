#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use ytaudio_server::downloader::{DownloadError, Downloader, Request, Response};
use ytaudio_server::extractor::{AudioStream, ExtractionError, Extractor, StreamInfo};
use ytaudio_server::server::{Router, ServiceLifecycle, VideoInfoResolver};
use ytaudio_server::ServerConfig;

pub const SLOW_DELAY: Duration = Duration::from_millis(1500);

pub struct NoopDownloader;

impl Downloader for NoopDownloader {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn execute(&self, _request: &Request) -> Result<Response, DownloadError> {
        Err(DownloadError::Transport("unused".to_string()))
    }
}

/// Scripted by video id:
/// - `bad` fails
/// - `empty` has no thumbnails or audio
/// - `slow` sleeps for SLOW_DELAY first
/// - anything else returns title "T", thumbnail "u1", audio "a1"
pub struct ScriptedExtractor {
    pub inits: AtomicUsize,
    pub lookups: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inits: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
        })
    }
}

impl Extractor for ScriptedExtractor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn init(&self, _downloader: Arc<dyn Downloader>) -> Result<(), ExtractionError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stream_info(&self, url: &str) -> Result<StreamInfo, ExtractionError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let id = url.rsplit("v=").next().unwrap_or("");
        match id {
            "bad" => Err(ExtractionError::from_message("Video unavailable")),
            "empty" => Ok(StreamInfo {
                name: "T".to_string(),
                ..StreamInfo::default()
            }),
            _ => {
                if id == "slow" {
                    std::thread::sleep(SLOW_DELAY);
                }
                Ok(StreamInfo {
                    name: "T".to_string(),
                    thumbnails: vec!["u1".to_string(), "u2".to_string()],
                    audio_streams: vec![AudioStream {
                        url: "a1".to_string(),
                        mime_type: Some("audio/mp4".to_string()),
                        bitrate: Some(128_000),
                    }],
                })
            }
        }
    }
}

pub fn test_config(port: u16) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        read_timeout_secs: 2,
        shutdown_grace_secs: 3,
        ..ServerConfig::default()
    }
}

pub fn service(config: ServerConfig, extractor: Arc<ScriptedExtractor>) -> ServiceLifecycle {
    let resolver = VideoInfoResolver::new(extractor, Arc::new(NoopDownloader));
    ServiceLifecycle::new(config, Arc::new(Router::new(resolver)))
}

/// Port that was free a moment ago
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Send raw bytes and read until the server closes the connection
pub async fn send_raw(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    out
}

pub struct HttpReply {
    pub head: String,
    pub body: serde_json::Value,
}

impl HttpReply {
    pub fn header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}: ", name.to_ascii_lowercase());
        self.head.split("\r\n").find_map(|line| {
            if line.to_ascii_lowercase().starts_with(&prefix) {
                Some(line[prefix.len()..].trim())
            } else {
                None
            }
        })
    }
}

pub async fn get(addr: SocketAddr, target: &str) -> HttpReply {
    let raw = format!("GET {} HTTP/1.1\r\nHost: test\r\n\r\n", target);
    parse_reply(&send_raw(addr, raw.as_bytes()).await)
}

pub fn parse_reply(bytes: &[u8]) -> HttpReply {
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let (head, body) = text.split_once("\r\n\r\n").expect("header terminator");
    let reply = HttpReply {
        head: head.to_string(),
        body: serde_json::from_str(body).expect("json body"),
    };
    assert_eq!(
        reply.header("Content-Length").unwrap().parse::<usize>().unwrap(),
        body.len(),
        "Content-Length must match body bytes"
    );
    reply
}
