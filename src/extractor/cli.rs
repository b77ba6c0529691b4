// yt-dlp extractor - uses the native `yt-dlp` binary
//
// yt-dlp performs its own network fetches, so the injected Downloader is
// not used for lookups; init only verifies that the binary answers.

use std::io::Read;
use std::process::{Command as StdCommand, Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use super::errors::{ExtractionError, ExtractionErrorKind};
use super::traits::{AudioStream, Extractor, StreamInfo};
use crate::config::ExtractorConfig;
use crate::downloader::Downloader;

/// How often a running yt-dlp is checked for exit
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound for `yt-dlp --version`
const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a program to completion, killing it once `limit` has elapsed.
///
/// Both pipes are drained on their own threads while the child runs.
fn run_output_with_timeout(
    program: &str,
    args: &[String],
    limit: Duration,
) -> Result<Output, ExtractionError> {
    let mut child = StdCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            ExtractionError::new(
                ExtractionErrorKind::ToolNotFound,
                format!("Failed to start {}: {}", program, e),
            )
        })?;

    let stdout_reader = child.stdout.take().map(drain_pipe);
    let stderr_reader = child.stderr.take().map(drain_pipe);

    let deadline = Instant::now() + limit;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(program, pid = child.id(), "killed after {:?}", limit);
                // Readers are left to finish on their own; a grandchild may
                // still hold the pipes open.
                return Err(ExtractionError::new(
                    ExtractionErrorKind::Network,
                    format!("{} timed out after {}s", program, limit.as_secs()),
                ));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(ExtractionError::new(
                    ExtractionErrorKind::Unknown,
                    format!("Failed to wait for {}: {}", program, e),
                ));
            }
        }
    };

    Ok(Output {
        status,
        stdout: join_pipe(stdout_reader),
        stderr: join_pipe(stderr_reader),
    })
}

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_pipe(reader: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// CLI-based extractor using the yt-dlp binary
pub struct YtDlpExtractor {
    ytdlp_path: String,
    config: ExtractorConfig,
    ready: AtomicBool,
}

impl YtDlpExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let ytdlp_path = config
            .ytdlp_path
            .clone()
            .unwrap_or_else(Self::find_ytdlp);
        Self {
            ytdlp_path,
            config,
            ready: AtomicBool::new(false),
        }
    }

    /// Find yt-dlp binary
    fn find_ytdlp() -> String {
        let common_paths = [
            "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
            "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac
            "/usr/bin/yt-dlp",          // System installation
        ];

        for path in common_paths {
            if std::path::Path::new(path).exists() {
                return path.to_string();
            }
        }

        "yt-dlp".to_string()
    }

    fn has_ytdlp_binary(&self) -> bool {
        let args = ["--version".to_string()];
        match run_output_with_timeout(&self.ytdlp_path, &args, VERSION_TIMEOUT) {
            Ok(out) => out.status.success(),
            Err(_) => false,
        }
    }

    /// Whole-process deadline for one lookup
    fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.config.timeout_seconds.max(1)))
    }

    fn build_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.timeout_seconds.to_string(),
        ];

        if let Some(client) = &self.config.player_client {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:player_client={}", client));
        }

        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.push(url.to_string());
        args
    }

    /// Parse `--dump-json` output
    pub fn parse_json(stdout: &[u8]) -> Result<StreamInfo, ExtractionError> {
        let json_str = String::from_utf8_lossy(stdout);
        let json: Value = serde_json::from_str(&json_str)
            .map_err(|e| ExtractionError::parse(format!("Invalid JSON: {}", e)))?;

        let mut thumbnails: Vec<String> = json["thumbnails"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|t| t["url"].as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();
        if thumbnails.is_empty() {
            if let Some(thumb) = json["thumbnail"].as_str() {
                thumbnails.push(thumb.to_string());
            }
        }

        let audio_streams = json["formats"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter(|f| {
                        let acodec = f["acodec"].as_str();
                        let vcodec = f["vcodec"].as_str();
                        acodec.map_or(false, |a| a != "none") && vcodec.map_or(true, |v| v == "none")
                    })
                    .filter_map(|f| {
                        Some(AudioStream {
                            url: f["url"].as_str()?.to_string(),
                            mime_type: f["ext"].as_str().map(|ext| format!("audio/{}", ext)),
                            bitrate: f["abr"].as_f64().map(|kbps| (kbps * 1000.0) as u64),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(StreamInfo {
            name: json["title"].as_str().unwrap_or("").to_string(),
            thumbnails,
            audio_streams,
        })
    }
}

impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    fn init(&self, _downloader: Arc<dyn Downloader>) -> Result<(), ExtractionError> {
        if !self.has_ytdlp_binary() {
            return Err(ExtractionError::new(
                ExtractionErrorKind::ToolNotFound,
                format!("yt-dlp binary not found at {}", self.ytdlp_path),
            ));
        }
        self.ready.store(true, Ordering::Release);
        tracing::debug!(extractor = self.name(), path = %self.ytdlp_path, "initialized");
        Ok(())
    }

    fn stream_info(&self, url: &str) -> Result<StreamInfo, ExtractionError> {
        if !self.ready.load(Ordering::Acquire) {
            return Err(ExtractionError::not_initialized(self.name()));
        }

        let args = self.build_args(url);
        tracing::debug!(extractor = self.name(), "running {} {}", self.ytdlp_path, args.join(" "));

        let output = run_output_with_timeout(&self.ytdlp_path, &args, self.lookup_timeout())?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::from_message(stderr.trim().to_string()));
        }

        Self::parse_json(&output.stdout)
    }
}
