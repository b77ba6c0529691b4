// ytaudio-server - command-line entry point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::runtime::Handle;

use ytaudio_server::extractor::ExtractorBackend;
use ytaudio_server::{build_service, AppConfig, ServiceLifecycle};

/// Serve video title, thumbnail and audio URL lookups over HTTP
#[derive(Parser, Debug)]
#[command(name = "ytaudio-server", version, about, long_about = None)]
struct Cli {
    /// JSON config file (default: <config dir>/ytaudio-server/config.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "YTAUDIO_PORT")]
    port: Option<u16>,

    /// Listen address
    #[arg(long, env = "YTAUDIO_HOST")]
    host: Option<String>,

    /// Extraction backend
    #[arg(long, value_enum, env = "YTAUDIO_EXTRACTOR")]
    extractor: Option<ExtractorBackend>,

    /// SOCKS5/HTTP proxy for extractor traffic
    #[arg(long, env = "YTAUDIO_PROXY")]
    proxy: Option<String>,

    /// YouTube player client (android, ios, ...)
    #[arg(long)]
    player_client: Option<String>,

    /// Per-lookup timeout in seconds
    #[arg(long, env = "YTAUDIO_TIMEOUT")]
    timeout: Option<u32>,

    /// yt-dlp binary for the ytdlp backend
    #[arg(long)]
    ytdlp_path: Option<String>,

    /// Maximum connections handled at once
    #[arg(long)]
    max_connections: Option<usize>,

    /// Default log filter (RUST_LOG overrides)
    #[arg(long, env = "YTAUDIO_LOG")]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(max) = self.max_connections {
            config.server.max_connections = max;
        }

        let mut extractor = config.extractor;
        if let Some(backend) = self.extractor {
            extractor = extractor.with_backend(backend);
        }
        if let Some(seconds) = self.timeout {
            extractor = extractor.with_timeout(seconds);
        }
        if self.proxy.is_some() {
            extractor = extractor.with_proxy(self.proxy);
        }
        if self.player_client.is_some() {
            extractor = extractor.with_player_client(self.player_client);
        }
        if self.ytdlp_path.is_some() {
            extractor = extractor.with_ytdlp_path(self.ytdlp_path);
        }
        config.extractor = extractor;

        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    ytaudio_server::logging::init(&config.log_level)?;

    let service = build_service(&config, Handle::current())?;
    service.start().await.context("failed to start server")?;

    run_until_shutdown(&service).await?;

    service.stop().await;
    Ok(())
}

/// Block until Ctrl-C/SIGTERM. SIGHUP restarts the listener.
#[cfg(unix)]
async fn run_until_shutdown(service: &ServiceLifecycle) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("failed to listen for Ctrl-C")?;
                tracing::info!("interrupt received, shutting down");
                return Ok(());
            }
            _ = terminate.recv() => {
                tracing::info!("SIGTERM received, shutting down");
                return Ok(());
            }
            _ = hangup.recv() => {
                tracing::info!("SIGHUP received, restarting listener");
                service.stop().await;
                if let Err(e) = service.start().await {
                    tracing::error!(error = %e, "restart failed");
                    return Err(e).context("failed to restart server");
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn run_until_shutdown(_service: &ServiceLifecycle) -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("interrupt received, shutting down");
    Ok(())
}
