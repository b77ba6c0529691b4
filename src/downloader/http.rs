// reqwest-backed Downloader

use std::collections::HashMap;
use std::time::Duration;

use tokio::runtime::Handle;

use super::errors::DownloadError;
use super::models::{NetworkConfig, Request, Response};
use super::traits::Downloader;

/// HTTP transport over a shared async `reqwest::Client`.
///
/// `execute` blocks on the captured runtime handle, so it must be called
/// from a blocking worker thread (`spawn_blocking`) or a plain OS thread.
pub struct HttpDownloader {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpDownloader {
    pub fn new(config: &NetworkConfig, runtime: Handle) -> Result<Self, DownloadError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());

        if let Some(secs) = config.timeout {
            builder = builder.timeout(Duration::from_secs(secs as u64));
        }

        if let Some(proxy_url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| DownloadError::InvalidProxy(format!("{}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| DownloadError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, runtime })
    }

    async fn fetch(&self, request: &Request) -> Result<Response, DownloadError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| DownloadError::Transport(format!("Unsupported method: {}", request.method)))?;

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let resp = builder.send().await?;

        let status = resp.status();
        let latest_url = resp.url().to_string();
        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in resp.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
        let body = resp.text().await?;

        Ok(Response {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
            latest_url,
        })
    }
}

impl Downloader for HttpDownloader {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    fn execute(&self, request: &Request) -> Result<Response, DownloadError> {
        tracing::debug!(method = %request.method, url = %request.url, "downloader request");
        let result = self.runtime.block_on(self.fetch(request));
        match &result {
            Ok(resp) => tracing::debug!(status = resp.status, url = %resp.latest_url, "downloader response"),
            Err(e) => tracing::debug!(error = %e, url = %request.url, "downloader failure"),
        }
        result
    }
}
