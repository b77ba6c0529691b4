// Connection handler - one read, one routed response, then close

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use super::request::{parse_request, ParseError};
use super::router::{ApiResponse, Router};

const FALLBACK_BODY: &str = r#"{"error":"Internal server error"}"#;

/// Frame a JSON body as a complete `200 OK` response.
///
/// Errors travel in the body; the status line is always 200.
pub fn frame_response(body: &str) -> Vec<u8> {
    let head = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );
    let mut bytes = Vec::with_capacity(head.len() + body.len());
    bytes.extend_from_slice(head.as_bytes());
    bytes.extend_from_slice(body.as_bytes());
    bytes
}

pub fn serialize_response(response: &ApiResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize response");
        FALLBACK_BODY.to_string()
    })
}

/// How a connection ended, for logging and tests
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A response was written
    Responded,
    /// Nothing usable was read; closed without a response
    Rejected(ParseError),
    /// Read or write failed at the transport level
    TransportError(String),
}

/// Runs one read, parse, route, write cycle per connection.
pub struct ConnectionHandler {
    router: Arc<Router>,
    read_buffer_size: usize,
    read_timeout: Duration,
}

impl ConnectionHandler {
    pub fn new(router: Arc<Router>, read_buffer_size: usize, read_timeout: Duration) -> Self {
        Self {
            router,
            read_buffer_size,
            read_timeout,
        }
    }

    /// Handle a connection and close it.
    ///
    /// The stream is owned by this call and dropped on every return path, so
    /// the socket is closed exactly once whatever fails.
    pub async fn handle<S>(&self, mut stream: S, peer: SocketAddr) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let outcome = self.serve(&mut stream, peer).await;
        match &outcome {
            Outcome::Responded => {}
            Outcome::Rejected(e) => tracing::debug!(%peer, error = %e, "closing without response"),
            Outcome::TransportError(e) => tracing::warn!(%peer, error = %e, "connection failed"),
        }
        // Flush FIN; the drop below releases the socket regardless.
        let _ = stream.shutdown().await;
        outcome
    }

    async fn serve<S>(&self, stream: &mut S, peer: SocketAddr) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; self.read_buffer_size];
        let n = match timeout(self.read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Outcome::TransportError(format!("read: {}", e)),
            Err(_) => return Outcome::Rejected(ParseError::Empty),
        };

        let request = match parse_request(&buf[..n]) {
            Ok(request) => request,
            Err(e) => return Outcome::Rejected(e),
        };

        tracing::info!(%peer, method = %request.method, path = %request.path, "request");

        // Routing may block on extraction: keep it off the async workers.
        let router = Arc::clone(&self.router);
        let response = match tokio::task::spawn_blocking(move || router.route(&request)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(%peer, error = %e, "routing task failed");
                ApiResponse::error("Internal server error")
            }
        };

        let body = serialize_response(&response);
        let bytes = frame_response(&body);

        if let Err(e) = stream.write_all(&bytes).await {
            return Outcome::TransportError(format!("write: {}", e));
        }
        if let Err(e) = stream.flush().await {
            return Outcome::TransportError(format!("flush: {}", e));
        }

        tracing::debug!(%peer, bytes = bytes.len(), error = response.is_error(), "response written");
        Outcome::Responded
    }
}
