// Service lifecycle - idempotent start/stop around the listener

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::lookup_host;
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinHandle;

use super::connection::ConnectionHandler;
use super::listener::Listener;
use super::router::Router;
use crate::config::ServerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

#[derive(Debug)]
pub enum LifecycleError {
    InvalidAddress(String),
    Bind { addr: SocketAddr, source: io::Error },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress(msg) => write!(f, "{}", msg),
            Self::Bind { addr, source } => write!(f, "failed to bind {}: {}", addr, source),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind { source, .. } => Some(source),
            Self::InvalidAddress(_) => None,
        }
    }
}

/// Resources that exist only while the service is running
struct RunningServer {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

/// Owns the listener and its connection pool for the Running state.
///
/// `start` and `stop` are idempotent and serialized; `stop` returns only
/// after the listening socket is released, so an immediate `start` can
/// rebind the same port.
pub struct ServiceLifecycle {
    config: ServerConfig,
    handler: Arc<ConnectionHandler>,
    running: Mutex<Option<RunningServer>>,
    state: watch::Sender<ServiceState>,
}

impl ServiceLifecycle {
    pub fn new(config: ServerConfig, router: Arc<Router>) -> Self {
        let handler = Arc::new(ConnectionHandler::new(
            router,
            config.read_buffer_size,
            config.read_timeout(),
        ));
        let (state, _) = watch::channel(ServiceState::Stopped);
        Self {
            config,
            handler,
            running: Mutex::new(None),
            state,
        }
    }

    pub fn status(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Address actually bound (resolves port 0), if running
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|s| s.local_addr)
    }

    /// Bind and launch the accept loop. No-op when already running.
    pub async fn start(&self) -> Result<SocketAddr, LifecycleError> {
        let mut running = self.running.lock().await;
        if let Some(server) = running.as_ref() {
            tracing::debug!(addr = %server.local_addr, "start ignored, already running");
            return Ok(server.local_addr);
        }

        self.set_state(ServiceState::Starting);

        let addr = match self.resolve_addr().await {
            Ok(addr) => addr,
            Err(e) => {
                self.set_state(ServiceState::Stopped);
                return Err(e);
            }
        };

        let listener = match Listener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.set_state(ServiceState::Stopped);
                return Err(LifecycleError::Bind { addr, source });
            }
        };

        let local_addr = listener.local_addr();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let slots = Arc::new(Semaphore::new(self.config.max_connections.max(1)));
        let accept_task = tokio::spawn(listener.run(
            Arc::clone(&self.handler),
            slots,
            shutdown_rx,
            self.config.shutdown_grace(),
        ));

        *running = Some(RunningServer {
            local_addr,
            shutdown,
            accept_task,
        });
        self.set_state(ServiceState::Running);
        tracing::info!(%local_addr, max_connections = self.config.max_connections, "server started");
        Ok(local_addr)
    }

    /// Close the listening socket and drain connections. No-op when stopped.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let server = match running.take() {
            Some(server) => server,
            None => {
                tracing::debug!("stop ignored, not running");
                return;
            }
        };

        self.set_state(ServiceState::Stopping);

        // Receiver gone means the accept loop already exited.
        let _ = server.shutdown.send(true);
        if let Err(e) = server.accept_task.await {
            tracing::error!(error = %e, "accept loop ended abnormally");
        }

        self.set_state(ServiceState::Stopped);
        tracing::info!(addr = %server.local_addr, "server stopped");
    }

    /// Host may be an IP literal or a name such as `localhost`; the first
    /// resolved address is bound.
    async fn resolve_addr(&self) -> Result<SocketAddr, LifecycleError> {
        let host = self.config.host.as_str();
        let port = self.config.port;
        let mut addrs = lookup_host((host, port)).await.map_err(|e| {
            LifecycleError::InvalidAddress(format!("invalid listen address {}:{}: {}", host, port, e))
        })?;
        addrs.next().ok_or_else(|| {
            LifecycleError::InvalidAddress(format!("no address found for {}:{}", host, port))
        })
    }

    fn set_state(&self, state: ServiceState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "service state");
        }
    }
}
