// Listener - accept loop with bounded concurrency and graceful drain

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;

use super::connection::ConnectionHandler;

/// Pause after a failed accept so EMFILE and friends do not spin the loop
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Bound listening socket plus its accept loop.
pub struct Listener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept until `shutdown` flips to true (or its sender is dropped).
    ///
    /// Each connection runs as its own task holding one of `slots`; when all
    /// slots are taken, accepting pauses. On shutdown the socket is closed
    /// first, then in-flight connections get `grace` to finish before they
    /// are aborted. Returns once the socket is released and no connection
    /// task remains.
    pub async fn run(
        self,
        handler: Arc<ConnectionHandler>,
        slots: Arc<Semaphore>,
        mut shutdown: watch::Receiver<bool>,
        grace: Duration,
    ) {
        let Listener {
            listener,
            local_addr,
        } = self;
        let mut tasks = JoinSet::new();

        tracing::debug!(%local_addr, "accept loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let permit = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        if *shutdown.borrow() {
                            break;
                        }
                        tracing::warn!(%local_addr, error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };

            tracing::debug!(%peer, "accepted");
            let handler = Arc::clone(&handler);
            tasks.spawn(async move {
                let _permit = permit;
                handler.handle(stream, peer).await;
            });

            while let Some(result) = tasks.try_join_next() {
                log_task_result(result);
            }
        }

        drop(listener);
        tracing::debug!(%local_addr, in_flight = tasks.len(), "listening socket closed");

        let drained = timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                log_task_result(result);
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = tasks.len(),
                "shutdown grace period elapsed, aborting connections"
            );
            tasks.shutdown().await;
        }
    }
}

fn log_task_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "connection task panicked");
        }
    }
}
