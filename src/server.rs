//! Listener ownership and process lifecycle.
//!
//! `Server` binds the listener and serves the router on a background task.
//! `run_until_signal` parks the caller on a termination signal and then
//! drains the server within a bounded deadline.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Lifecycle of a `Server`. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("server loop failed: {0}")]
    Serve(#[from] io::Error),
    #[error("server task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("in-flight requests still running after {0:?}; abandoned")]
    ShutdownTimeout(Duration),
}

pub struct Server {
    local_addr: SocketAddr,
    state: ServerState,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<io::Result<()>>>,
}

impl Server {
    /// Bind `addr` and start serving `router` on a background task. A bind
    /// failure is returned to the caller; there is no retry.
    pub async fn start(addr: SocketAddr, router: Router) -> Result<Self, ServerError> {
        let mut state = ServerState::Starting;
        tracing::debug!(%addr, ?state, "binding listener");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    // A dropped sender also means stop.
                    let _ = stop_rx.await;
                })
                .await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "server loop exited with error");
            }
            result
        });
        state = ServerState::Running;
        tracing::info!(addr = %local_addr, "server listening");

        Ok(Self {
            local_addr,
            state,
            stop_tx: Some(stop_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Stop accepting connections and wait for in-flight requests, at most
    /// `deadline`. Whatever is still running at the deadline is abandoned.
    /// The server ends up `Stopped` whatever the outcome.
    pub async fn shutdown(&mut self, deadline: Duration) -> Result<(), ServerError> {
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };
        self.state = ServerState::Draining;
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }

        let outcome = match tokio::time::timeout(deadline, &mut task).await {
            Ok(joined) => match joined {
                Ok(served) => served.map_err(ServerError::from),
                Err(e) => Err(ServerError::from(e)),
            },
            Err(_) => {
                task.abort();
                Err(ServerError::ShutdownTimeout(deadline))
            }
        };
        self.state = ServerState::Stopped;
        outcome
    }
}

/// Resolves on the first SIGINT (Ctrl+C) or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}

/// Block until `signal` resolves, then drain `server` within `deadline`.
/// Shutdown errors are logged and handed back; they are not fatal.
pub async fn run_until_signal<F>(
    mut server: Server,
    signal: F,
    deadline: Duration,
) -> Result<(), ServerError>
where
    F: Future<Output = ()>,
{
    signal.await;
    tracing::info!(timeout = ?deadline, "shutting down server");
    let result = server.shutdown(deadline).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "error shutting down server");
    }
    tracing::info!("server shut down");
    result
}
