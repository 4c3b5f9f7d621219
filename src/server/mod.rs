pub mod connection;
pub mod session;

use crate::prelude::*;

pub use connection::Connection;
pub use session::Session;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Process-wide stop request.
///
/// The flag answers late subscribers; the channel wakes tasks already
/// waiting in `select!`.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        // no receivers just means nobody is waiting right now
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Resolves once SIGINT or SIGTERM arrives, then triggers.
    pub async fn on_signal(self) {
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to listen for SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    error!("Failed to listen for Ctrl+C: {}", e);
                    return;
                }
                info!("SIGINT received");
            }
            _ = terminate => info!("SIGTERM received"),
        }

        self.trigger();
    }
}

/// Open connections, kept for bookkeeping. Guarded by its own lock, never
/// held together with the session lock.
#[derive(Clone, Debug, Default)]
pub struct Connections {
    next_id: Arc<AtomicU64>,
    open: Arc<Mutex<HashMap<u64, SocketAddr>>>,
    closed: Arc<Notify>,
}

impl Connections {
    pub fn register(&self, addr: SocketAddr) -> Registration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut open) = self.open.lock() {
            open.insert(id, addr);
        }
        debug!("adding {}", addr);

        Registration {
            id,
            addr,
            connections: self.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.open.lock().map(|open| open.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves once every registration has been dropped.
    pub async fn drained(&self) {
        loop {
            let closed = self.closed.notified();
            tokio::pin!(closed);
            closed.as_mut().enable();

            if self.is_empty() {
                return;
            }
            closed.await;
        }
    }
}

/// Removes its connection from the registry when dropped.
#[derive(Debug)]
pub struct Registration {
    id: u64,
    addr: SocketAddr,
    connections: Connections,
}

impl Drop for Registration {
    fn drop(&mut self) {
        debug!("removing {}", self.addr);
        if let Ok(mut open) = self.connections.open.lock() {
            open.remove(&self.id);
        }
        self.connections.closed.notify_waiters();
    }
}

pub struct Server {
    session: Session,
    connections: Connections,
    shutdown: Shutdown,
}

impl Server {
    pub fn new(session: Session, shutdown: Shutdown) -> Self {
        Self {
            session,
            connections: Connections::default(),
            shutdown,
        }
    }

    pub async fn bind(settings: &config::Server) -> anyhow::Result<TcpListener> {
        let addr = settings.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|err| anyhow!("bind {}: {}", addr, err))?;

        info!("listening on {}", listener.local_addr()?);

        Ok(listener)
    }

    /// Accepts connections until shutdown is triggered, then waits for the
    /// open ones to answer what they are processing and close.
    ///
    /// Fails when the shutdown came from the device error limit, so the
    /// process exits non-zero and a supervisor restarts it.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        let mut shutdown_rx = self.shutdown.subscribe();

        while !self.shutdown.is_triggered() {
            tokio::select! {
                _ = shutdown_rx.recv() => break,

                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("accept failed: {}", e);
                            continue;
                        }
                    };

                    info!("new connection from {}", addr);

                    let registration = self.connections.register(addr);
                    let connection =
                        Connection::new(stream, addr, self.session.clone(), self.shutdown.clone());

                    tokio::spawn(async move {
                        let _registration = registration;
                        if let Err(e) = connection.run().await {
                            warn!("{}: {}", addr, e);
                        }
                        info!("{} disconnected", addr);
                    });
                }
            }
        }

        info!("server stopped accepting connections");
        drop(listener);

        let open = self.connections.len();
        if open > 0 {
            info!("waiting for {} connection(s) to finish", open);
        }
        self.connections.drained().await;

        if self.session.device_failed() {
            bail!("too many consecutive device errors, giving up");
        }

        Ok(())
    }
}
