//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::storage::FileStore;

use super::connection::Connection;
use super::handler::RequestHandler;
use super::pool::WorkerPool;
use super::registry::ConnectionRegistry;

/// How often the accept loop re-checks the shutdown flag when idle
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Cloneable trigger that asks a running server to stop
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the server to stop accepting and drain
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// The underlying flag, for signal handlers that set it directly
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// TCP server for FileVault
pub struct Server {
    config: Config,
    listener: TcpListener,
    handler: Arc<RequestHandler>,
    registry: Arc<ConnectionRegistry>,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listener described by `config`
    pub fn bind(config: Config, store: Arc<FileStore>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.listen_addr())?;
        // Non-blocking accept lets the loop notice shutdown requests.
        listener.set_nonblocking(true)?;

        let handler = Arc::new(RequestHandler::new(store, config.max_file_size));

        Ok(Self {
            config,
            listener,
            handler,
            registry: Arc::new(ConnectionRegistry::new()),
            shutdown: ShutdownHandle::new(),
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Start the server (blocking until shutdown completes)
    ///
    /// Shutdown is two-phase: stop accepting and let queued and in-flight
    /// connections finish within `shutdown_grace`; then drop whatever is still
    /// queued, shut down live sockets, and wait `force_shutdown_grace` more.
    pub fn run(self) -> Result<()> {
        let mut pool = WorkerPool::new(self.config.worker_threads)?;

        tracing::info!(
            workers = pool.size(),
            "Listening on {}",
            self.local_addr()?
        );

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => self.dispatch(&pool, stream, addr),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::error!("Error accepting connection: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        let Server {
            config,
            listener,
            registry,
            ..
        } = self;
        drop(listener);

        tracing::info!(
            in_flight = registry.len(),
            queued = pool.queued(),
            "Stopped accepting; waiting up to {:?}",
            config.shutdown_grace()
        );

        pool.close();
        if pool.await_termination(config.shutdown_grace()) {
            tracing::info!("Server stopped");
            return Ok(());
        }

        pool.cancel_pending();
        let aborted = registry.abort_all();
        tracing::warn!(aborted, "Grace period elapsed; cancelled remaining work");

        if pool.await_termination(config.force_shutdown_grace()) {
            tracing::info!("Server stopped");
        } else {
            tracing::error!("Workers did not terminate");
        }

        Ok(())
    }

    /// Hand an accepted stream to the pool
    fn dispatch(&self, pool: &WorkerPool, stream: TcpStream, addr: SocketAddr) {
        // Some platforms let accepted sockets inherit the listener's mode.
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping {}: {}", addr, e);
            return;
        }

        let registration = match self.registry.register(&stream) {
            Ok(registration) => registration,
            Err(e) => {
                tracing::warn!("Dropping {}: {}", addr, e);
                return;
            }
        };

        let handler = Arc::clone(&self.handler);
        let read_timeout = self.config.read_timeout();
        let write_timeout = self.config.write_timeout();

        let submitted = pool.execute(move || {
            let _registration = registration;

            let mut connection = match Connection::new(stream) {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::warn!("Could not set up connection from {}: {}", addr, e);
                    return;
                }
            };

            if let Err(e) = connection.set_timeouts(read_timeout, write_timeout) {
                tracing::warn!("Could not set timeouts for {}: {}", addr, e);
                return;
            }

            connection.handle(&handler);
        });

        if let Err(e) = submitted {
            tracing::error!("Could not queue connection from {}: {}", addr, e);
        }
    }
}
