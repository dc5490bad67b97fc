//! HTTP server: accept loops and graceful shutdown.
//!
//! Each worker owns its own SO_REUSEPORT listener and accepts in a loop;
//! every accepted connection is served on its own task. Shutdown flows
//! through a watch channel: accept loops stop, in-flight connections
//! drain, and [`Server::wait_for_drain`] bounds how long that may take.

pub mod connection;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::router::Router;
use connection::ConnectionContext;

/// HTTP server driving a [`Router`].
pub struct Server {
    config: AppConfig,
    router: Arc<Router>,
    /// Active connections counter
    active_connections: Arc<AtomicUsize>,
    /// Shutdown signal sender
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver (cloneable)
    shutdown_rx: watch::Receiver<bool>,
    /// Shutdown initiated flag
    shutdown_initiated: Arc<AtomicBool>,
}

impl Server {
    /// Create a server for the given configuration and route table.
    pub fn new(config: AppConfig, router: Router) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            router: Arc::new(router),
            active_connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
            shutdown_rx,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a socket with SO_REUSEPORT for multi-worker accept.
    fn create_reuse_port_listener(addr: SocketAddr) -> std::io::Result<std::net::TcpListener> {
        let domain = if addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;

        // SO_REUSEPORT allows multiple sockets to bind to the same port
        #[cfg(unix)]
        socket.set_reuse_port(true)?;

        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(1024)?;

        Ok(socket.into())
    }

    /// Run the server.
    /// Spawns worker accept loops and waits for the shutdown signal.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let num_workers = if self.config.workers == 0 {
            num_cpus::get()
        } else {
            self.config.workers
        };

        info!(
            "Server listening on http://{} (workers: {})",
            self.config.listen_addr, num_workers
        );

        let ctx = Arc::new(ConnectionContext {
            router: Arc::clone(&self.router),
            active_connections: Arc::clone(&self.active_connections),
            access_log_enabled: self.config.access_log,
        });

        let mut handles = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let addr = self.config.listen_addr;
            let mut shutdown_rx = self.shutdown_rx.clone();
            let ctx = Arc::clone(&ctx);

            let handle = tokio::spawn(async move {
                // Each worker creates its own listener with SO_REUSEPORT
                let std_listener = match Self::create_reuse_port_listener(addr) {
                    Ok(l) => l,
                    Err(e) => {
                        error!("Worker {}: Failed to create listener: {}", worker_id, e);
                        return;
                    }
                };

                let listener = match TcpListener::from_std(std_listener) {
                    Ok(l) => l,
                    Err(e) => {
                        error!("Worker {}: Failed to convert listener: {}", worker_id, e);
                        return;
                    }
                };

                debug!("Worker {} started", worker_id);

                loop {
                    tokio::select! {
                        result = listener.accept() => {
                            let (stream, remote_addr) = match result {
                                Ok(conn) => conn,
                                Err(e) => {
                                    error!("Worker {}: Accept error: {}", worker_id, e);
                                    continue;
                                }
                            };

                            let _ = stream.set_nodelay(true);

                            // Detect dead peers instead of holding
                            // connections open forever
                            let keepalive = TcpKeepalive::new()
                                .with_time(Duration::from_secs(5))
                                .with_interval(Duration::from_secs(1))
                                .with_retries(3);
                            let sock_ref = SockRef::from(&stream);
                            let _ = sock_ref.set_tcp_keepalive(&keepalive);

                            let ctx = Arc::clone(&ctx);
                            tokio::spawn(async move {
                                ctx.handle_connection(stream, remote_addr).await;
                            });
                        }
                        _ = shutdown_rx.changed() => {
                            debug!("Worker {} received shutdown signal, stopping accept loop", worker_id);
                            break;
                        }
                    }
                }
            });

            handles.push(handle);
        }

        // Wait for all workers to stop accepting
        for handle in handles {
            let _ = handle.await;
        }

        Ok(())
    }

    /// Trigger graceful shutdown.
    /// Signals all workers to stop accepting new connections.
    pub fn trigger_shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            return; // Already initiated
        }
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured drain timeout.
    pub fn drain_timeout(&self) -> Duration {
        self.config.drain_timeout
    }

    /// Get current active connections count.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Wait for all active connections to drain.
    /// Returns true if drained successfully, false if timeout was reached.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        let check_interval = Duration::from_millis(100);

        loop {
            let active = self.active_connections.load(Ordering::Relaxed);
            if active == 0 {
                return true;
            }

            if start.elapsed() >= timeout {
                warn!("Drain timeout reached with {} active connections", active);
                return false;
            }

            debug!("Waiting for {} connections to drain...", active);
            tokio::time::sleep(check_interval).await;
        }
    }
}
