// Connection handling module
// Accepts a TCP connection, enforces the connection limit and serves it with hyper

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::sync::Notify;

use super::signal::ShutdownSignal;
use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Counts live connections and wakes waiters when the count drops to zero
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    active: AtomicUsize,
    idle: Notify,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Reserve a slot, or `None` when `max` connections are already open
    pub fn try_acquire(self: &Arc<Self>, max: Option<u64>) -> Option<ConnectionGuard> {
        // Increment first, then check, so concurrent accepts cannot both slip under the limit
        let prev = self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ConnectionGuard(Arc::clone(self));
        match max {
            Some(max) if prev >= usize::try_from(max).unwrap_or(usize::MAX) => None,
            _ => Some(guard),
        }
    }

    /// Resolve once no connection is open
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Releases its slot on drop
#[derive(Debug)]
pub struct ConnectionGuard(Arc<ConnectionTracker>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.0.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Accept a connection, checking limits and logging, then serve it in a task
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<AppState>,
    tracker: &Arc<ConnectionTracker>,
    shutdown: &Arc<ShutdownSignal>,
) {
    let max_connections = state.config.performance.max_connections;
    let Some(guard) = tracker.try_acquire(max_connections) else {
        if let Some(max) = max_connections {
            logger::log_connection_limit(&peer_addr, max);
        }
        drop(stream);
        return;
    };

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(shutdown),
        guard,
    );
}

/// Serve one connection in a spawned task.
///
/// Keep-alive follows `performance.keep_alive_timeout`; the whole connection is
/// bounded by `max(read_timeout, write_timeout)`. On shutdown the connection
/// finishes its in-flight request and then closes.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: Arc<AppState>,
    shutdown: Arc<ShutdownSignal>,
    guard: ConnectionGuard,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let perf = &state.config.performance;
        let timeout_duration =
            Duration::from_secs(std::cmp::max(perf.read_timeout, perf.write_timeout));

        let mut builder = http1::Builder::new();
        builder.keep_alive(perf.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                handler::handle_request(req, Arc::clone(&service_state), peer_addr)
            }),
        );
        tokio::pin!(conn);

        let served = tokio::time::timeout(timeout_duration, async {
            let mut draining = false;
            loop {
                tokio::select! {
                    res = conn.as_mut() => break res,
                    () = shutdown.wait(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            }
        })
        .await;

        match served {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                timeout_duration.as_secs()
            )),
        }

        drop(guard);
    });
}
