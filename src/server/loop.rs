// Server loop module
// Accepts connections until shutdown, then drains in-flight connections

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::{accept_connection, ConnectionTracker};
use super::signal::ShutdownSignal;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop until `shutdown` fires.
///
/// Afterwards waits up to `performance.shutdown_timeout` seconds for open
/// connections to finish and returns how many were still open.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<ShutdownSignal>,
) -> usize {
    let tracker = Arc::new(ConnectionTracker::new());

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &tracker, &shutdown);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.wait() => break,
        }
    }

    // Stop accepting before draining
    drop(listener);
    logger::log_shutdown_started(tracker.active());

    let grace = Duration::from_secs(state.config.performance.shutdown_timeout);
    let remaining = match tokio::time::timeout(grace, tracker.wait_idle()).await {
        Ok(()) => 0,
        Err(_) => tracker.active(),
    };
    logger::log_shutdown_complete(remaining);
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::fixtures;
    use crate::server::create_reusable_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_serves_then_shuts_down() {
        let mut config = Config::load_from("does-not-exist/quotelens").unwrap();
        config.logging.access_log = false;
        config.performance.shutdown_timeout = 1;
        let state = Arc::new(AppState::new(config, fixtures::models()));

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(ShutdownSignal::new());
        let server = tokio::spawn(start_server_loop(
            listener,
            state,
            Arc::clone(&shutdown),
        ));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with(r#"{"status":"ok"}"#));

        shutdown.trigger();
        let remaining = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
