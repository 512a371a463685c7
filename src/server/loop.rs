// Server loop module
// Accepts connections until the shutdown future resolves, then drains

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// How long in-flight connections get to finish after shutdown starts
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run the accept loop until `shutdown` resolves.
///
/// The listener is dropped as soon as shutdown begins; connections already
/// being served get up to `DRAIN_TIMEOUT` to complete.
pub async fn start_server_loop<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: F,
) where
    F: Future<Output = &'static str>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            reason = &mut shutdown => {
                logger::log_shutdown(reason);
                break;
            }
        }
    }

    drop(listener);
    drain_connections(&active_connections, DRAIN_TIMEOUT).await;
}

/// Wait until no connection is active or `timeout` elapses
async fn drain_connections(active_connections: &AtomicUsize, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let remaining = active_connections.load(Ordering::SeqCst);
        if remaining == 0 {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutting down with {remaining} connection(s) still open"
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_drain_returns_when_idle() {
        let counter = AtomicUsize::new(0);
        tokio::time::timeout(
            Duration::from_secs(1),
            drain_connections(&counter, Duration::from_secs(10)),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_timeout() {
        let counter = AtomicUsize::new(2);
        drain_connections(&counter, Duration::from_millis(120)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let mut cfg = Config::load_from("definitely/not/a/config/file").unwrap();
        cfg.logging.access_log = false;
        let state = Arc::new(AppState::new(&cfg));

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(start_server_loop(
            listener,
            state,
            Arc::new(AtomicUsize::new(0)),
            async move {
                let _ = stop_rx.await;
                "test finished"
            },
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /load/unknown HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 404"), "response: {raw}");
        assert!(raw.contains(r#"{"status":"error","message":"Data not found"}"#));

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(10), server)
            .await
            .unwrap()
            .unwrap();
    }
}
