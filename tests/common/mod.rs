//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use leave_relay::config::ProxyConfig;
use leave_relay::lifecycle::Shutdown;
use leave_relay::HttpServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Config pointing at a plain-HTTP upstream on `addr`, with an unreachable
/// database so nothing in the tests depends on PostgreSQL.
pub fn config_for_upstream(addr: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.scheme = "http".to_string();
    config.upstream.host = addr.ip().to_string();
    config.upstream.port = addr.port();
    config.database.host = "127.0.0.1".to_string();
    config.database.port = closed_port();
    config.database.acquire_timeout_secs = 1;
    config
}

pub fn config_for_mockito(server: &mockito::ServerGuard) -> ProxyConfig {
    config_for_upstream(server.host_with_port().parse().unwrap())
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Start the relay on an ephemeral port.
pub async fn spawn_relay(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Backend that accepts connections and never answers. `closed` counts the
/// connections the peer has closed.
pub async fn start_stalling_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let closed = Arc::new(AtomicUsize::new(0));
    let counter = closed.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let counter = counter.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => continue,
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    (addr, closed)
}

/// Backend that drops the first `failures` connections without a response,
/// then answers 200 with `body`. Returns the accepted-connection counter.
pub async fn start_flaky_backend(failures: usize, body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                if seen < failures {
                    drop(socket);
                    return;
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, accepted)
}

/// Poll `counter` until it reaches `target` or `deadline` passes.
pub async fn wait_for_count(counter: &AtomicUsize, target: usize, deadline: Duration) -> bool {
    let give_up = tokio::time::Instant::now() + deadline;
    while tokio::time::Instant::now() < give_up {
        if counter.load(Ordering::SeqCst) >= target {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    counter.load(Ordering::SeqCst) >= target
}
