//! Shared utilities for integration testing.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock upstream that echoes the request headers it received.
///
/// The response body contains one `name:value` line per header, with the
/// name lowercased and surrounding whitespace trimmed, so tests can assert
/// exactly what the proxy forwarded.
pub async fn start_echo_upstream(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        loop {
                            match socket.read(&mut chunk).await {
                                Ok(0) => break,
                                Ok(n) => {
                                    buf.extend_from_slice(&chunk[..n]);
                                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                        break;
                                    }
                                }
                                Err(_) => return,
                            }
                        }

                        let head = String::from_utf8_lossy(&buf);
                        let mut body = String::new();
                        for line in head.lines().skip(1) {
                            if line.is_empty() {
                                break;
                            }
                            if let Some((name, value)) = line.split_once(':') {
                                body.push_str(&name.trim().to_lowercase());
                                body.push(':');
                                body.push_str(value.trim());
                                body.push('\n');
                            }
                        }

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Extract a header echoed by [`start_echo_upstream`] from a response body.
///
/// Returns `None` when the header was absent from the forwarded request,
/// `Some("")` when it was forwarded with an empty value.
pub fn echoed_header(body: &str, name: &str) -> Option<String> {
    let prefix = format!("{}:", name.to_lowercase());
    body.lines()
        .find(|line| line.starts_with(&prefix))
        .map(|line| line[prefix.len()..].to_string())
}
