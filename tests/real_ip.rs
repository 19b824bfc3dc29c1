//! End-to-end tests for real-client-IP resolution through the proxy.

use std::net::SocketAddr;
use std::time::Duration;

use realip_proxy::config::{HeaderSpecConfig, ProxyConfig};
use realip_proxy::http::HttpServer;
use realip_proxy::lifecycle::Shutdown;

mod common;

fn test_config(proxy_addr: SocketAddr, upstream_addr: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.upstream.address = upstream_addr.to_string();
    config
}

async fn start_proxy(config: ProxyConfig, proxy_addr: SocketAddr) -> Shutdown {
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).expect("server should build");
    let listener = tokio::net::TcpListener::bind(proxy_addr).await.unwrap();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_forwarded_for_rewrites_real_ip() {
    let upstream_addr: SocketAddr = "127.0.0.1:28411".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28412".parse().unwrap();
    common::start_echo_upstream(upstream_addr).await;

    // default policy: trust all, X-Forwarded-For first, leftmost token
    let config = test_config(proxy_addr, upstream_addr);
    let shutdown = start_proxy(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/echo", proxy_addr))
        .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
        .send()
        .await
        .expect("proxy unreachable");

    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert_eq!(
        common::echoed_header(&body, "x-real-ip").as_deref(),
        Some("203.0.113.7")
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_untrusted_connection_falls_back_to_connection_address() {
    let upstream_addr: SocketAddr = "127.0.0.1:28421".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28422".parse().unwrap();
    common::start_echo_upstream(upstream_addr).await;

    let mut config = test_config(proxy_addr, upstream_addr);
    // loopback is NOT in the trusted set, so the spoofed header must be
    // ignored and the connection address used instead
    config.real_ip.trust_all = false;
    config.real_ip.trusted_ips = vec!["10.0.0.0/8".to_string()];
    config.real_ip.trusted_header = Some("X-Is-Trusted".to_string());
    let shutdown = start_proxy(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/", proxy_addr))
        .header("X-Forwarded-For", "fake-ip")
        .send()
        .await
        .expect("proxy unreachable");

    let body = res.text().await.unwrap();
    assert_eq!(
        common::echoed_header(&body, "x-real-ip").as_deref(),
        Some("127.0.0.1")
    );
    assert_eq!(
        common::echoed_header(&body, "x-is-trusted").as_deref(),
        Some("no")
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_trusted_connection_honors_header() {
    let upstream_addr: SocketAddr = "127.0.0.1:28431".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28432".parse().unwrap();
    common::start_echo_upstream(upstream_addr).await;

    let mut config = test_config(proxy_addr, upstream_addr);
    config.real_ip.trust_all = false;
    config.real_ip.trusted_ips = vec!["127.0.0.0/8".to_string()];
    config.real_ip.trusted_header = Some("X-Is-Trusted".to_string());
    let shutdown = start_proxy(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/", proxy_addr))
        .header("X-Forwarded-For", "198.51.100.42")
        .send()
        .await
        .expect("proxy unreachable");

    let body = res.text().await.unwrap();
    assert_eq!(
        common::echoed_header(&body, "x-real-ip").as_deref(),
        Some("198.51.100.42")
    );
    assert_eq!(
        common::echoed_header(&body, "x-is-trusted").as_deref(),
        Some("yes")
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_force_overwrite_neutralizes_spoofed_header() {
    let upstream_addr: SocketAddr = "127.0.0.1:28441".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28442".parse().unwrap();
    common::start_echo_upstream(upstream_addr).await;

    let mut config = test_config(proxy_addr, upstream_addr);
    // only consult a header the client never sends
    config.real_ip.process_headers = vec![HeaderSpecConfig {
        header_name: "X-Custom-IP".to_string(),
        depth: -1,
    }];
    config.real_ip.force_overwrite = true;
    let shutdown = start_proxy(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/", proxy_addr))
        .header("X-Real-IP", "spoofed")
        .send()
        .await
        .expect("proxy unreachable");

    let body = res.text().await.unwrap();
    // overwritten with the empty string, not left as "spoofed"
    assert_eq!(common::echoed_header(&body, "x-real-ip").as_deref(), Some(""));

    shutdown.trigger();
}

#[tokio::test]
async fn test_without_force_overwrite_existing_header_survives() {
    let upstream_addr: SocketAddr = "127.0.0.1:28451".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28452".parse().unwrap();
    common::start_echo_upstream(upstream_addr).await;

    let mut config = test_config(proxy_addr, upstream_addr);
    config.real_ip.process_headers = vec![HeaderSpecConfig {
        header_name: "X-Custom-IP".to_string(),
        depth: -1,
    }];
    config.real_ip.force_overwrite = false;
    let shutdown = start_proxy(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/", proxy_addr))
        .header("X-Real-IP", "spoofed")
        .send()
        .await
        .expect("proxy unreachable");

    let body = res.text().await.unwrap();
    assert_eq!(
        common::echoed_header(&body, "x-real-ip").as_deref(),
        Some("spoofed")
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_disabled_middleware_is_a_passthrough() {
    let upstream_addr: SocketAddr = "127.0.0.1:28461".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28462".parse().unwrap();
    common::start_echo_upstream(upstream_addr).await;

    let mut config = test_config(proxy_addr, upstream_addr);
    config.real_ip.enabled = false;
    let shutdown = start_proxy(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/", proxy_addr))
        .header("X-Real-IP", "client-supplied")
        .send()
        .await
        .expect("proxy unreachable");

    let body = res.text().await.unwrap();
    // nothing rewritten when the feature is off
    assert_eq!(
        common::echoed_header(&body, "x-real-ip").as_deref(),
        Some("client-supplied")
    );

    shutdown.trigger();
}
