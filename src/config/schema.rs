//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream server requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Real-client-IP resolution settings.
    pub real_ip: RealIpConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// A header to process with positional depth selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderSpecConfig {
    /// Name of the header to check. The reserved name "clientAddress"
    /// refers to the connection's remote address instead of a header.
    pub header_name: String,

    /// Depth for address extraction: any negative value = leftmost,
    /// 0 = rightmost, 1 = second from right, etc.
    #[serde(default = "default_depth")]
    pub depth: i32,
}

fn default_depth() -> i32 {
    -1
}

/// Real-client-IP resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RealIpConfig {
    /// Enable/disable resolution. When disabled the middleware is a passthrough.
    pub enabled: bool,

    /// Header name where the resolved address is written.
    pub header_name: String,

    /// Ordered list of headers to process.
    pub process_headers: Vec<HeaderSpecConfig>,

    /// Always set the destination header, even if empty, so clients cannot
    /// smuggle a spoofed value through.
    pub force_overwrite: bool,

    /// Trust every connection; disables trust gating entirely.
    pub trust_all: bool,

    /// CIDR blocks of trusted proxy addresses (required when trust_all is false).
    pub trusted_ips: Vec<String>,

    /// Optional header name for the "yes"/"no" trust indicator.
    pub trusted_header: Option<String>,
}

impl Default for RealIpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: "X-Real-IP".to_string(),
            process_headers: vec![
                HeaderSpecConfig {
                    header_name: "X-Forwarded-For".to_string(),
                    depth: -1,
                },
                HeaderSpecConfig {
                    header_name: "X-Real-IP".to_string(),
                    depth: -1,
                },
                HeaderSpecConfig {
                    header_name: "CF-Connecting-IP".to_string(),
                    depth: -1,
                },
                HeaderSpecConfig {
                    header_name: "clientAddress".to_string(),
                    depth: -1,
                },
            ],
            force_overwrite: true,
            trust_all: true,
            trusted_ips: Vec::new(),
            trusted_header: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
