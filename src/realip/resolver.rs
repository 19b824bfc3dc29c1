//! Header-resolution policy.
//!
//! # Responsibilities
//! - Walk the configured header specs in order
//! - Split multi-address header values and clean each token
//! - Apply positional depth selection and trust gating
//! - Yield the first non-empty candidate
//!
//! # Design Decisions
//! - The reserved name "clientAddress" is modeled as a tagged variant, not
//!   a string comparison inside the loop; it always reads the connection
//!   address and is exempt from trust gating
//! - Cleaned tokens are NOT validated as IP addresses; malformed values
//!   pass through so downstream consumers can observe and reject them
//! - Resolution never fails; every anomaly skips to the next candidate

use axum::http::HeaderMap;

use crate::config::schema::RealIpConfig;

/// Reserved header name bound to the connection's remote address.
pub const CONNECTION_ADDRESS_NAME: &str = "clientAddress";

/// Source of a header spec's raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderSource {
    /// A real request header, looked up case-insensitively.
    Named(String),
    /// The transport-layer remote address; exempt from trust gating.
    ConnectionAddress,
}

impl HeaderSource {
    pub fn from_name(name: &str) -> Self {
        if name == CONNECTION_ADDRESS_NAME {
            Self::ConnectionAddress
        } else {
            Self::Named(name.to_string())
        }
    }
}

/// One entry in the resolution order.
#[derive(Debug, Clone)]
pub struct HeaderSpec {
    pub source: HeaderSource,
    /// Any negative value = leftmost token; otherwise counted from the
    /// right, 0 being the rightmost.
    pub depth: i32,
}

/// Immutable resolution policy, built once at startup.
#[derive(Debug, Clone)]
pub struct ResolverPolicy {
    specs: Vec<HeaderSpec>,
    header_name: String,
    trusted_header: Option<String>,
    force_overwrite: bool,
    trust_all: bool,
}

impl ResolverPolicy {
    pub fn from_config(config: &RealIpConfig) -> Self {
        let specs = config
            .process_headers
            .iter()
            .map(|spec| HeaderSpec {
                source: HeaderSource::from_name(&spec.header_name),
                depth: spec.depth,
            })
            .collect();

        Self {
            specs,
            header_name: config.header_name.clone(),
            trusted_header: config.trusted_header.clone(),
            force_overwrite: config.force_overwrite,
            trust_all: config.trust_all,
        }
    }

    /// Destination header for the resolved address.
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Optional destination header for the "yes"/"no" trust indicator.
    pub fn trusted_header(&self) -> Option<&str> {
        self.trusted_header.as_deref()
    }

    pub fn force_overwrite(&self) -> bool {
        self.force_overwrite
    }

    pub fn trust_all(&self) -> bool {
        self.trust_all
    }

    /// Resolve the client address for one request.
    ///
    /// Walks the specs in order and returns the first non-empty candidate,
    /// or `None` when no spec yields a value. When trust gating is active
    /// (`trust_all` off) and the connection is untrusted, named headers are
    /// skipped without being read; only the connection-address source is
    /// consulted.
    pub fn resolve(
        &self,
        headers: &HeaderMap,
        connection_address: &str,
        is_trusted: bool,
    ) -> Option<String> {
        let gating_active = !self.trust_all;

        for spec in &self.specs {
            let raw = match &spec.source {
                HeaderSource::ConnectionAddress => connection_address,
                HeaderSource::Named(name) => {
                    if gating_active && !is_trusted {
                        continue;
                    }
                    match headers.get(name.as_str()).and_then(|v| v.to_str().ok()) {
                        Some(value) => value,
                        None => continue,
                    }
                }
            };

            if raw.is_empty() {
                continue;
            }

            let tokens: Vec<&str> = raw
                .split(',')
                .map(clean_address)
                .filter(|t| !t.is_empty())
                .collect();

            if tokens.is_empty() {
                continue;
            }

            let index = if spec.depth < 0 {
                0
            } else {
                let right_index = tokens.len() as i64 - 1 - spec.depth as i64;
                if right_index < 0 {
                    // depth out of bounds, skip this spec
                    continue;
                }
                right_index as usize
            };

            return Some(tokens[index].to_string());
        }

        None
    }
}

/// Trim whitespace and strip any port suffix from an address token.
///
/// Handles "host:port" and "[host]:port"; everything else is returned
/// trimmed but otherwise unchanged, including malformed addresses.
pub fn clean_address(token: &str) -> &str {
    strip_port(token.trim())
}

fn strip_port(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        // "[host]:port" form; anything else bracketed stays as-is
        if let Some(end) = rest.find(']') {
            let host = &rest[..end];
            if let Some(port) = rest[end + 1..].strip_prefix(':') {
                if !port.contains(':') {
                    return host;
                }
            }
        }
        return addr;
    }

    // Unbracketed: a single colon separates host from port. More than one
    // colon means a bare IPv6 address, which carries no port.
    match addr.rfind(':') {
        Some(idx) if !addr[..idx].contains(':') => &addr[..idx],
        _ => addr,
    }
}
