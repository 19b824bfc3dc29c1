//! Real-client-IP middleware.
//!
//! Classifies the connection address, resolves the client address from the
//! configured headers, and rewrites the request headers before the request
//! reaches the forwarding handler.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;
use crate::realip::resolver::{clean_address, ResolverPolicy};
use crate::realip::trust::TrustTable;

/// State required by the middleware, built once at startup.
#[derive(Clone)]
pub struct RealIpState {
    pub enabled: bool,
    pub policy: Arc<ResolverPolicy>,
    pub trust: Arc<TrustTable>,
}

/// Resolved client address, attached to the request as an extension for
/// downstream consumers (handlers, access logging).
#[derive(Clone, Debug)]
pub struct RealClientIp(pub String);

pub async fn real_ip_middleware(
    State(state): State<RealIpState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled {
        return next.run(req).await;
    }

    let connection_address = addr.to_string();
    let is_trusted = is_connection_trusted(&state.trust, state.policy.trust_all(), &connection_address);

    if !is_trusted {
        metrics::record_untrusted_connection();
    }

    let resolved = state
        .policy
        .resolve(req.headers(), &connection_address, is_trusted);

    tracing::debug!(
        client = %connection_address,
        trusted = is_trusted,
        resolved_ip = resolved.as_deref().unwrap_or(""),
        "Resolved client address"
    );

    apply(&state.policy, req.headers_mut(), is_trusted, resolved.as_deref());

    if let Some(ip) = resolved {
        req.extensions_mut().insert(RealClientIp(ip));
    }

    next.run(req).await
}

/// Classify the raw connection address against the trust table.
///
/// A trust-all policy short-circuits to trusted. Otherwise the address is
/// cleaned of its port suffix and parsed; any parse failure classifies as
/// untrusted rather than failing the request.
fn is_connection_trusted(trust: &TrustTable, trust_all: bool, connection_address: &str) -> bool {
    if trust_all {
        return true;
    }

    let host = clean_address(connection_address);
    if host.is_empty() {
        return false;
    }

    match trust.lookup(host) {
        Ok(matched) => matched.is_some(),
        Err(_) => {
            tracing::debug!(client = %connection_address, "Unparseable connection address, treating as untrusted");
            false
        }
    }
}

/// Apply the resolution result to the request headers.
///
/// The trust indicator, when configured, is always written. The destination
/// header is written unconditionally under force-overwrite (an empty value
/// neutralizes any client-supplied spoof); otherwise only a non-empty
/// resolution is written and an existing value is left untouched.
fn apply(policy: &ResolverPolicy, headers: &mut HeaderMap, is_trusted: bool, resolved: Option<&str>) {
    if let Some(name) = policy.trusted_header() {
        let flag = if is_trusted { "yes" } else { "no" };
        set_header(headers, name, flag);
    }

    match resolved {
        Some(ip) => set_header(headers, policy.header_name(), ip),
        None if policy.force_overwrite() => set_header(headers, policy.header_name(), ""),
        None => {}
    }
}

/// Write a header, dropping the write (never the request) when the name or
/// value is not representable.
fn set_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (HeaderName::try_from(name), HeaderValue::from_str(value)) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => {
            tracing::warn!(header = %name, "Skipping unrepresentable header write");
        }
    }
}
