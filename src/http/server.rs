//! HTTP server setup and forwarding.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (request ID, tracing,
//!   timeout, real-IP resolution)
//! - Build the immutable trust table and resolver policy from config
//! - Forward requests to the configured upstream
//! - Graceful shutdown

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::UuidRequestId;
use crate::observability::metrics;
use crate::realip::{real_ip_middleware, RealIpState, ResolverPolicy, TrustError, TrustTable};

/// Error type for server construction.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid upstream address {address:?}: {source}")]
    InvalidUpstream {
        address: String,
        source: axum::http::uri::InvalidUri,
    },

    #[error("failed to build trust table: {0}")]
    Trust(#[from] TrustError),
}

/// State injected into the forwarding handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

/// HTTP server for the real-IP proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Build the server from a validated configuration.
    ///
    /// This is the only fallible phase: the trust table and resolver policy
    /// are constructed here, once, and shared read-only with every request
    /// task afterwards.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let upstream = Authority::from_str(&config.upstream.address).map_err(|source| {
            ServerError::InvalidUpstream {
                address: config.upstream.address.clone(),
                source,
            }
        })?;

        let trust = TrustTable::build(&config.real_ip.trusted_ips)?;
        let policy = ResolverPolicy::from_config(&config.real_ip);

        tracing::info!(
            enabled = config.real_ip.enabled,
            trust_all = config.real_ip.trust_all,
            trusted_ranges = trust.len(),
            header = %policy.header_name(),
            "Real-IP resolution configured"
        );

        let realip = RealIpState {
            enabled: config.real_ip.enabled,
            policy: Arc::new(policy),
            trust: Arc::new(trust),
        };

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState { client, upstream };

        let router = Self::build_router(&config, state, realip);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState, realip: RealIpState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                // outermost first: trace, request id, timeout, then real-IP
                // rewriting right before the forwarding handler
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    )))
                    .layer(middleware::from_fn_with_state(realip, real_ip_middleware)),
            )
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward the (already rewritten) request to the upstream.
async fn proxy_handler(State(state): State<AppState>, mut request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let mut parts = request.uri().clone().into_parts();
    parts.scheme = Some(Scheme::HTTP);
    parts.authority = Some(state.upstream.clone());
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }

    match Uri::from_parts(parts) {
        Ok(uri) => *request.uri_mut() = uri,
        Err(e) => {
            tracing::error!(error = %e, "Failed to rewrite request URI");
            metrics::record_request(&method, 500, start);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Bad request URI").into_response();
        }
    }

    match state.client.request(request).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), start);
            response.map(Body::new).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, upstream = %state.upstream, "Upstream request failed");
            metrics::record_request(&method, 502, start);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
