//! Real-client-IP resolving HTTP proxy library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod realip;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
