//! Real-client-IP resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → trust.rs (classify connection address against trusted CIDR ranges)
//!     → resolver.rs (walk configured header specs, pick one address)
//!     → middleware.rs (write destination + trust indicator headers)
//!     → Pass to forwarding handler
//! ```
//!
//! # Design Decisions
//! - TrustTable and ResolverPolicy are built once at startup and shared
//!   read-only; the request path never mutates them
//! - Per-request anomalies (missing header, bad token, out-of-bounds depth)
//!   skip to the next candidate instead of failing the request
//! - Resolved tokens are never validated as IP addresses; malformed values
//!   pass through for downstream consumers to observe

pub mod middleware;
pub mod resolver;
pub mod trust;

pub use middleware::{real_ip_middleware, RealClientIp, RealIpState};
pub use resolver::{HeaderSource, HeaderSpec, ResolverPolicy, CONNECTION_ADDRESS_NAME};
pub use trust::{TrustError, TrustTable};
