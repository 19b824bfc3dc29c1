//! Trusted-range classification.
//!
//! # Responsibilities
//! - Parse configured CIDR blocks at startup (fail fast on bad entries)
//! - Answer "is this address inside a trusted range, and how specific
//!   is the match" on the request path
//!
//! # Design Decisions
//! - Linear scan over the ranges; fine at the expected scale (tens of
//!   entries). A per-family trie would preserve the same contract if the
//!   table ever grows to thousands of ranges.
//! - Among overlapping ranges the largest prefix length wins; ties go to
//!   the first declared range.
//! - Lookup is pure, so the table can be shared across request tasks
//!   without synchronization.

use std::net::{AddrParseError, IpAddr};

use ipnet::IpNet;
use thiserror::Error;

/// Error produced while building a [`TrustTable`].
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("invalid CIDR entry {entry:?}: {source}")]
    InvalidCidr {
        entry: String,
        source: ipnet::AddrParseError,
    },
}

/// An immutable set of trusted CIDR ranges.
///
/// Built once at startup; an empty table is valid and matches nothing.
/// Duplicate and overlapping ranges are retained as declared.
#[derive(Debug, Clone, Default)]
pub struct TrustTable {
    ranges: Vec<IpNet>,
}

impl TrustTable {
    /// Build a table from CIDR strings.
    ///
    /// Any entry that fails to parse aborts construction; a partial table
    /// is never returned.
    pub fn build(cidrs: &[String]) -> Result<Self, TrustError> {
        let mut ranges = Vec::with_capacity(cidrs.len());
        for entry in cidrs {
            let net: IpNet = entry.trim().parse().map_err(|source| TrustError::InvalidCidr {
                entry: entry.clone(),
                source,
            })?;
            ranges.push(net);
        }
        Ok(Self { ranges })
    }

    /// Number of configured ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Return the prefix length of the most specific range containing `ip`,
    /// or `None` when no range contains it.
    ///
    /// Cross-family candidates never match. When two containing ranges share
    /// the same prefix length, the first declared one wins.
    pub fn contains(&self, ip: IpAddr) -> Option<u8> {
        let mut best: Option<u8> = None;
        for net in &self.ranges {
            if net.contains(&ip) {
                match best {
                    Some(prefix) if net.prefix_len() <= prefix => {}
                    _ => best = Some(net.prefix_len()),
                }
            }
        }
        best
    }

    /// Parse `addr` and look it up.
    ///
    /// A parse failure is distinct from a miss; callers treat it as
    /// "untrusted" rather than failing the request.
    pub fn lookup(&self, addr: &str) -> Result<Option<u8>, AddrParseError> {
        let ip: IpAddr = addr.parse()?;
        Ok(self.contains(ip))
    }
}
