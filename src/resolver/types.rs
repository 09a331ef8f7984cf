//! Core types for the resolver.

use thiserror::Error;

/// Errors that can occur while resolving a coordinate to a zone identifier.
///
/// `Clone` because a single failure is broadcast to every caller waiting on
/// the same in-flight lookup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// No zone covers the point (open ocean, polar regions).
    #[error("No time zone coverage for ({lat}, {lon})")]
    NoCoverage { lat: f64, lon: f64 },

    /// The external lookup itself failed.
    #[error("Zone lookup failed: {0}")]
    LookupFailed(String),

    /// The caller performing the lookup was dropped before it completed.
    ///
    /// The cache entry has been evicted; retrying is safe.
    #[error("Zone lookup abandoned before completing")]
    LookupAbandoned,
}

/// Snapshot of resolver statistics.
#[derive(Debug, Default, Clone)]
pub struct ResolverStats {
    /// Total resolve calls received
    pub total_requests: u64,
    /// Calls answered from a resolved cache entry
    pub cache_hits: u64,
    /// Calls that waited on another caller's in-flight lookup
    pub coalesced_waits: u64,
    /// External lookups started
    pub lookups_started: u64,
    /// External lookups that failed (entry evicted)
    pub lookups_failed: u64,
}

impl ResolverStats {
    /// Returns the fraction of calls served without an external lookup
    /// (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.cache_hits + self.coalesced_waits) as f64 / self.total_requests as f64
        }
    }
}
