//! Zone identifier lookup abstraction.

use crate::resolver::types::ResolveError;
use std::future::Future;
use tzf_rs::DefaultFinder;

/// External collaborator that maps a coordinate to an IANA zone identifier.
///
/// Implementations may be network-bound or disk-bound and must be safely
/// callable concurrently; the resolver guarantees at most one call in flight
/// per distinct cache key.
pub trait ZoneLookup: Send + Sync {
    /// Looks up the zone identifier for a coordinate.
    ///
    /// # Returns
    ///
    /// The canonical tz database identifier (e.g. "America/Chicago"), or an
    /// error when the point has no coverage or the lookup fails.
    fn zone_id(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<String, ResolveError>> + Send;

    /// Returns the lookup's name for logging and identification.
    fn name(&self) -> &str;
}

/// Zone lookup backed by the bundled `tzf-rs` boundary data.
///
/// Construction parses the embedded polygon set and is relatively expensive;
/// build one and share it, typically inside a
/// [`ZoneResolver`](crate::resolver::ZoneResolver).
pub struct TzfLookup {
    finder: DefaultFinder,
}

impl TzfLookup {
    /// Create a new lookup over the bundled boundary data.
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }
}

impl Default for TzfLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneLookup for TzfLookup {
    async fn zone_id(&self, lat: f64, lon: f64) -> Result<String, ResolveError> {
        // tzf takes longitude first
        let name = self.finder.get_tz_name(lon, lat);
        if name.is_empty() {
            return Err(ResolveError::NoCoverage { lat, lon });
        }
        Ok(name.to_string())
    }

    fn name(&self) -> &str {
        "tzf"
    }
}
