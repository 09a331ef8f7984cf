//! High-level facade over the resolver and the metadata service.
//!
//! [`GeoTimeService`] wires a [`ZoneResolver`] to a [`ZoneMetadata`]
//! collaborator and exposes the two operations callers actually want: a
//! short time zone label for a coordinate, and a civil timestamp converted
//! to an offset timestamp in the coordinate's zone. Only the coordinate to
//! zone-identifier step is cached; both operations here are stateless
//! pass-throughs on top of it.

use crate::coord::GeoPoint;
use crate::resolver::{ResolveError, TzfLookup, ZoneLookup, ZoneResolver};
use crate::tz::{MetadataError, TzdbMetadata, ZoneMetadata};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use thiserror::Error;
use tracing::warn;

/// Locale used for abbreviation lookups unless overridden.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Errors surfaced by the facade's time conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Coordinate to zone-identifier resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The metadata service failed for an otherwise-resolved zone.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Facade resolving coordinates to labels and local offset times.
pub struct GeoTimeService<L, M> {
    resolver: ZoneResolver<L>,
    metadata: M,
    locale: String,
}

impl GeoTimeService<TzfLookup, TzdbMetadata> {
    /// Creates a service over the bundled collaborators: `tzf-rs` boundary
    /// data for lookups and the `chrono-tz` database for metadata.
    pub fn with_defaults() -> Self {
        Self::new(TzfLookup::new(), TzdbMetadata::new())
    }
}

impl<L: ZoneLookup, M: ZoneMetadata> GeoTimeService<L, M> {
    /// Creates a service with injected collaborators.
    pub fn new(lookup: L, metadata: M) -> Self {
        Self {
            resolver: ZoneResolver::new(lookup),
            metadata,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }

    /// Overrides the locale used for abbreviation lookups.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Returns the underlying resolver, e.g. for statistics.
    pub fn resolver(&self) -> &ZoneResolver<L> {
        &self.resolver
    }

    /// Resolves the zone identifier for a coordinate through the cache.
    pub async fn zone_id(&self, point: &GeoPoint) -> Result<String, ResolveError> {
        self.resolver.resolve(point).await
    }

    /// Looks up the short, DST-independent time zone label for a coordinate
    /// (e.g. "ET", "CT", "MT", "PT").
    ///
    /// Best-effort: a missing label is non-fatal to callers, so any failure
    /// along the way is logged at warn level and reported as `None`. The
    /// "no location" sentinel returns `None` without resolving.
    pub async fn zone_label(&self, point: &GeoPoint) -> Option<String> {
        if point.is_no_location() {
            return None;
        }

        match self.try_zone_label(point).await {
            // An empty label is useless to display; report it as absent.
            Ok(label) if !label.is_empty() => Some(label),
            Ok(_) => None,
            Err(error) => {
                warn!(
                    lat = point.latitude(),
                    lon = point.longitude(),
                    error = %error,
                    "Unable to look up time zone label"
                );
                None
            }
        }
    }

    async fn try_zone_label(&self, point: &GeoPoint) -> Result<String, ServiceError> {
        let zone_id = self.resolver.resolve(point).await?;
        let abbreviations = self.metadata.abbreviations(&zone_id, &self.locale)?;
        Ok(abbreviations.generic)
    }

    /// Interprets a naive civil timestamp as wall-clock time at the
    /// coordinate and returns it with the zone's UTC offset attached.
    ///
    /// Transition edge cases resolve leniently; the tie-break is documented
    /// on [`ZoneMetadata::to_local_offset`]. The "no location" sentinel
    /// skips zone resolution entirely and returns the input timestamp
    /// unmodified, treated as already being in the desired frame.
    ///
    /// # Errors
    ///
    /// Propagates resolution and metadata failures; a wrong timestamp would
    /// be worse than a visible error.
    pub async fn local_offset_time(
        &self,
        point: &GeoPoint,
        civil: NaiveDateTime,
    ) -> Result<DateTime<FixedOffset>, ServiceError> {
        if point.is_no_location() {
            return Ok(civil.and_utc().fixed_offset());
        }

        let zone_id = self.resolver.resolve(point).await?;
        Ok(self.metadata.to_local_offset(&zone_id, civil)?)
    }
}
