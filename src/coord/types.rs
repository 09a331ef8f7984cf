//! Geographic coordinate type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Valid latitude range, inclusive
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range, inclusive
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Latitudes with a magnitude below this are treated as the "no location"
/// sentinel: upstream data sources emit (0, 0) when a position is unknown.
pub const NO_LOCATION_EPSILON: f64 = 1e-4;

/// A validated geographic coordinate.
///
/// Latitude and longitude are checked at construction, so every `GeoPoint`
/// in the system is in range. The canonical string form rounds both
/// components to two decimal places and doubles as the resolver cache key,
/// which means points within roughly a kilometre of each other share a
/// cached time zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Create a new coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::InvalidLatitude`] or
    /// [`CoordError::InvalidLongitude`] when a component is out of range.
    /// Bounds are inclusive: (90.0, 180.0) is a valid point.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Geographic center of the contiguous United States.
    ///
    /// Used as a fallback point by embedding applications when no better
    /// position is available.
    pub fn continental_us_center() -> Self {
        Self {
            latitude: 39.8333333,
            longitude: -98.585522,
        }
    }

    /// Latitude in degrees, north positive.
    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees, east positive.
    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns true if this point is the "no location" sentinel.
    ///
    /// Time conversions skip zone resolution entirely for such points and
    /// treat the timestamp as already being in the desired frame.
    #[inline]
    pub fn is_no_location(&self) -> bool {
        self.latitude.abs() < NO_LOCATION_EPSILON
    }

    /// Canonical cache key: both components rounded to two decimal places.
    ///
    /// Points that round to the same key deliberately collide in the
    /// resolver cache; at two decimals that merges points up to ~1.1 km
    /// apart, well below the scale of time zone polygons.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}, {:.2}", self.latitude, self.longitude)
    }
}

/// Unvalidated deserialization target for [`GeoPoint`].
///
/// Keeps serde input on the same validation path as [`GeoPoint::new`].
#[derive(Deserialize)]
struct RawGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = CoordError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

/// Errors that can occur constructing a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside the valid range (-90.0 to 90.0)
    InvalidLatitude(f64),
    /// Longitude is outside the valid range (-180.0 to 180.0)
    InvalidLongitude(f64),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
