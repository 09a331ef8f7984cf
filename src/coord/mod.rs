//! Geographic coordinate module
//!
//! Provides the validated [`GeoPoint`] value type used throughout the
//! resolver, plus great-circle distance between two points.

mod types;


pub use types::{
    CoordError, GeoPoint, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON, NO_LOCATION_EPSILON,
};

/// Meters in one statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Mean Earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Returns the great-circle distance between two points in statute miles.
///
/// Uses the haversine formula with the mean Earth radius, which is accurate
/// to within ~0.5% of true geodesic distance.
#[inline]
pub fn distance_miles(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat_a = a.latitude().to_radians();
    let lat_b = b.latitude().to_radians();
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let meters = 2.0 * EARTH_RADIUS_METERS * h.sqrt().asin();

    meters / METERS_PER_MILE
}
