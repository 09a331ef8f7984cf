//! GeoZone - local civil time from geographic coordinates
//!
//! This library resolves a geographic coordinate to a local civil time and a
//! short time zone label (e.g. "CT", "PT"). The coordinate to zone-identifier
//! mapping is expensive, so it is memoized in a concurrent, single-flight
//! cache: concurrent callers for the same coordinate share one lookup, and a
//! failed lookup is never cached.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use geozone::coord::GeoPoint;
//! use geozone::service::GeoTimeService;
//!
//! let service = GeoTimeService::with_defaults();
//! let knox = GeoPoint::new(41.285433, -86.626029)?;
//!
//! let label = service.zone_label(&knox).await;          // Some("CT")
//! let local = service.local_offset_time(&knox, civil).await?;
//! ```

pub mod coord;
pub mod logging;
pub mod resolver;
pub mod service;
pub mod tz;

/// Version of the GeoZone library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
