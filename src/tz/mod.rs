//! Zone metadata: abbreviations and civil-time to offset-time conversion.
//!
//! The resolver hands out IANA zone identifiers; this module owns everything
//! keyed by those identifiers. Nothing here is cached - metadata lookups are
//! in-memory table walks and stateless.
//!
//! The bundled [`TzdbMetadata`] implementation is built on `chrono-tz`.
//! Local times that fall in a DST transition are resolved leniently with a
//! pinned tie-break, documented on [`ZoneMetadata::to_local_offset`].

mod abbrev;

pub use abbrev::ABBREVIATION_SAMPLE_YEAR;

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

/// Short labels for a zone in a given locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneAbbreviations {
    /// Label independent of DST state (e.g. "CT" covers CST and CDT)
    pub generic: String,
    /// Standard-time label (e.g. "CST")
    pub standard: String,
    /// Daylight-time label (e.g. "CDT"); equals `standard` for zones that
    /// never observe DST
    pub daylight: String,
}

/// Errors from the zone metadata service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataError {
    /// The identifier does not name a zone in the bundled tz database.
    #[error("Unknown time zone identifier: {0}")]
    UnknownZone(String),

    /// The civil time could not be mapped onto the zone's timeline.
    #[error("Cannot resolve local time {civil} in zone {zone_id}")]
    UnresolvableLocalTime {
        zone_id: String,
        civil: NaiveDateTime,
    },
}

/// External collaborator mapping zone identifiers to abbreviations and
/// offset rules.
pub trait ZoneMetadata: Send + Sync {
    /// Returns the short labels for a zone.
    ///
    /// `locale` is a BCP 47 tag such as "en-US"; implementations may bundle
    /// data for a subset of locales.
    fn abbreviations(
        &self,
        zone_id: &str,
        locale: &str,
    ) -> Result<ZoneAbbreviations, MetadataError>;

    /// Interprets a naive civil timestamp as wall-clock time in the zone and
    /// returns the equivalent timestamp with its UTC offset attached.
    ///
    /// Times inside a DST transition resolve leniently:
    ///
    /// - overlap (clocks fell back, the time occurs twice): the **earlier**
    ///   of the two instants, i.e. the pre-transition offset;
    /// - gap (clocks sprang forward, the time never occurs): shifted
    ///   **forward by the length of the gap**, so 02:30 in a one-hour gap
    ///   starting at 02:00 becomes 03:30 with the post-transition offset.
    fn to_local_offset(
        &self,
        zone_id: &str,
        civil: NaiveDateTime,
    ) -> Result<DateTime<FixedOffset>, MetadataError>;
}

/// Zone metadata backed by the tz database compiled into `chrono-tz`.
///
/// Abbreviations are sampled at a fixed reference year so results do not
/// drift as the wall clock moves; generic labels come from a small metazone
/// table plus derivation from the standard/daylight pair (see `abbrev`).
/// Only English labels are bundled, so the locale argument is not consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TzdbMetadata;

impl TzdbMetadata {
    /// Create a new metadata service over the bundled tz database.
    pub fn new() -> Self {
        Self
    }

    fn parse_zone(zone_id: &str) -> Result<Tz, MetadataError> {
        zone_id
            .parse::<Tz>()
            .map_err(|_| MetadataError::UnknownZone(zone_id.to_string()))
    }
}

impl ZoneMetadata for TzdbMetadata {
    fn abbreviations(
        &self,
        zone_id: &str,
        _locale: &str,
    ) -> Result<ZoneAbbreviations, MetadataError> {
        let tz = Self::parse_zone(zone_id)?;
        let (standard, daylight) = abbrev::sample_abbreviations(tz);
        let generic = abbrev::generic_label(zone_id, &standard, &daylight);
        Ok(ZoneAbbreviations {
            generic,
            standard,
            daylight,
        })
    }

    fn to_local_offset(
        &self,
        zone_id: &str,
        civil: NaiveDateTime,
    ) -> Result<DateTime<FixedOffset>, MetadataError> {
        let tz = Self::parse_zone(zone_id)?;
        match tz.from_local_datetime(&civil) {
            LocalResult::Single(zdt) => Ok(zdt.fixed_offset()),
            // Overlap: keep the pre-transition offset.
            LocalResult::Ambiguous(earlier, _later) => Ok(earlier.fixed_offset()),
            LocalResult::None => resolve_gap(tz, zone_id, civil),
        }
    }
}

/// Maps a civil time inside a DST gap by interpreting it with the offset in
/// effect just before the gap, which shifts the result forward by the gap's
/// length once converted back into the zone.
fn resolve_gap(
    tz: Tz,
    zone_id: &str,
    civil: NaiveDateTime,
) -> Result<DateTime<FixedOffset>, MetadataError> {
    // Gaps are at most a few hours long; probe backwards in half-hour steps
    // until we land on a representable local time and take its offset.
    for step in 1..=48 {
        let probe = civil - Duration::minutes(30 * step);
        if let Some(before) = tz.from_local_datetime(&probe).earliest() {
            let offset = before.offset().fix();
            let utc = civil - Duration::seconds(i64::from(offset.local_minus_utc()));
            return Ok(tz.from_utc_datetime(&utc).fixed_offset());
        }
    }
    Err(MetadataError::UnresolvableLocalTime {
        zone_id: zone_id.to_string(),
        civil,
    })
}
