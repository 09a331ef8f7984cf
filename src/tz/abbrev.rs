//! Abbreviation sampling and generic-label derivation.

use chrono::{FixedOffset, NaiveDate, Offset, TimeZone};
use chrono_tz::{OffsetComponents, OffsetName, Tz};

/// Reference year at which a zone's standard and daylight offsets are
/// sampled. Fixed so labels do not change under the caller's feet when the
/// zone's rules change in a future tz database release mid-year.
pub const ABBREVIATION_SAMPLE_YEAR: i32 = 2024;

/// Generic labels for zones that keep a region's clock without observing its
/// DST, where the label cannot be derived from the standard/daylight pair.
const GENERIC_OVERRIDES: &[(&str, &str)] = &[
    ("America/Cancun", "ET"),
    ("America/Creston", "MT"),
    ("America/Fort_Nelson", "MT"),
    ("America/Jamaica", "ET"),
    ("America/Panama", "ET"),
    ("America/Phoenix", "MT"),
    ("America/Regina", "CT"),
    ("America/Swift_Current", "CT"),
    ("Pacific/Honolulu", "HST"),
];

/// Returns the (standard, daylight) abbreviations for a zone, sampled in
/// January and July of the reference year and classified by whether the DST
/// offset is zero, so both hemispheres classify correctly. Zones without DST
/// report the same label twice.
pub(crate) fn sample_abbreviations(tz: Tz) -> (String, String) {
    let (jan_abbr, jan_dst) = sample_at(tz, 1);
    let (jul_abbr, jul_dst) = sample_at(tz, 7);

    match (jan_dst, jul_dst) {
        (false, true) => (jan_abbr, jul_abbr),
        (true, false) => (jul_abbr, jan_abbr),
        // No DST at the sample year (or DST year-round): one label covers
        // both roles.
        _ => (jan_abbr.clone(), jan_abbr),
    }
}

/// Samples the abbreviation and DST state at noon UTC on the 15th of the
/// given month of the reference year. Sampling through UTC keeps this total;
/// there is no local time to fall into a transition.
fn sample_at(tz: Tz, month: u32) -> (String, bool) {
    let Some(instant) = NaiveDate::from_ymd_opt(ABBREVIATION_SAMPLE_YEAR, month, 15)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
    else {
        return (String::new(), false);
    };
    let zdt = tz.from_utc_datetime(&instant);
    let offset = zdt.offset();
    // chrono-tz only exposes alphabetic abbreviations; zones whose tzdb
    // label is numeric (Etc/GMT+8 → "-08") report `None` and get the label
    // synthesized from the offset instead.
    let abbr = match offset.abbreviation() {
        Some(abbr) => abbr.to_string(),
        None => numeric_label(offset.fix()),
    };
    (abbr, !offset.dst_offset().is_zero())
}

/// Formats a fixed offset as a tzdb-style numeric label: "+11", "-08",
/// "+0530". Minutes are omitted when zero, matching tzdb's own spelling.
fn numeric_label(offset: FixedOffset) -> String {
    let total = offset.local_minus_utc();
    let sign = if total < 0 { '-' } else { '+' };
    let hours = total.abs() / 3600;
    let minutes = (total.abs() % 3600) / 60;
    if minutes == 0 {
        format!("{sign}{hours:02}")
    } else {
        format!("{sign}{hours:02}{minutes:02}")
    }
}

/// Returns the generic (DST-independent) label for a zone: the metazone
/// override when one exists, otherwise a merge of the standard and daylight
/// labels, otherwise the standard label unchanged.
pub(crate) fn generic_label(zone_id: &str, standard: &str, daylight: &str) -> String {
    if let Some((_, label)) = GENERIC_OVERRIDES.iter().find(|(zone, _)| *zone == zone_id) {
        return (*label).to_string();
    }
    merge_abbreviations(standard, daylight).unwrap_or_else(|| standard.to_string())
}

/// Merges a standard/daylight pair into a generic label by keeping their
/// longest common prefix and suffix: CST/CDT becomes "CT", AKST/AKDT becomes
/// "AKT". Returns `None` when the pair is identical, non-alphabetic (numeric
/// abbreviations like "+11"), or the merge collapses below two letters.
fn merge_abbreviations(standard: &str, daylight: &str) -> Option<String> {
    if standard == daylight {
        return None;
    }
    let alphabetic = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic());
    if !alphabetic(standard) || !alphabetic(daylight) {
        return None;
    }

    let prefix_len = standard
        .bytes()
        .zip(daylight.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    let std_rest = &standard[prefix_len..];
    let day_rest = &daylight[prefix_len..];
    let suffix_len = std_rest
        .bytes()
        .rev()
        .zip(day_rest.bytes().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let merged = format!(
        "{}{}",
        &standard[..prefix_len],
        &std_rest[std_rest.len() - suffix_len..]
    );
    (merged.len() >= 2).then_some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_us_pairs() {
        assert_eq!(merge_abbreviations("EST", "EDT"), Some("ET".to_string()));
        assert_eq!(merge_abbreviations("CST", "CDT"), Some("CT".to_string()));
        assert_eq!(merge_abbreviations("MST", "MDT"), Some("MT".to_string()));
        assert_eq!(merge_abbreviations("PST", "PDT"), Some("PT".to_string()));
        assert_eq!(merge_abbreviations("AKST", "AKDT"), Some("AKT".to_string()));
    }

    #[test]
    fn test_merge_rejects_identical_pair() {
        assert_eq!(merge_abbreviations("MST", "MST"), None);
    }

    #[test]
    fn test_merge_rejects_numeric_abbreviations() {
        assert_eq!(merge_abbreviations("+1030", "+11"), None);
        assert_eq!(merge_abbreviations("-03", "-02"), None);
    }

    #[test]
    fn test_generic_label_prefers_override() {
        assert_eq!(generic_label("America/Phoenix", "MST", "MST"), "MT");
        assert_eq!(generic_label("America/Regina", "CST", "CST"), "CT");
    }

    #[test]
    fn test_generic_label_falls_back_to_standard() {
        // No override and nothing to merge: keep the standard label.
        assert_eq!(generic_label("Asia/Tokyo", "JST", "JST"), "JST");
        assert_eq!(generic_label("Etc/GMT+3", "-03", "-03"), "-03");
    }

    #[test]
    fn test_sample_abbreviations_northern_dst() {
        let (standard, daylight) = sample_abbreviations(chrono_tz::Tz::America__Chicago);
        assert_eq!(standard, "CST");
        assert_eq!(daylight, "CDT");
    }

    #[test]
    fn test_sample_abbreviations_no_dst() {
        let (standard, daylight) = sample_abbreviations(chrono_tz::Tz::America__Phoenix);
        assert_eq!(standard, "MST");
        assert_eq!(daylight, "MST");
    }

    #[test]
    fn test_sample_abbreviations_numeric_zone() {
        // Etc zones carry no alphabetic abbreviation in chrono-tz; the
        // label must be synthesized from the offset, never empty. Note the
        // POSIX sign inversion: Etc/GMT+8 is UTC-8.
        let tz: Tz = "Etc/GMT+8".parse().unwrap();
        let (standard, daylight) = sample_abbreviations(tz);
        assert_eq!(standard, "-08");
        assert_eq!(daylight, "-08");
    }

    #[test]
    fn test_numeric_label_formatting() {
        assert_eq!(numeric_label(FixedOffset::east_opt(11 * 3600).unwrap()), "+11");
        assert_eq!(numeric_label(FixedOffset::west_opt(8 * 3600).unwrap()), "-08");
        assert_eq!(
            numeric_label(FixedOffset::east_opt(5 * 3600 + 1800).unwrap()),
            "+0530"
        );
        assert_eq!(numeric_label(FixedOffset::east_opt(0).unwrap()), "+00");
    }
}
