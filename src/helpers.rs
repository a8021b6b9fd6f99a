//! Shared helpers for distances and race dates.
//!
//! - `snap_km`: rounds a distance to the nearest metre-millionth so split
//!   boundaries computed as `i * 1.609` compare equal to typed-in distances.
//! - `parse_race_date` / `format_race_date`: the persisted date form.

use chrono::{NaiveDate, NaiveDateTime};

/// Format used when writing dates back out.
pub const RACE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";

const KM_SNAP_SCALE: f64 = 1e6;

/// Round a distance in km to 6 decimal places.
///
/// Non-finite values are returned unchanged (and logged); callers validate them.
pub(crate) fn snap_km(v: f64) -> f64 {
    if !v.is_finite() {
        tracing::warn!("snap_km received non-finite value {}, leaving as is", v);
        return v;
    }
    (v * KM_SNAP_SCALE).round() / KM_SNAP_SCALE
}

/// Parse a race date, either a bare `YYYY-MM-DD` (midnight) or a full
/// `YYYY-MM-DDTHH:MM:SS[.fff]` timestamp.
pub fn parse_race_date(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, DATE_ONLY_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("'{}' is not a date (expected YYYY-MM-DD[THH:MM:SS])", s))
}

pub fn format_race_date(dt: &NaiveDateTime) -> String {
    dt.format(RACE_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_km_removes_float_noise() {
        assert_eq!(snap_km(0.1 * 3.0), 0.3);
        assert_eq!(snap_km(3.0 * 1.609), 4.827);
        assert_eq!(snap_km(10.0 * 1.609), 16.09);
        assert_eq!(snap_km(0.1 * 211.0), 21.1);
    }

    #[test]
    fn test_snap_km_is_idempotent_on_clean_values() {
        for v in [5.0, 10.0, 21.1, 42.2, 16.09, 0.4] {
            assert_eq!(snap_km(v), v);
        }
    }

    #[test]
    fn test_snap_km_non_finite() {
        assert!(snap_km(f64::NAN).is_nan());
        assert_eq!(snap_km(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_race_date("2021-10-10").unwrap();
        assert_eq!(format_race_date(&dt), "2021-10-10T00:00:00");
    }

    #[test]
    fn test_parse_full_timestamp() {
        let dt = parse_race_date("2023-01-28T09:30:00").unwrap();
        assert_eq!(format_race_date(&dt), "2023-01-28T09:30:00");
    }

    #[test]
    fn test_parse_fractional_and_space_separated() {
        let dt = parse_race_date("2024-12-25 08:00:00.123456").unwrap();
        assert_eq!(format_race_date(&dt), "2024-12-25T08:00:00");
    }

    #[test]
    fn test_parse_invalid_date() {
        assert!(parse_race_date("25/12/2024").is_err());
        assert!(parse_race_date("").is_err());
    }
}
