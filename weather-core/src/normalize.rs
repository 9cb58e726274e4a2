//! Helpers shared by the provider-specific normalizers: local-time
//! reconciliation, hourly window selection and unit conversions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};

use crate::error::{WeatherError, WeatherResult};

/// Maximum hourly entries in a forecast list.
pub const HOURLY_LIMIT: usize = 24;
/// Maximum daily entries in a forecast list.
pub const DAILY_LIMIT: usize = 5;
/// Hour of day used to represent a whole day.
pub const NOON: u32 = 12;
/// Widest UTC offset any zone uses, in seconds.
pub const MAX_UTC_OFFSET_SECS: i64 = 18 * 3600;

const LOCAL_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse an upstream local wall-clock time such as `2024-05-01T13:00`.
pub fn parse_local(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Convert an upstream local time to unix seconds. Strings carrying their
/// own offset use it; bare wall-clock times use `utc_offset_secs`.
pub fn local_to_unix(s: &str, utc_offset_secs: i64) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    wall_clock_to_unix(parse_local(s)?, utc_offset_secs)
}

pub fn local_noon_unix(date: NaiveDate, utc_offset_secs: i64) -> Option<i64> {
    wall_clock_to_unix(date.and_hms_opt(NOON, 0, 0)?, utc_offset_secs)
}

/// `None` when the shift leaves chrono's representable range.
fn wall_clock_to_unix(local: NaiveDateTime, utc_offset_secs: i64) -> Option<i64> {
    let offset = TimeDelta::try_seconds(utc_offset_secs)?;
    Some(local.checked_sub_signed(offset)?.and_utc().timestamp())
}

/// Local calendar date and hour of a unix instant.
pub fn local_date_hour(unix: i64, utc_offset_secs: i64) -> Option<(NaiveDate, u32)> {
    let local = DateTime::from_timestamp(unix.checked_add(utc_offset_secs)?, 0)?.naive_utc();
    Some((local.date(), local.hour()))
}

/// Reject an upstream UTC offset beyond ±18 hours.
pub fn checked_offset(utc_offset_secs: Option<i64>, service: &str) -> WeatherResult<i64> {
    let offset = utc_offset_secs.unwrap_or(0);
    if (-MAX_UTC_OFFSET_SECS..=MAX_UTC_OFFSET_SECS).contains(&offset) {
        Ok(offset)
    } else {
        tracing::warn!(service, offset, "upstream reported an impossible UTC offset");
        Err(WeatherError::upstream(format!(
            "{service} reported an invalid UTC offset: {offset}"
        )))
    }
}

/// Index of the first instant strictly after `now`, or 0 when there is none.
/// Unparseable (`None`) instants never qualify.
pub fn first_future_index(instants: &[Option<i64>], now: DateTime<Utc>) -> usize {
    let now = now.timestamp();
    instants
        .iter()
        .position(|t| t.is_some_and(|t| t > now))
        .unwrap_or(0)
}

/// Percentage (0–100) to a 0.0–1.0 fraction; absent or NaN becomes 0.
pub fn pop_fraction(percent: Option<f64>) -> f64 {
    match percent {
        Some(p) if !p.is_nan() => (p / 100.0).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Upstream visibility in kilometers to meters.
pub fn km_to_m(km: f64) -> f64 {
    km * 1000.0
}

/// Value at `idx` of an optional-valued array, treating out-of-range as absent.
pub fn at<T: Copy>(values: &[Option<T>], idx: usize) -> Option<T> {
    values.get(idx).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_open_meteo_local_times() {
        let t = parse_local("2024-05-01T13:00").unwrap();
        assert_eq!(t.hour(), 13);
        assert!(parse_local("2024-05-01 12:00:00").is_some());
        assert!(parse_local("yesterday").is_none());
    }

    #[test]
    fn local_time_respects_offset() {
        // 12:00 at UTC+05:30 is 06:30 UTC.
        let unix = local_to_unix("2024-05-01T12:00", 19_800).unwrap();
        assert_eq!(unix, Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap().timestamp());
    }

    #[test]
    fn rfc3339_carries_its_own_offset() {
        let unix = local_to_unix("2024-05-01T12:00:00+02:00", 19_800).unwrap();
        assert_eq!(unix, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap().timestamp());
    }

    #[test]
    fn noon_and_back() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let unix = local_noon_unix(date, -14_400).unwrap();
        assert_eq!(local_date_hour(unix, -14_400), Some((date, 12)));
    }

    #[test]
    fn extreme_offsets_yield_none() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();

        assert_eq!(local_to_unix("2024-05-01T12:00", 1_000_000_000_000_000), None);
        assert_eq!(local_to_unix("2024-05-01T12:00", i64::MIN), None);
        assert_eq!(local_noon_unix(date, i64::MAX), None);
        assert_eq!(local_date_hour(1_714_561_200, i64::MAX), None);
        assert_eq!(local_date_hour(i64::MIN, -1), None);
    }

    #[test]
    fn offsets_beyond_eighteen_hours_are_upstream_errors() {
        assert_eq!(checked_offset(None, "Open-Meteo"), Ok(0));
        assert_eq!(checked_offset(Some(-MAX_UTC_OFFSET_SECS), "Open-Meteo"), Ok(-64_800));
        assert_eq!(checked_offset(Some(50_400), "OpenWeather"), Ok(50_400));

        let err = checked_offset(Some(i64::MIN), "OpenWeather").unwrap_err();
        let expected = format!("OpenWeather reported an invalid UTC offset: {}", i64::MIN);
        assert_eq!(err, WeatherError::Upstream(expected));
        assert!(checked_offset(Some(MAX_UTC_OFFSET_SECS + 1), "Open-Meteo").is_err());
    }

    #[test]
    fn first_future_index_skips_past_and_unparsed() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        let at = |h| Some(Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap().timestamp());
        let times = vec![at(9), at(10), None, at(11), at(12)];
        assert_eq!(first_future_index(&times, now), 3);
    }

    #[test]
    fn first_future_index_defaults_to_zero() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(first_future_index(&[Some(0), Some(1)], now), 0);
        assert_eq!(first_future_index(&[], now), 0);
    }

    #[test]
    fn pop_conversion() {
        assert_eq!(pop_fraction(Some(40.0)), 0.4);
        assert_eq!(pop_fraction(Some(100.0)), 1.0);
        assert_eq!(pop_fraction(Some(250.0)), 1.0);
        assert_eq!(pop_fraction(Some(-5.0)), 0.0);
        assert_eq!(pop_fraction(Some(f64::NAN)), 0.0);
        assert_eq!(pop_fraction(None), 0.0);
    }

    #[test]
    fn at_handles_gaps_and_bounds() {
        let v = [Some(1.0), None];
        assert_eq!(at(&v, 0), Some(1.0));
        assert_eq!(at(&v, 1), None);
        assert_eq!(at(&v, 7), None);
    }
}
