//! Location queries and their resolved form.

use serde::{Deserialize, Serialize};

use crate::{
    error::{WeatherError, WeatherResult},
    model::Coord,
};

/// Country code reported when geocoding gives none.
pub const FALLBACK_COUNTRY_CODE: &str = "US";

pub const MISSING_LOCATION_MESSAGE: &str = "City or coordinates are required.";
pub const MISSING_COORDINATES_MESSAGE: &str = "Latitude and longitude are required.";
pub const INVALID_COORDINATES_MESSAGE: &str = "Latitude and longitude must be valid numbers.";

/// What the caller asked for: a place name or a coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    City(String),
    Coordinates(Coord),
}

impl LocationQuery {
    /// Build from raw query-string values. A non-empty `city` wins over
    /// coordinates; blank values count as absent.
    pub fn from_params(
        city: Option<&str>,
        lat: Option<&str>,
        lon: Option<&str>,
    ) -> WeatherResult<Self> {
        if let Some(city) = non_blank(city) {
            return Ok(Self::City(city.to_string()));
        }

        match (non_blank(lat), non_blank(lon)) {
            (Some(lat), Some(lon)) => Ok(Self::Coordinates(parse_coord(lat, lon)?)),
            _ => Err(WeatherError::invalid_request(MISSING_LOCATION_MESSAGE)),
        }
    }
}

/// Parse the `lat`/`lon` pair the forecast endpoint requires.
pub fn coord_from_params(lat: Option<&str>, lon: Option<&str>) -> WeatherResult<Coord> {
    match (non_blank(lat), non_blank(lon)) {
        (Some(lat), Some(lon)) => parse_coord(lat, lon),
        _ => Err(WeatherError::invalid_request(MISSING_COORDINATES_MESSAGE)),
    }
}

fn parse_coord(lat: &str, lon: &str) -> WeatherResult<Coord> {
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| WeatherError::invalid_request(INVALID_COORDINATES_MESSAGE))
    };

    Ok(Coord::new(parse(lat)?, parse(lon)?))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub country_code: String,
}

impl ResolvedLocation {
    /// Build from a geocoder hit; a missing country code becomes
    /// [`FALLBACK_COUNTRY_CODE`].
    pub fn new(lat: f64, lon: f64, name: impl Into<String>, country_code: Option<&str>) -> Self {
        let country_code = country_code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| FALLBACK_COUNTRY_CODE.to_string());

        Self {
            lat,
            lon,
            name: name.into(),
            country_code,
        }
    }

    /// Best-effort stand-in when reverse geocoding yields nothing.
    pub fn from_coordinates(coord: Coord) -> Self {
        Self {
            lat: coord.lat,
            lon: coord.lon,
            name: format!("{}, {}", two_decimals(coord.lat), two_decimals(coord.lon)),
            country_code: FALLBACK_COUNTRY_CODE.to_string(),
        }
    }

    pub fn coord(&self) -> Coord {
        Coord::new(self.lat, self.lon)
    }
}

/// Two decimals with exact halves rounded away from zero; `-0` prints as
/// `0.00`. Only multiples of 1/8 can sit exactly halfway at two decimals.
fn two_decimals(x: f64) -> String {
    let eighths = x * 8.0;
    let x = if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        (x * 100.0).round() / 100.0
    } else if x == 0.0 {
        0.0
    } else {
        x
    };
    format!("{x:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_wins_over_coordinates() {
        let q = LocationQuery::from_params(Some("Paris"), Some("1"), Some("2")).unwrap();
        assert_eq!(q, LocationQuery::City("Paris".into()));
    }

    #[test]
    fn blank_city_falls_through_to_coordinates() {
        let q = LocationQuery::from_params(Some("  "), Some("12.9716"), Some("77.5946")).unwrap();
        assert_eq!(q, LocationQuery::Coordinates(Coord::new(12.9716, 77.5946)));
    }

    #[test]
    fn nothing_given_is_invalid() {
        let err = LocationQuery::from_params(None, Some("1"), None).unwrap_err();
        assert_eq!(err, WeatherError::InvalidRequest(MISSING_LOCATION_MESSAGE.into()));
    }

    #[test]
    fn non_numeric_coordinates_are_invalid() {
        let err = LocationQuery::from_params(None, Some("north"), Some("2")).unwrap_err();
        assert_eq!(err, WeatherError::InvalidRequest(INVALID_COORDINATES_MESSAGE.into()));

        let err = coord_from_params(Some("NaN"), Some("2")).unwrap_err();
        assert!(matches!(err, WeatherError::InvalidRequest(_)));
    }

    #[test]
    fn forecast_coordinates_required() {
        let err = coord_from_params(Some("1"), Some("")).unwrap_err();
        assert_eq!(err, WeatherError::InvalidRequest(MISSING_COORDINATES_MESSAGE.into()));
    }

    #[test]
    fn coordinate_fallback_name() {
        let loc = ResolvedLocation::from_coordinates(Coord::new(12.9716, 77.5946));
        assert_eq!(loc.name, "12.97, 77.59");
        assert_eq!(loc.country_code, "US");
    }

    #[test]
    fn coordinate_name_rounds_halves_away_from_zero() {
        let name = |lat, lon| ResolvedLocation::from_coordinates(Coord::new(lat, lon)).name;

        assert_eq!(name(0.125, 12.375), "0.13, 12.38");
        assert_eq!(name(-0.125, -12.375), "-0.13, -12.38");
        assert_eq!(name(-0.0, 0.0), "0.00, 0.00");
        assert_eq!(name(1.005, 2.675), "1.00, 2.67");
        assert_eq!(name(-0.001, 45.5), "-0.00, 45.50");
    }

    #[test]
    fn country_code_is_uppercased_or_defaulted() {
        assert_eq!(ResolvedLocation::new(0.0, 0.0, "x", Some("in")).country_code, "IN");
        assert_eq!(ResolvedLocation::new(0.0, 0.0, "x", Some("")).country_code, "US");
        assert_eq!(ResolvedLocation::new(0.0, 0.0, "x", None).country_code, "US");
    }

    #[test]
    fn serializes_country_code_in_camel_case() {
        let v = serde_json::to_value(ResolvedLocation::new(1.0, 2.0, "x", Some("de"))).unwrap();
        assert_eq!(v["countryCode"], "DE");
    }
}
