//! Canonical (OpenWeatherMap-shaped) response schema returned to callers
//! regardless of the upstream provider.

use serde::{Deserialize, Serialize};

use crate::codes;

/// Surface pressure reported when upstream has none, in hPa.
pub const DEFAULT_PRESSURE_HPA: i64 = 1013;
/// Relative humidity reported when upstream has none, in percent.
pub const DEFAULT_HUMIDITY_PCT: f64 = 50.0;
/// Visibility reported when upstream has none, in meters.
pub const DEFAULT_VISIBILITY_M: f64 = 10_000.0;
/// Condition id used when upstream omits the weather code.
pub const UNKNOWN_WEATHER_CODE: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl Condition {
    pub fn from_code(code: Option<i64>) -> Self {
        let id = code.unwrap_or(UNKNOWN_WEATHER_CODE);
        let desc = codes::describe(id);
        Self {
            id,
            main: desc.summary().to_string(),
            description: desc.description.to_string(),
            icon: desc.icon.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Main {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i64,
    pub humidity: f64,
    pub sea_level: i64,
    pub grnd_level: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: f64,
    pub gust: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    pub all: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sys {
    #[serde(rename = "type")]
    pub kind: i64,
    pub id: i64,
    pub country: String,
    /// Unix seconds; `None` when upstream did not report it.
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

/// Current conditions for one resolved location.
///
/// `main.temp_min <= main.temp <= main.temp_max` does not necessarily hold:
/// the extremes come from the day's forecast, the temperature from the
/// instantaneous reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub coord: Coord,
    pub weather: Vec<Condition>,
    pub base: String,
    pub main: Main,
    pub visibility: f64,
    pub wind: Wind,
    pub clouds: Clouds,
    pub dt: i64,
    pub sys: Sys,
    /// UTC offset in seconds.
    pub timezone: i64,
    pub id: i64,
    pub name: String,
    pub cod: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: Main,
    pub weather: Vec<Condition>,
    pub clouds: Clouds,
    pub wind: Wind,
    pub visibility: f64,
    /// Probability of precipitation, 0.0..=1.0.
    pub pop: f64,
    pub dt_txt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub coord: Coord,
    pub country: String,
    pub population: i64,
    pub timezone: i64,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

/// Forecast bundle. The frontend reads `list` for the hourly strip and
/// `daily` for the five-day strip; both names must stay as they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastList {
    pub cod: String,
    pub message: i64,
    pub cnt: usize,
    pub list: Vec<ForecastEntry>,
    pub city: City,
    pub daily: Vec<ForecastEntry>,
}

impl ForecastList {
    pub fn new(list: Vec<ForecastEntry>, daily: Vec<ForecastEntry>, city: City) -> Self {
        Self {
            cod: "200".to_string(),
            message: 0,
            cnt: list.len(),
            list,
            city,
            daily,
        }
    }
}

pub(crate) fn round_pressure(hpa: Option<f64>) -> i64 {
    hpa.filter(|p| p.is_finite())
        .map(|p| p.round() as i64)
        .unwrap_or(DEFAULT_PRESSURE_HPA)
}
