//! Open-Meteo: free geocoding and forecast APIs, no key required.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{WeatherError, WeatherResult},
    location::{LocationQuery, ResolvedLocation},
    model::{Coord, CurrentWeather, ForecastList},
    normalize::checked_offset,
    provider::{ProviderId, WeatherProvider, parse_body, send, trim_base, truncate_body},
};

mod convert;

pub use convert::{normalize_current, normalize_forecast};

pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1";
pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
weather_code,wind_speed_10m,wind_direction_10m,wind_gusts_10m,surface_pressure,cloud_cover,\
visibility";
const CURRENT_DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,sunrise,sunset";
const HOURLY_FIELDS: &str =
    "temperature_2m,weather_code,relative_humidity_2m,wind_speed_10m,precipitation_probability";
const FORECAST_DAILY_FIELDS: &str =
    "temperature_2m_max,temperature_2m_min,weather_code,sunrise,sunset";
const FORECAST_DAYS: &str = "5";

const CITY_NOT_FOUND: &str = "City not found";
const FIND_CITY_PREFIX: &str = "Failed to find city";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    forecast_url: String,
    geocoding_url: String,
}

impl OpenMeteoProvider {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            forecast_url: FORECAST_URL.to_string(),
            geocoding_url: GEOCODING_URL.to_string(),
        }
    }

    pub fn with_forecast_url(mut self, url: impl Into<String>) -> Self {
        self.forecast_url = trim_base(url.into());
        self
    }

    pub fn with_geocoding_url(mut self, url: impl Into<String>) -> Self {
        self.geocoding_url = trim_base(url.into());
        self
    }

    async fn search(&self, params: &[(&str, String)]) -> WeatherResult<Vec<OmPlace>> {
        let url = format!("{}/search", self.geocoding_url);
        tracing::debug!(%url, ?params, "open-meteo geocoding");

        let (status, body) = send(
            self.http
                .get(&url)
                .query(params)
                .query(&[("count", "1"), ("language", "en"), ("format", "json")]),
            "Open-Meteo geocoding",
        )
        .await?;

        if !status.is_success() {
            return Err(WeatherError::upstream(format!(
                "Open-Meteo geocoding request failed with status {status}"
            )));
        }

        let parsed: OmGeocodingResponse = parse_body(&body, "Open-Meteo geocoding")?;
        Ok(parsed.results.unwrap_or_default())
    }

    async fn geocode(&self, name: &str) -> WeatherResult<ResolvedLocation> {
        let places = self
            .search(&[("name", name.to_string())])
            .await
            .map_err(|e| e.with_prefix(FIND_CITY_PREFIX))?;

        places
            .into_iter()
            .next()
            .map(OmPlace::into_resolved)
            .ok_or_else(|| WeatherError::NotFound(format!("{FIND_CITY_PREFIX}: {CITY_NOT_FOUND}")))
    }

    /// Best effort: `None` on any failure or an empty result.
    async fn reverse_geocode(&self, coord: Coord) -> Option<ResolvedLocation> {
        let params = [
            ("latitude", coord.lat.to_string()),
            ("longitude", coord.lon.to_string()),
        ];

        match self.search(&params).await {
            Ok(places) => places.into_iter().next().map(|place| {
                let mut resolved = place.into_resolved();
                resolved.lat = coord.lat;
                resolved.lon = coord.lon;
                resolved
            }),
            Err(e) => {
                tracing::debug!(error = %e, "reverse geocoding failed, using coordinates");
                None
            }
        }
    }

    async fn fetch_forecast_api<T: serde::de::DeserializeOwned>(
        &self,
        coord: Coord,
        params: &[(&str, &str)],
        failure: &str,
    ) -> WeatherResult<T> {
        let url = format!("{}/forecast", self.forecast_url);
        tracing::debug!(%url, lat = coord.lat, lon = coord.lon, "open-meteo forecast");

        let (status, body) = send(
            self.http
                .get(&url)
                .query(&[
                    ("latitude", coord.lat.to_string()),
                    ("longitude", coord.lon.to_string()),
                ])
                .query(params)
                .query(&[("timezone", "auto")]),
            "Open-Meteo",
        )
        .await?;

        if !status.is_success() {
            tracing::warn!(%status, body = %truncate_body(&body), "open-meteo request failed");
            return Err(WeatherError::upstream(failure));
        }

        parse_body(&body, "Open-Meteo")
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    async fn resolve(&self, query: &LocationQuery) -> WeatherResult<ResolvedLocation> {
        match query {
            LocationQuery::City(name) => self.geocode(name).await,
            LocationQuery::Coordinates(coord) => Ok(self
                .reverse_geocode(*coord)
                .await
                .unwrap_or_else(|| ResolvedLocation::from_coordinates(*coord))),
        }
    }

    async fn current(&self, location: &ResolvedLocation) -> WeatherResult<CurrentWeather> {
        let raw: OmCurrentResponse = self
            .fetch_forecast_api(
                location.coord(),
                &[("current", CURRENT_FIELDS), ("daily", CURRENT_DAILY_FIELDS)],
                "Failed to fetch weather data",
            )
            .await?;
        checked_offset(raw.utc_offset_seconds, "Open-Meteo")?;

        Ok(normalize_current(&raw, location, Utc::now()))
    }

    async fn forecast(&self, coord: Coord) -> WeatherResult<ForecastList> {
        let raw: OmForecastResponse = self
            .fetch_forecast_api(
                coord,
                &[
                    ("hourly", HOURLY_FIELDS),
                    ("daily", FORECAST_DAILY_FIELDS),
                    ("forecast_days", FORECAST_DAYS),
                ],
                "Failed to fetch forecast data",
            )
            .await?;
        checked_offset(raw.utc_offset_seconds, "Open-Meteo")?;

        if raw.hourly.precipitation_probability.is_empty() {
            tracing::debug!("precipitation probability missing from forecast response");
        }

        Ok(normalize_forecast(&raw, coord, Utc::now()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OmGeocodingResponse {
    #[serde(default)]
    pub results: Option<Vec<OmPlace>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OmPlace {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country_code: Option<String>,
}

impl OmPlace {
    fn into_resolved(self) -> ResolvedLocation {
        ResolvedLocation::new(
            self.latitude,
            self.longitude,
            self.name,
            self.country_code.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OmCurrent {
    pub temperature_2m: f64,
    #[serde(default)]
    pub relative_humidity_2m: Option<f64>,
    #[serde(default)]
    pub apparent_temperature: Option<f64>,
    #[serde(default)]
    pub weather_code: Option<i64>,
    #[serde(default)]
    pub wind_speed_10m: Option<f64>,
    #[serde(default)]
    pub wind_direction_10m: Option<f64>,
    #[serde(default)]
    pub wind_gusts_10m: Option<f64>,
    #[serde(default)]
    pub surface_pressure: Option<f64>,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    /// Kilometers.
    #[serde(default)]
    pub visibility: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OmDaily {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<i64>>,
    #[serde(default)]
    pub sunrise: Vec<Option<String>>,
    #[serde(default)]
    pub sunset: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OmHourly {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<i64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    /// Percent, 0–100.
    #[serde(default)]
    pub precipitation_probability: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OmCurrentResponse {
    #[serde(default)]
    pub utc_offset_seconds: Option<i64>,
    pub current: OmCurrent,
    #[serde(default)]
    pub daily: OmDaily,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OmForecastResponse {
    #[serde(default)]
    pub utc_offset_seconds: Option<i64>,
    #[serde(default)]
    pub hourly: OmHourly,
    #[serde(default)]
    pub daily: OmDaily,
}
