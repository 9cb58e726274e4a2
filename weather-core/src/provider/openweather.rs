use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::{WeatherError, WeatherResult},
    location::{LocationQuery, ResolvedLocation},
    model::{Coord, CurrentWeather, ForecastList},
    normalize::checked_offset,
    provider::{ProviderId, WeatherProvider, parse_body, send, trim_base, truncate_body},
};

mod convert;

pub use convert::{normalize_current, normalize_forecast};

pub const BASE_URL: &str = "https://api.openweathermap.org";

const FIND_CITY_PREFIX: &str = "Failed to find city";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    http: Client,
    base_url: String,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self {
            api_key,
            http,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = trim_base(url.into());
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        failure: &str,
    ) -> WeatherResult<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, ?params, "openweather request");

        let (status, body) = send(
            self.http
                .get(&url)
                .query(params)
                .query(&[("appid", self.api_key.as_str())]),
            "OpenWeather",
        )
        .await?;

        if !status.is_success() {
            tracing::warn!(%status, body = %truncate_body(&body), "openweather request failed");
            // OpenWeather explains failures in a `message` field.
            let message = serde_json::from_str::<OwErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| failure.to_string());
            return Err(WeatherError::Upstream(message));
        }

        parse_body(&body, "OpenWeather")
    }

    async fn geocode(&self, name: &str) -> WeatherResult<ResolvedLocation> {
        let places: Vec<OwGeoPlace> = self
            .get_json(
                "/geo/1.0/direct",
                &[("q", name.to_string()), ("limit", "1".to_string())],
                "Failed to fetch geocoding data",
            )
            .await
            .map_err(|e| e.with_prefix(FIND_CITY_PREFIX))?;

        places
            .into_iter()
            .next()
            .map(OwGeoPlace::into_resolved)
            .ok_or_else(|| WeatherError::NotFound(format!("{FIND_CITY_PREFIX}: City not found")))
    }

    /// Best effort: `None` on any failure or an empty result.
    async fn reverse_geocode(&self, coord: Coord) -> Option<ResolvedLocation> {
        let result: WeatherResult<Vec<OwGeoPlace>> = self
            .get_json(
                "/geo/1.0/reverse",
                &[
                    ("lat", coord.lat.to_string()),
                    ("lon", coord.lon.to_string()),
                    ("limit", "1".to_string()),
                ],
                "Failed to fetch geocoding data",
            )
            .await;

        match result {
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
}

fn coord_params(coord: Coord) -> [(&'static str, String); 3] {
    [
        ("lat", coord.lat.to_string()),
        ("lon", coord.lon.to_string()),
        ("units", "metric".to_string()),
    ]
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
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
        let raw: OwCurrentResponse = self
            .get_json(
                "/data/2.5/weather",
                &coord_params(location.coord()),
                "Failed to fetch weather data",
            )
            .await?;
        checked_offset(raw.timezone, "OpenWeather")?;

        Ok(normalize_current(&raw, location, Utc::now()))
    }

    async fn forecast(&self, coord: Coord) -> WeatherResult<ForecastList> {
        let raw: OwForecastResponse = self
            .get_json(
                "/data/2.5/forecast",
                &coord_params(coord),
                "Failed to fetch forecast data",
            )
            .await?;
        checked_offset(raw.city.timezone, "OpenWeather")?;

        Ok(normalize_forecast(&raw, coord, Utc::now()))
    }
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwGeoPlace {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: Option<String>,
}

impl OwGeoPlace {
    fn into_resolved(self) -> ResolvedLocation {
        ResolvedLocation::new(self.lat, self.lon, self.name, self.country.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwWeather {
    pub id: i64,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwMain {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub sea_level: Option<f64>,
    #[serde(default)]
    pub grnd_level: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwWind {
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub deg: Option<f64>,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwClouds {
    #[serde(default)]
    pub all: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwSys {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwCurrentResponse {
    #[serde(default)]
    pub weather: Vec<OwWeather>,
    pub main: OwMain,
    /// Meters.
    #[serde(default)]
    pub visibility: Option<f64>,
    #[serde(default)]
    pub wind: OwWind,
    #[serde(default)]
    pub clouds: OwClouds,
    #[serde(default)]
    pub dt: Option<i64>,
    #[serde(default)]
    pub sys: OwSys,
    /// UTC offset in seconds.
    #[serde(default)]
    pub timezone: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwForecastItem {
    pub dt: i64,
    pub main: OwMain,
    #[serde(default)]
    pub weather: Vec<OwWeather>,
    #[serde(default)]
    pub clouds: OwClouds,
    #[serde(default)]
    pub wind: OwWind,
    #[serde(default)]
    pub visibility: Option<f64>,
    /// Already a 0–1 fraction.
    #[serde(default)]
    pub pop: Option<f64>,
    #[serde(default)]
    pub dt_txt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwCity {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub population: Option<i64>,
    #[serde(default)]
    pub timezone: Option<i64>,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwForecastResponse {
    #[serde(default)]
    pub list: Vec<OwForecastItem>,
    #[serde(default)]
    pub city: OwCity,
}
