use crate::{
    Config,
    config::missing_key_error,
    error::{WeatherError, WeatherResult},
    location::{LocationQuery, ResolvedLocation},
    model::{Coord, CurrentWeather, ForecastList},
    provider::{openmeteo::OpenMeteoProvider, openweather::OpenWeatherProvider},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::{convert::TryFrom, fmt::Debug, time::Duration};

pub mod openmeteo;
pub mod openweather;

const USER_AGENT: &str = concat!("weather-proxy/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    OpenMeteo,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::OpenMeteo => "openmeteo",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::OpenMeteo]
    }

    pub const fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::OpenWeather)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "openmeteo" | "open-meteo" => Ok(ProviderId::OpenMeteo),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, openmeteo."
            )),
        }
    }
}

/// An upstream weather service whose responses are normalized into the
/// canonical schema.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Turn a place name or coordinate pair into a named location.
    async fn resolve(&self, query: &LocationQuery) -> WeatherResult<ResolvedLocation>;

    async fn current(&self, location: &ResolvedLocation) -> WeatherResult<CurrentWeather>;

    async fn forecast(&self, coord: Coord) -> WeatherResult<ForecastList>;

    /// Resolve, then fetch current conditions.
    async fn get_weather(&self, query: &LocationQuery) -> WeatherResult<CurrentWeather> {
        let location = self.resolve(query).await?;
        tracing::debug!(
            provider = %self.id(),
            name = %location.name,
            lat = location.lat,
            lon = location.lon,
            "resolved location"
        );
        self.current(&location).await
    }
}

/// HTTP client shared by the providers, with the upstream timeout applied.
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let http = http_client(Duration::from_secs(config.http.timeout_secs))?;
    let overrides = config.provider_config(id).cloned().unwrap_or_default();

    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::OpenWeather => {
            let api_key = config.provider_api_key(id).ok_or_else(|| missing_key_error(id))?;
            let mut provider = OpenWeatherProvider::new(api_key.to_owned(), http);
            if let Some(url) = overrides.base_url {
                provider = provider.with_base_url(url);
            }
            Box::new(provider)
        }
        ProviderId::OpenMeteo => {
            let mut provider = OpenMeteoProvider::new(http);
            if let Some(url) = overrides.base_url {
                provider = provider.with_forecast_url(url);
            }
            if let Some(url) = overrides.geocoding_url {
                provider = provider.with_geocoding_url(url);
            }
            Box::new(provider)
        }
    };

    Ok(boxed)
}

/// Construct the configured provider after validating the configuration.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.validate()?;
    provider_from_config(id, config)
}

/// Send a request and return status plus body text. Transport failures are
/// classified against `service`.
pub(crate) async fn send(
    request: RequestBuilder,
    service: &str,
) -> WeatherResult<(StatusCode, String)> {
    let res = request
        .send()
        .await
        .map_err(|e| WeatherError::from_reqwest(e, service))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| WeatherError::from_reqwest(e, service))?;

    Ok((status, body))
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &str, service: &str) -> WeatherResult<T> {
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!(
            service,
            error = %e,
            body = %truncate_body(body),
            "unreadable upstream payload"
        );
        WeatherError::upstream(format!("Failed to parse {service} response: {e}"))
    })
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

pub(crate) fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn provider_id_accepts_aliases() {
        assert_eq!(ProviderId::try_from("Open-Meteo").unwrap(), ProviderId::OpenMeteo);
        assert_eq!(ProviderId::try_from(" OPENWEATHER ").unwrap(), ProviderId::OpenWeather);
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(ProviderId::OpenWeather, &cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider"));
    }

    #[test]
    fn default_provider_is_open_meteo_without_key() {
        let cfg = Config::default();
        let provider = default_provider_from_config(&cfg).unwrap();
        assert_eq!(provider.id(), ProviderId::OpenMeteo);
    }

    #[test]
    fn default_provider_from_config_works_when_key_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "KEY".to_string());

        let provider = default_provider_from_config(&cfg).unwrap();
        assert_eq!(provider.id(), ProviderId::OpenWeather);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
