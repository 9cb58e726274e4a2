//! Core library for the weather proxy.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over upstream weather providers (OpenWeather, Open-Meteo)
//! - The canonical current/forecast schema every provider is normalized into
//!
//! It is used by `weather-server`, but can also be reused by other binaries or services.

pub mod codes;
pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod normalize;
pub mod provider;

pub use config::{Config, HttpConfig, ProviderConfig, ServerConfig};
pub use error::{WeatherError, WeatherResult};
pub use location::{LocationQuery, ResolvedLocation};
pub use model::{
    City, Clouds, Condition, Coord, CurrentWeather, ForecastEntry, ForecastList, Main, Sys, Wind,
};
pub use provider::{
    ProviderId, WeatherProvider, default_provider_from_config, http_client, provider_from_config,
};
