use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use serde::Serialize;
use weather_core::{
    Config, LocationQuery, ProviderId, WeatherProvider, default_provider_from_config,
    location::coord_from_params,
};

use crate::{AppState, app};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "Weather proxy server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve {
        /// Interface to bind; overrides config and HOST.
        #[arg(long)]
        host: Option<String>,

        /// Port to bind; overrides config and PORT.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print current weather for a city or a coordinate pair as JSON.
    Show {
        /// City name, e.g. "Bengaluru".
        city: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        lon: Option<String>,
    },

    /// Print the hourly and daily forecast for a coordinate pair as JSON.
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        lat: String,

        #[arg(long, allow_hyphen_values = true)]
        lon: String,
    },

    /// Configure credentials for a specific provider and make it the default.
    Configure {
        /// Provider short name, "openweather" or "openmeteo".
        provider: String,

        /// Store this key instead of prompting for one.
        #[arg(long)]
        api_key: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { host, port } => serve(host, port).await,
            Command::Show { city, lat, lon } => {
                let query = LocationQuery::from_params(
                    city.as_deref(),
                    lat.as_deref(),
                    lon.as_deref(),
                )?;
                let provider = load_provider()?;
                print_json(&provider.get_weather(&query).await?)
            }
            Command::Forecast { lat, lon } => {
                let coord = coord_from_params(Some(&lat), Some(&lon))?;
                let provider = load_provider()?;
                print_json(&provider.forecast(coord).await?)
            }
            Command::Configure { provider, api_key } => configure(&provider, api_key),
        }
    }
}

fn load_provider() -> anyhow::Result<Box<dyn WeatherProvider>> {
    let config = Config::load_with_env()?;
    default_provider_from_config(&config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize response")?;
    println!("{json}");
    Ok(())
}

async fn serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::load_with_env()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    // Fails fast when the selected provider is unusable.
    let provider: Arc<dyn WeatherProvider> = Arc::from(default_provider_from_config(&config)?);
    tracing::info!(
        provider = %provider.id(),
        timeout_secs = config.http.timeout_secs,
        "provider ready"
    );

    let bind = (config.server.host.as_str(), config.server.port);
    let listener = tokio::net::TcpListener::bind(bind).await.with_context(|| {
        format!("Failed to bind {}:{}", config.server.host, config.server.port)
    })?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app(AppState::new(provider)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

fn configure(provider: &str, api_key: Option<String>) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    if id.requires_api_key() {
        let key = match api_key {
            Some(key) => key,
            None => Password::new(&format!("API key for {id}:"))
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt()
                .context("Failed to read API key")?,
        };
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("API key must not be empty");
        }
        config.upsert_provider_api_key(id, key.to_string());
    } else if api_key.is_some() {
        println!("Provider '{id}' does not use an API key; ignoring --api-key.");
    }

    config.set_default_provider(id);
    config.save()?;

    let path = Config::config_file_path()?;
    println!("Provider '{id}' configured in {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from(["weather-server", "serve", "--port", "8080"]).unwrap();
        match cli.command {
            Command::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8080));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "weather-server",
            "forecast",
            "--lat",
            "-33.87",
            "--lon",
            "151.21",
        ])
        .unwrap();
        match cli.command {
            Command::Forecast { lat, lon } => {
                assert_eq!(lat, "-33.87");
                assert_eq!(lon, "151.21");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn show_accepts_city_or_coordinates() {
        let by_city = Cli::try_parse_from(["weather-server", "show", "Bengaluru"]).unwrap();
        assert!(matches!(by_city.command, Command::Show { city: Some(_), .. }));

        let by_coord =
            Cli::try_parse_from(["weather-server", "show", "--lat", "1", "--lon", "2"]).unwrap();
        assert!(matches!(
            by_coord.command,
            Command::Show {
                city: None,
                lat: Some(_),
                lon: Some(_),
            }
        ));
    }

    #[test]
    fn configure_rejects_unknown_provider() {
        let err = configure("darksky", Some("k".into())).unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }
}
