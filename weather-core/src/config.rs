use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::provider::ProviderId;

/// Overrides the config file location.
pub const ENV_CONFIG_PATH: &str = "WEATHER_CONFIG";
/// OpenWeather API key.
pub const ENV_API_KEY: &str = "WEATHER_API_KEY";
pub const ENV_PROVIDER: &str = "WEATHER_PROVIDER";
pub const ENV_TIMEOUT_SECS: &str = "WEATHER_TIMEOUT_SECS";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";

/// Configuration for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the weather API, e.g. "https://api.open-meteo.com/v1".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Base URL of the geocoding API, when the provider hosts it separately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocoding_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout applied to every upstream request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    5
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional provider id, "openweather" or "openmeteo". When unset the
    /// provider follows from whether an OpenWeather key is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// The provider to serve with: the explicit choice if any, otherwise
    /// OpenWeather when it has a key and Open-Meteo when it does not.
    pub fn provider_id(&self) -> Result<ProviderId> {
        match self.default_provider.as_deref() {
            Some(s) => ProviderId::try_from(s),
            None if self.is_provider_configured(ProviderId::OpenWeather) => {
                Ok(ProviderId::OpenWeather)
            }
            None => Ok(ProviderId::OpenMeteo),
        }
    }

    /// Fail-fast startup check: the selected provider must be usable.
    pub fn validate(&self) -> Result<ProviderId> {
        let id = self.provider_id()?;
        if id.requires_api_key() && !self.is_provider_configured(id) {
            return Err(missing_key_error(id));
        }
        if self.http.timeout_secs == 0 {
            return Err(anyhow!("http.timeout_secs must be greater than zero"));
        }
        Ok(id)
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Load config from the default location, or an empty default if it
    /// doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Load the file, then apply process environment overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut cfg = Self::load()?;
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Apply overrides from an environment lookup. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.providers
                .entry(ProviderId::OpenWeather.as_str().to_string())
                .or_default()
                .api_key = Some(key);
        }
        if let Some(provider) = get(ENV_PROVIDER) {
            let id = ProviderId::try_from(provider.as_str())?;
            self.set_default_provider(id);
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            self.http.timeout_secs = secs
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds"))?;
        }
        if let Some(host) = get(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.port =
                port.parse().with_context(|| format!("{ENV_PORT} must be a port number"))?;
        }

        Ok(())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(ENV_CONFIG_PATH) {
            return Ok(PathBuf::from(path));
        }

        let dirs = ProjectDirs::from("dev", "weather-proxy", "weather-server")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set/replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .entry(provider_id.as_str().to_string())
            .or_default()
            .api_key = Some(api_key);
    }

    /// Returns API key for a provider, if present and non-blank.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id)
            .and_then(|cfg| cfg.api_key.as_deref())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        !provider_id.requires_api_key() || self.provider_api_key(provider_id).is_some()
    }
}

pub(crate) fn missing_key_error(id: ProviderId) -> anyhow::Error {
    anyhow!(
        "No API key configured for provider '{id}'.\n\
         Hint: set {ENV_API_KEY} or run `weather-server configure {id}`."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn defaults_to_open_meteo_without_key() {
        let cfg = Config::default();
        assert_eq!(cfg.provider_id().unwrap(), ProviderId::OpenMeteo);
        assert_eq!(cfg.validate().unwrap(), ProviderId::OpenMeteo);
    }

    #[test]
    fn api_key_selects_openweather() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[(ENV_API_KEY, "OPEN_KEY")])).unwrap();

        assert_eq!(cfg.provider_id().unwrap(), ProviderId::OpenWeather);
        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("OPEN_KEY"));
    }

    #[test]
    fn explicit_openweather_without_key_fails_fast() {
        let mut cfg = Config::default();
        cfg.set_default_provider(ProviderId::OpenWeather);

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider 'openweather'"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "   ".into());

        assert!(!cfg.is_provider_configured(ProviderId::OpenWeather));
        assert_eq!(cfg.provider_id().unwrap(), ProviderId::OpenMeteo);
    }

    #[test]
    fn explicit_provider_overrides_key_selection() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[(ENV_API_KEY, "K"), (ENV_PROVIDER, "OpenMeteo")])).unwrap();

        assert_eq!(cfg.provider_id().unwrap(), ProviderId::OpenMeteo);
    }

    #[test]
    fn env_overrides_server_and_timeout() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[(ENV_PORT, "8080"), (ENV_HOST, "127.0.0.1"), (ENV_TIMEOUT_SECS, "2")]))
            .unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.http.timeout_secs, 2);
    }

    #[test]
    fn bad_env_values_are_errors() {
        let mut cfg = Config::default();
        assert!(cfg.apply_env(env(&[(ENV_PORT, "http")])).is_err());
        assert!(cfg.apply_env(env(&[(ENV_PROVIDER, "darksky")])).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = Config::default();
        cfg.http.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "KEY".into());
        cfg.server.port = 4000;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.provider_api_key(ProviderId::OpenWeather), Some("KEY"));
        assert_eq!(loaded.server.port, 4000);
        assert_eq!(loaded.http.timeout_secs, 5);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.providers.is_empty());
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: Config = toml::from_str(
            r#"
            default_provider = "openmeteo"

            [providers.openmeteo]
            base_url = "http://localhost:9000"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.provider_id().unwrap(), ProviderId::OpenMeteo);
        assert_eq!(
            cfg.provider_config(ProviderId::OpenMeteo).and_then(|p| p.base_url.as_deref()),
            Some("http://localhost:9000")
        );
        assert_eq!(cfg.server.host, "0.0.0.0");
    }
}
