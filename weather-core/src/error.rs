use thiserror::Error;

/// Failure kinds surfaced by location resolution and providers.
///
/// Every variant carries the message shown to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// Required query parameters are missing or malformed.
    #[error("{0}")]
    InvalidRequest(String),

    /// A place name could not be geocoded.
    #[error("{0}")]
    NotFound(String),

    /// Transport failure, non-2xx status, or an unreadable payload.
    #[error("{0}")]
    Upstream(String),

    /// The upstream call exceeded the configured timeout.
    #[error("{0}")]
    Timeout(String),
}

impl WeatherError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Classify a transport error raised while talking to `service`.
    pub fn from_reqwest(err: reqwest::Error, service: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("Request to {service} timed out"))
        } else {
            Self::Upstream(format!("Request to {service} failed: {err}"))
        }
    }

    /// Prefix the message, keeping the kind.
    pub fn with_prefix(self, prefix: &str) -> Self {
        match self {
            Self::InvalidRequest(m) => Self::InvalidRequest(format!("{prefix}: {m}")),
            Self::NotFound(m) => Self::NotFound(format!("{prefix}: {m}")),
            Self::Upstream(m) => Self::Upstream(format!("{prefix}: {m}")),
            Self::Timeout(m) => Self::Timeout(format!("{prefix}: {m}")),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest(m) | Self::NotFound(m) | Self::Upstream(m) | Self::Timeout(m) => m,
        }
    }
}

pub type WeatherResult<T> = Result<T, WeatherError>;
