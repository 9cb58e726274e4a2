//! HTTP boundary errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use weather_core::WeatherError;

/// Wraps a [`WeatherError`] so handlers can return it with `?`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub WeatherError);

pub type ApiResult<T> = Result<T, ApiError>;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            WeatherError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            // Unknown cities stay 500 for compatibility with existing clients.
            WeatherError::NotFound(_) | WeatherError::Upstream(_) | WeatherError::Timeout(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self.0.message().trim() {
            "" => "Internal server error".to_string(),
            m => m.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self.0, %status, "request failed");
        } else {
            tracing::warn!(error = ?self.0, %status, "rejected request");
        }

        (status, Json(ErrorBody { message })).into_response()
    }
}
