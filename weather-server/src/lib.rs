//! HTTP boundary of the weather proxy.
//!
//! This crate focuses on:
//! - Routing `/api/weather` and `/api/forecast` to a [`WeatherProvider`]
//! - Mapping failures to `{message}` responses
//! - CORS and request tracing

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, Method},
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use weather_core::WeatherProvider;

pub mod cli;
pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

/// Request headers a browser client may send.
pub const ALLOWED_HEADERS: [&str; 9] = [
    "x-csrf-token",
    "x-requested-with",
    "accept",
    "accept-version",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "x-api-version",
];

/// State shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub provider: Arc<dyn WeatherProvider>,
}

impl AppState {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }
}

/// Build the router with CORS and tracing applied to every route.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/weather", get(handlers::current_weather))
        .route("/api/forecast", get(handlers::forecast))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

/// Every `OPTIONS` request is answered here with 200 and an empty body.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(ALLOWED_HEADERS.map(HeaderName::from_static))
}
