//! Handlers for `/api/weather` and `/api/forecast`.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use weather_core::{CurrentWeather, ForecastList, LocationQuery, location::coord_from_params};

use crate::{AppState, error::ApiResult};

/// Raw query string. Values stay strings so that malformed numbers produce
/// the canonical 400 message instead of axum's extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct LocationParams {
    pub city: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

pub async fn current_weather(
    State(state): State<AppState>,
    Query(params): Query<LocationParams>,
) -> ApiResult<Json<CurrentWeather>> {
    let query = LocationQuery::from_params(
        params.city.as_deref(),
        params.lat.as_deref(),
        params.lon.as_deref(),
    )?;
    tracing::info!(?query, provider = %state.provider.id(), "current weather");

    let weather = state.provider.get_weather(&query).await?;
    Ok(Json(weather))
}

pub async fn forecast(
    State(state): State<AppState>,
    Query(params): Query<LocationParams>,
) -> ApiResult<Json<ForecastList>> {
    let coord = coord_from_params(params.lat.as_deref(), params.lon.as_deref())?;
    tracing::info!(lat = coord.lat, lon = coord.lon, provider = %state.provider.id(), "forecast");

    let forecast = state.provider.forecast(coord).await?;
    Ok(Json(forecast))
}
