//! Open-Meteo payloads to the canonical schema.

use chrono::{DateTime, NaiveDate, Timelike, Utc};

use super::{OmCurrentResponse, OmDaily, OmForecastResponse, OmHourly};
use crate::{
    location::ResolvedLocation,
    model::{
        City, Clouds, Condition, Coord, CurrentWeather, DEFAULT_HUMIDITY_PCT,
        DEFAULT_PRESSURE_HPA, DEFAULT_VISIBILITY_M, ForecastEntry, ForecastList, Main, Sys, Wind,
        round_pressure,
    },
    normalize::{
        DAILY_LIMIT, HOURLY_LIMIT, NOON, at, first_future_index, km_to_m, local_noon_unix,
        local_to_unix, parse_local, pop_fraction,
    },
};

pub fn normalize_current(
    raw: &OmCurrentResponse,
    location: &ResolvedLocation,
    now: DateTime<Utc>,
) -> CurrentWeather {
    let current = &raw.current;
    let daily = &raw.daily;
    let offset = raw.utc_offset_seconds.unwrap_or(0);
    let temp = current.temperature_2m;
    let pressure = round_pressure(current.surface_pressure);

    CurrentWeather {
        coord: location.coord(),
        weather: vec![Condition::from_code(current.weather_code)],
        base: "stations".to_string(),
        main: Main {
            temp,
            feels_like: current.apparent_temperature.unwrap_or(temp),
            temp_min: at(&daily.temperature_2m_min, 0).unwrap_or(temp),
            temp_max: at(&daily.temperature_2m_max, 0).unwrap_or(temp),
            pressure,
            humidity: current.relative_humidity_2m.unwrap_or(DEFAULT_HUMIDITY_PCT),
            sea_level: pressure,
            grnd_level: pressure,
        },
        visibility: current.visibility.map(km_to_m).unwrap_or(DEFAULT_VISIBILITY_M),
        wind: Wind {
            speed: current.wind_speed_10m.unwrap_or(0.0),
            deg: current.wind_direction_10m.unwrap_or(0.0),
            gust: current.wind_gusts_10m.unwrap_or(0.0),
        },
        clouds: Clouds {
            all: current.cloud_cover.unwrap_or(0.0),
        },
        dt: now.timestamp(),
        sys: Sys {
            kind: 1,
            id: 0,
            country: location.country_code.clone(),
            sunrise: first_instant(&daily.sunrise, offset),
            sunset: first_instant(&daily.sunset, offset),
        },
        timezone: offset,
        id: 0,
        name: location.name.clone(),
        cod: 200,
    }
}

pub fn normalize_forecast(
    raw: &OmForecastResponse,
    coord: Coord,
    now: DateTime<Utc>,
) -> ForecastList {
    let offset = raw.utc_offset_seconds.unwrap_or(0);

    let city = City {
        id: 0,
        name: String::new(),
        coord,
        country: String::new(),
        population: 0,
        timezone: offset,
        sunrise: first_instant(&raw.daily.sunrise, offset),
        sunset: first_instant(&raw.daily.sunset, offset),
    };

    ForecastList::new(
        hourly_entries(&raw.hourly, offset, now),
        daily_entries(&raw.daily, &raw.hourly, offset),
        city,
    )
}

fn first_instant(values: &[Option<String>], offset: i64) -> Option<i64> {
    values
        .first()
        .and_then(Option::as_deref)
        .and_then(|s| local_to_unix(s, offset))
}

/// Up to [`HOURLY_LIMIT`] consecutive entries from the first hour after `now`.
fn hourly_entries(hourly: &OmHourly, offset: i64, now: DateTime<Utc>) -> Vec<ForecastEntry> {
    let instants: Vec<Option<i64>> = hourly
        .time
        .iter()
        .map(|t| local_to_unix(t, offset))
        .collect();

    let start = first_future_index(&instants, now);
    let end = instants.len().min(start + HOURLY_LIMIT);

    (start..end)
        .filter_map(|idx| {
            let dt = instants[idx]?;
            let temp = at(&hourly.temperature_2m, idx)?;

            Some(ForecastEntry {
                dt,
                main: flat_main(
                    temp,
                    temp,
                    temp,
                    at(&hourly.relative_humidity_2m, idx).unwrap_or(DEFAULT_HUMIDITY_PCT),
                ),
                weather: vec![Condition::from_code(at(&hourly.weather_code, idx))],
                clouds: Clouds { all: 0.0 },
                wind: Wind {
                    speed: at(&hourly.wind_speed_10m, idx).unwrap_or(0.0),
                    deg: 0.0,
                    gust: 0.0,
                },
                visibility: DEFAULT_VISIBILITY_M,
                pop: pop_fraction(at(&hourly.precipitation_probability, idx)),
                dt_txt: hourly.time[idx].clone(),
            })
        })
        .collect()
}

/// One entry per day at local noon for the first [`DAILY_LIMIT`] days.
fn daily_entries(daily: &OmDaily, hourly: &OmHourly, offset: i64) -> Vec<ForecastEntry> {
    let hourly_local: Vec<_> = hourly.time.iter().map(|t| parse_local(t)).collect();
    let mut entries = Vec::with_capacity(DAILY_LIMIT);
    let mut last_date: Option<NaiveDate> = None;

    for (day_idx, day) in daily.time.iter().take(DAILY_LIMIT).enumerate() {
        let Ok(date) = NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d") else {
            tracing::debug!(day = %day, "skipping unparseable daily date");
            continue;
        };
        if last_date.is_some_and(|last| date <= last) {
            continue;
        }

        let max = at(&daily.temperature_2m_max, day_idx);
        let min = at(&daily.temperature_2m_min, day_idx);
        let (temp_max, temp_min) = match (max, min) {
            (Some(max), Some(min)) => (max, min),
            (Some(t), None) | (None, Some(t)) => (t, t),
            (None, None) => continue,
        };
        let Some(dt) = local_noon_unix(date, offset) else {
            continue;
        };

        // Exact local-noon match; otherwise assume 24 samples per day.
        let hour_idx = hourly_local
            .iter()
            .position(|t| t.is_some_and(|t| t.date() == date && t.hour() == NOON))
            .unwrap_or(day_idx * 24);

        entries.push(ForecastEntry {
            dt,
            main: flat_main(
                temp_max,
                temp_min,
                temp_max,
                at(&hourly.relative_humidity_2m, hour_idx).unwrap_or(DEFAULT_HUMIDITY_PCT),
            ),
            weather: vec![Condition::from_code(at(&daily.weather_code, day_idx))],
            clouds: Clouds { all: 0.0 },
            wind: Wind {
                speed: at(&hourly.wind_speed_10m, hour_idx).unwrap_or(0.0),
                deg: 0.0,
                gust: 0.0,
            },
            visibility: DEFAULT_VISIBILITY_M,
            pop: 0.0,
            dt_txt: format!("{date} 12:00:00"),
        });
        last_date = Some(date);
    }

    entries
}

/// Forecast `main` block; only temperatures are known, `feels_like` mirrors
/// `temp` and pressure is the standard default.
fn flat_main(temp: f64, temp_min: f64, temp_max: f64, humidity: f64) -> Main {
    Main {
        temp,
        feels_like: temp,
        temp_min,
        temp_max,
        pressure: DEFAULT_PRESSURE_HPA,
        humidity,
        sea_level: DEFAULT_PRESSURE_HPA,
        grnd_level: DEFAULT_PRESSURE_HPA,
    }
}
