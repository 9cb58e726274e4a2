//! OpenWeather already speaks the canonical shape; conversion fills the
//! gaps and derives the hourly window and the daily strip from the 3-hourly
//! list.

use chrono::{DateTime, NaiveDate, Utc};

use super::{
    OwClouds, OwCurrentResponse, OwForecastItem, OwForecastResponse, OwMain, OwWeather, OwWind,
};
use crate::{
    location::ResolvedLocation,
    model::{
        City, Clouds, Condition, Coord, CurrentWeather, DEFAULT_HUMIDITY_PCT,
        DEFAULT_VISIBILITY_M, ForecastEntry, ForecastList, Main, Sys, Wind, round_pressure,
    },
    normalize::{DAILY_LIMIT, HOURLY_LIMIT, first_future_index, local_date_hour, local_noon_unix},
};

pub fn normalize_current(
    raw: &OwCurrentResponse,
    location: &ResolvedLocation,
    now: DateTime<Utc>,
) -> CurrentWeather {
    CurrentWeather {
        coord: location.coord(),
        weather: conditions(&raw.weather),
        base: "stations".to_string(),
        main: main_block(&raw.main),
        visibility: raw.visibility.unwrap_or(DEFAULT_VISIBILITY_M),
        wind: wind(&raw.wind),
        clouds: clouds(&raw.clouds),
        dt: raw.dt.unwrap_or_else(|| now.timestamp()),
        sys: Sys {
            kind: 1,
            id: 0,
            country: location.country_code.clone(),
            sunrise: raw.sys.sunrise,
            sunset: raw.sys.sunset,
        },
        timezone: raw.timezone.unwrap_or(0),
        id: 0,
        name: location.name.clone(),
        cod: 200,
    }
}

pub fn normalize_forecast(
    raw: &OwForecastResponse,
    coord: Coord,
    now: DateTime<Utc>,
) -> ForecastList {
    let offset = raw.city.timezone.unwrap_or(0);

    let instants: Vec<Option<i64>> = raw.list.iter().map(|item| Some(item.dt)).collect();
    let start = first_future_index(&instants, now);
    let list = raw
        .list
        .iter()
        .skip(start)
        .take(HOURLY_LIMIT)
        .map(|item| entry(item, offset))
        .collect();

    let city = City {
        id: raw.city.id.unwrap_or(0),
        name: raw.city.name.clone().unwrap_or_default(),
        coord,
        country: raw.city.country.clone().unwrap_or_default(),
        population: raw.city.population.unwrap_or(0),
        timezone: offset,
        sunrise: raw.city.sunrise,
        sunset: raw.city.sunset,
    };

    ForecastList::new(list, daily_entries(&raw.list, offset), city)
}

fn entry(item: &OwForecastItem, offset: i64) -> ForecastEntry {
    ForecastEntry {
        dt: item.dt,
        main: main_block(&item.main),
        weather: conditions(&item.weather),
        clouds: clouds(&item.clouds),
        wind: wind(&item.wind),
        visibility: item.visibility.unwrap_or(DEFAULT_VISIBILITY_M),
        pop: item.pop.filter(|p| !p.is_nan()).unwrap_or(0.0).clamp(0.0, 1.0),
        dt_txt: item.dt_txt.clone().unwrap_or_else(|| dt_txt(item.dt, offset)),
    }
}

/// Group the list by local calendar day; each day is represented by the
/// sample closest to local noon, with the day's extremes and peak pop.
fn daily_entries(list: &[OwForecastItem], offset: i64) -> Vec<ForecastEntry> {
    let mut days: Vec<(NaiveDate, Vec<&OwForecastItem>)> = Vec::new();
    for item in list {
        let Some((date, _)) = local_date_hour(item.dt, offset) else {
            continue;
        };
        let last = days.last().map(|(d, _)| *d);
        if last == Some(date) {
            if let Some((_, items)) = days.last_mut() {
                items.push(item);
            }
        } else if last.is_none_or(|last| date > last) {
            days.push((date, vec![item]));
        }
    }

    days.into_iter()
        .take(DAILY_LIMIT)
        .filter_map(|(date, items)| {
            let noon = local_noon_unix(date, offset)?;
            let rep = items.iter().min_by_key(|item| item.dt.abs_diff(noon))?;

            let temp_max = items
                .iter()
                .map(|i| i.main.temp_max.unwrap_or(i.main.temp))
                .fold(f64::NEG_INFINITY, f64::max);
            let temp_min = items
                .iter()
                .map(|i| i.main.temp_min.unwrap_or(i.main.temp))
                .fold(f64::INFINITY, f64::min);
            let pop = items
                .iter()
                .filter_map(|i| i.pop)
                .filter(|p| !p.is_nan())
                .fold(0.0, f64::max)
                .clamp(0.0, 1.0);

            let mut day = entry(rep, offset);
            day.dt = noon;
            day.main.temp = temp_max;
            day.main.temp_max = temp_max;
            day.main.temp_min = temp_min;
            day.pop = pop;
            day.dt_txt = format!("{date} 12:00:00");
            Some(day)
        })
        .collect()
}

fn dt_txt(unix: i64, offset: i64) -> String {
    unix.checked_add(offset)
        .and_then(|local| DateTime::from_timestamp(local, 0))
        .map(|t| t.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn conditions(weather: &[OwWeather]) -> Vec<Condition> {
    if weather.is_empty() {
        return vec![Condition::from_code(None)];
    }
    weather
        .iter()
        .map(|w| Condition {
            id: w.id,
            main: w.main.clone(),
            description: w.description.clone(),
            icon: w.icon.clone(),
        })
        .collect()
}

fn main_block(m: &OwMain) -> Main {
    let pressure = round_pressure(m.pressure);
    Main {
        temp: m.temp,
        feels_like: m.feels_like.unwrap_or(m.temp),
        temp_min: m.temp_min.unwrap_or(m.temp),
        temp_max: m.temp_max.unwrap_or(m.temp),
        pressure,
        humidity: m.humidity.unwrap_or(DEFAULT_HUMIDITY_PCT),
        sea_level: m.sea_level.map(|p| round_pressure(Some(p))).unwrap_or(pressure),
        grnd_level: m.grnd_level.map(|p| round_pressure(Some(p))).unwrap_or(pressure),
    }
}

fn wind(w: &OwWind) -> Wind {
    Wind {
        speed: w.speed.unwrap_or(0.0),
        deg: w.deg.unwrap_or(0.0),
        gust: w.gust.unwrap_or(0.0),
    }
}

fn clouds(c: &OwClouds) -> Clouds {
    Clouds {
        all: c.all.unwrap_or(0.0),
    }
}
