//! WMO weather interpretation codes, as reported by Open-Meteo, mapped onto
//! OpenWeatherMap icon ids and lower-case descriptions.
//!
//! See: https://open-meteo.com/en/docs#weathervariables

/// Icon and description used for any code not in [`WEATHER_CODES`].
pub const DEFAULT_ICON: &str = "02d";
pub const DEFAULT_DESCRIPTION: &str = "partly cloudy";

/// `(code, icon, description)`; icon and description live in one row so the
/// two can never disagree.
pub const WEATHER_CODES: &[(i64, &str, &str)] = &[
    (0, "01d", "clear sky"),
    (1, "02d", "mainly clear"),
    (2, "03d", "partly cloudy"),
    (3, "04d", "overcast"),
    (45, "50d", "fog"),
    (48, "50d", "depositing rime fog"),
    (51, "09d", "light drizzle"),
    (53, "09d", "moderate drizzle"),
    (55, "09d", "dense drizzle"),
    (56, "09d", "light freezing drizzle"),
    (57, "09d", "dense freezing drizzle"),
    (61, "10d", "slight rain"),
    (63, "10d", "moderate rain"),
    (65, "10d", "heavy rain"),
    (66, "09d", "light freezing rain"),
    (67, "09d", "heavy freezing rain"),
    (71, "13d", "slight snow"),
    (73, "13d", "moderate snow"),
    (75, "13d", "heavy snow"),
    (77, "13d", "snow grains"),
    (80, "09d", "slight rain showers"),
    (81, "09d", "moderate rain showers"),
    (82, "09d", "violent rain showers"),
    (85, "13d", "slight snow showers"),
    (86, "13d", "heavy snow showers"),
    (95, "11d", "thunderstorm"),
    (96, "11d", "thunderstorm with slight hail"),
    (99, "11d", "thunderstorm with heavy hail"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherDescription {
    pub icon: &'static str,
    pub description: &'static str,
}

impl WeatherDescription {
    /// First word of the description, e.g. "thunderstorm" or "slight".
    pub fn summary(&self) -> &'static str {
        self.description.split(' ').next().unwrap_or(self.description)
    }
}

pub fn describe(code: i64) -> WeatherDescription {
    WEATHER_CODES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|&(_, icon, description)| WeatherDescription { icon, description })
        .unwrap_or(WeatherDescription {
            icon: DEFAULT_ICON,
            description: DEFAULT_DESCRIPTION,
        })
}

pub fn icon_for(code: i64) -> &'static str {
    describe(code).icon
}

pub fn description_for(code: i64) -> &'static str {
    describe(code).description
}

pub fn summary_for(code: i64) -> &'static str {
    describe(code).summary()
}
