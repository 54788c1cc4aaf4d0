use chrono::{DateTime, Local};
use std::{convert::TryFrom, fmt};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Copy with both components rounded to one decimal place.
    ///
    /// Ties round away from zero, so `49.95` becomes `50.0`.
    pub fn rounded(self) -> Self {
        Self {
            latitude: round_to_tenth(self.latitude),
            longitude: round_to_tenth(self.longitude),
        }
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    En,
    Ua,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ua => "ua",
        }
    }

    pub const fn all() -> &'static [Language] {
        &[Language::En, Language::Ua]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Language {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            // "uk" is the ISO 639-1 tag for Ukrainian.
            "ua" | "uk" => Ok(Language::Ua),
            _ => Err(Error::UnsupportedLanguage(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherType {
    Thunderstorm,
    Drizzle,
    Rain,
    Snow,
    Clear,
    Fog,
    Clouds,
}

impl WeatherType {
    /// Localized display label.
    pub fn label(&self, language: Language) -> &'static str {
        use Language::*;
        use WeatherType::*;

        match (self, language) {
            (Thunderstorm, En) => "Thunderstorm",
            (Drizzle, En) => "Drizzle",
            (Rain, En) => "Rain",
            (Snow, En) => "Snow",
            (Clear, En) => "Clear",
            (Fog, En) => "Fog",
            (Clouds, En) => "Clouds",

            (Thunderstorm, Ua) => "Гроза",
            (Drizzle, Ua) => "Мряка",
            (Rain, Ua) => "Дощ",
            (Snow, Ua) => "Сніг",
            (Clear, Ua) => "Ясно",
            (Fog, Ua) => "Туман",
            (Clouds, Ua) => "Хмарно",
        }
    }

    /// Category for an OpenWeather condition code.
    ///
    /// Matching is done on the decimal prefix of the code, first match wins.
    /// `"800"` has to be tried before `"80"`.
    pub fn from_condition_code(code: i64) -> Option<Self> {
        const PREFIXES: &[(&str, WeatherType)] = &[
            ("1", WeatherType::Thunderstorm),
            ("2", WeatherType::Thunderstorm),
            ("3", WeatherType::Drizzle),
            ("5", WeatherType::Rain),
            ("6", WeatherType::Snow),
            ("7", WeatherType::Fog),
            ("800", WeatherType::Clear),
            ("80", WeatherType::Clouds),
        ];

        let code = code.to_string();
        PREFIXES
            .iter()
            .find(|(prefix, _)| code.starts_with(prefix))
            .map(|(_, weather_type)| *weather_type)
    }
}

/// One observation, built in a single step from the weather service response.
#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    pub temperature: i32,
    pub weather_type: WeatherType,
    pub sunrise: DateTime<Local>,
    pub sunset: DateTime<Local>,
    pub city: String,
}
