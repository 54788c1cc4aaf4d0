use crate::{Config, Coordinates, Weather, error::Result, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, coordinates: Coordinates) -> Result<Weather>;
}

/// Construct the weather provider described by config.
pub fn provider_from_config(config: &Config) -> Result<Box<dyn WeatherProvider>> {
    if config.api_key().is_empty() && config.weather_url_template.contains("{api_key}") {
        tracing::warn!(
            "No OpenWeather API key configured; run `ipweather configure` or set {}",
            crate::config::API_KEY_ENV
        );
    }

    Ok(Box::new(OpenWeatherProvider::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn provider_from_default_config() {
        assert!(provider_from_config(&Config::default()).is_ok());
    }

    #[test]
    fn provider_from_config_rejects_unknown_language() {
        let cfg = Config {
            language: "xx".into(),
            ..Config::default()
        };
        let err = provider_from_config(&cfg).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage(_)));
    }
}
