use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    Config,
    error::{Error, Result},
    http::{build_client, truncate_body},
    model::{Coordinates, Language, Weather, WeatherType},
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    http: Client,
    url_template: String,
    api_key: String,
    language: Language,
}

impl OpenWeatherProvider {
    pub fn new(
        url_template: impl Into<String>,
        api_key: impl Into<String>,
        language: Language,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self> {
        let http = build_client(timeout, accept_invalid_certs).map_err(Error::weather_service)?;
        Ok(Self {
            http,
            url_template: url_template.into(),
            api_key: api_key.into(),
            language,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.weather_url_template.clone(),
            config.api_key(),
            config.language()?,
            config.weather_timeout(),
            config.accept_invalid_certs,
        )
    }

    fn url_for(&self, coordinates: Coordinates) -> String {
        self.url_template
            .replace("{latitude}", &coordinates.latitude.to_string())
            .replace("{longitude}", &coordinates.longitude.to_string())
            .replace("{api_key}", &self.api_key)
            .replace("{lang}", self.language.as_str())
    }

    async fn fetch_current(&self, coordinates: Coordinates) -> Result<String> {
        let url = self.url_for(coordinates);
        tracing::debug!(
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            "requesting current weather"
        );

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::weather_service(format!("failed to send request: {}", e.without_url())))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| Error::weather_service(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(Error::weather_service(format!(
                "request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    sys: OwSys,
}

/// Map an OpenWeather "current weather" body into a [`Weather`].
pub fn parse_current_response(body: &str) -> Result<Weather> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| Error::weather_service(format!("failed to parse response: {e}")))?;

    let code = parsed
        .weather
        .first()
        .map(|w| w.id)
        .ok_or_else(|| Error::weather_service("response contained no weather conditions"))?;

    let weather_type = WeatherType::from_condition_code(code)
        .ok_or_else(|| Error::weather_service(format!("unknown condition code {code}")))?;

    Ok(Weather {
        temperature: parsed.main.temp.round() as i32,
        weather_type,
        sunrise: unix_to_local(parsed.sys.sunrise)?,
        sunset: unix_to_local(parsed.sys.sunset)?,
        city: parsed.name,
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn get_weather(&self, coordinates: Coordinates) -> Result<Weather> {
        let body = self.fetch_current(coordinates).await?;
        let weather = parse_current_response(&body)?;

        tracing::info!(city = %weather.city, temperature = weather.temperature, "weather fetched");
        Ok(weather)
    }
}

fn unix_to_local(ts: i64) -> Result<DateTime<Local>> {
    DateTime::from_timestamp(ts, 0)
        .map(|utc| utc.with_timezone(&Local))
        .ok_or_else(|| Error::weather_service(format!("timestamp {ts} out of range")))
}
