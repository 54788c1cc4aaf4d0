use crate::{
    Config,
    error::{Error, Result},
    format::format_weather,
    history::{WeatherStorage, storage_from_config},
    location::{IpInfoLocator, LocationSource},
    model::{Language, Weather},
    provider::{WeatherProvider, provider_from_config},
};

/// Outcome of a run that got as far as fetching weather.
#[derive(Debug)]
pub struct Report {
    pub weather: Weather,
    /// Formatted report for display.
    pub output: String,
    /// Set when the observation could not be appended to history. The
    /// weather itself is still valid and should be shown.
    pub storage_error: Option<Error>,
}

/// Location lookup, weather lookup, formatting and history append, in that order.
#[derive(Debug)]
pub struct Pipeline {
    locator: Box<dyn LocationSource>,
    provider: Box<dyn WeatherProvider>,
    storage: Box<dyn WeatherStorage>,
    language: Language,
}

impl Pipeline {
    pub fn new(
        locator: Box<dyn LocationSource>,
        provider: Box<dyn WeatherProvider>,
        storage: Box<dyn WeatherStorage>,
        language: Language,
    ) -> Self {
        Self {
            locator,
            provider,
            storage,
            language,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Box::new(IpInfoLocator::from_config(config)?),
            provider_from_config(config)?,
            storage_from_config(config)?,
            config.language()?,
        ))
    }

    /// Run every stage once.
    ///
    /// Returns `Err` when the location or the weather cannot be obtained; no
    /// later stage runs in that case. A history failure is reported through
    /// [`Report::storage_error`] instead.
    pub async fn run(&self) -> Result<Report> {
        let coordinates = self.locator.resolve().await?;
        let weather = self.provider.get_weather(coordinates).await?;

        let output = format_weather(&weather, self.language);

        let storage_error = match self.storage.save(&weather) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "weather fetched but not saved to history");
                Some(e)
            }
        };

        Ok(Report {
            weather,
            output,
            storage_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, WeatherType};
    use async_trait::async_trait;
    use chrono::{Local, TimeZone};
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug)]
    struct FixedLocation(Option<Coordinates>);

    #[async_trait]
    impl LocationSource for FixedLocation {
        async fn resolve(&self) -> Result<Coordinates> {
            self.0.ok_or_else(|| Error::location("no route to host"))
        }
    }

    #[derive(Debug, Default)]
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl WeatherProvider for CountingProvider {
        async fn get_weather(&self, _coordinates: Coordinates) -> Result<Weather> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::weather_service("HTTP 503"));
            }
            Ok(Weather {
                temperature: 25,
                weather_type: WeatherType::Clear,
                sunrise: Local.with_ymd_and_hms(2022, 5, 3, 4, 0, 0).unwrap(),
                sunset: Local.with_ymd_and_hms(2022, 5, 3, 20, 25, 0).unwrap(),
                city: "Kharkov".into(),
            })
        }
    }

    #[derive(Debug, Default)]
    struct MemoryStorage {
        saved: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl WeatherStorage for MemoryStorage {
        fn save(&self, weather: &Weather) -> Result<()> {
            if self.fail {
                return Err(Error::storage("disk full"));
            }
            self.saved.lock().unwrap().push(weather.city.clone());
            Ok(())
        }

        fn entries(&self) -> Result<Vec<String>> {
            Ok(self.saved.lock().unwrap().clone())
        }
    }

    fn coords() -> Option<Coordinates> {
        Some(Coordinates::new(49.9, 36.2))
    }

    #[tokio::test]
    async fn happy_path_formats_and_saves() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(
            Box::new(FixedLocation(coords())),
            Box::new(CountingProvider::default()),
            Box::new(MemoryStorage {
                saved: saved.clone(),
                fail: false,
            }),
            Language::En,
        );

        let report = pipeline.run().await.unwrap();

        assert!(report.output.contains("Kharkov, 25°C, Clear"));
        assert!(report.storage_error.is_none());
        assert_eq!(*saved.lock().unwrap(), vec!["Kharkov".to_string()]);
    }

    #[tokio::test]
    async fn location_failure_skips_weather_and_storage() {
        let calls = Arc::new(AtomicUsize::new(0));
        let saved = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(
            Box::new(FixedLocation(None)),
            Box::new(CountingProvider {
                calls: calls.clone(),
                fail: false,
            }),
            Box::new(MemoryStorage {
                saved: saved.clone(),
                fail: false,
            }),
            Language::En,
        );

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, Error::LocationUnavailable(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn weather_failure_skips_storage() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(
            Box::new(FixedLocation(coords())),
            Box::new(CountingProvider {
                fail: true,
                ..Default::default()
            }),
            Box::new(MemoryStorage {
                saved: saved.clone(),
                fail: false,
            }),
            Language::En,
        );

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, Error::WeatherServiceUnavailable(_)));
        assert!(saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_reported_not_fatal() {
        let pipeline = Pipeline::new(
            Box::new(FixedLocation(coords())),
            Box::new(CountingProvider::default()),
            Box::new(MemoryStorage {
                fail: true,
                ..Default::default()
            }),
            Language::Ua,
        );

        let report = pipeline.run().await.unwrap();

        assert!(report.output.contains("Kharkov, 25°C, Ясно"));
        assert!(matches!(report.storage_error, Some(Error::Storage(_))));
    }
}
