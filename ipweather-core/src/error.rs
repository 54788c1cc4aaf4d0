use thiserror::Error;

/// Failures surfaced by the weather pipeline.
///
/// Every stage folds all of its failure causes into exactly one variant.
/// The attached string is a diagnostic for logs; callers decide on the
/// variant alone.
#[derive(Debug, Error)]
pub enum Error {
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("weather service unavailable: {0}")]
    WeatherServiceUnavailable(String),

    #[error("history storage failed: {0}")]
    Storage(String),

    #[error("Unsupported language '{0}'. Supported languages: en, ua.")]
    UnsupportedLanguage(String),

    #[error("Unsupported history format '{0}'. Supported formats: plain, json.")]
    UnsupportedHistoryFormat(String),
}

impl Error {
    /// Message suitable for printing to the user when a run is aborted.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::LocationUnavailable(_) => "Could not get GPS coordinates.",
            Error::WeatherServiceUnavailable(_) => "Could not get weather from the weather service API.",
            Error::Storage(_) => "Could not save weather to history.",
            Error::UnsupportedLanguage(_) => "Unsupported language.",
            Error::UnsupportedHistoryFormat(_) => "Unsupported history format.",
        }
    }

    pub(crate) fn location(reason: impl std::fmt::Display) -> Self {
        Error::LocationUnavailable(reason.to_string())
    }

    pub(crate) fn weather_service(reason: impl std::fmt::Display) -> Self {
        Error::WeatherServiceUnavailable(reason.to_string())
    }

    pub(crate) fn storage(reason: impl std::fmt::Display) -> Self {
        Error::Storage(reason.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
