use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{history::HistoryFormat, model::Language};

pub const DEFAULT_GEOLOCATION_URL: &str = "https://ipinfo.io/json";
pub const DEFAULT_WEATHER_URL_TEMPLATE: &str = "https://api.openweathermap.org/data/2.5/weather\
     ?lat={latitude}&lon={longitude}&appid={api_key}&lang={lang}&units=metric";
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Top-level configuration stored on disk.
///
/// Every field has a default, so a partial (or missing) config file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Language tag for labels and the report template, "en" or "ua".
    pub language: String,

    /// Quantize coordinates to one decimal place before asking for weather.
    pub round_coordinates: bool,

    pub geolocation_url: String,

    /// Supports `{latitude}`, `{longitude}`, `{api_key}` and `{lang}` placeholders.
    pub weather_url_template: String,

    /// OpenWeather API key; `OPENWEATHER_API_KEY` takes precedence.
    pub api_key: Option<String>,

    /// Key taken from `OPENWEATHER_API_KEY` by [`Config::load`]. Never written to disk.
    #[serde(skip)]
    pub env_api_key: Option<String>,

    /// Relative paths are resolved against the current directory.
    pub history_path: PathBuf,

    /// "plain" or "json"; inferred from the `history_path` extension when absent.
    pub history_format: Option<String>,

    /// Accept self-signed or otherwise untrusted certificates on both HTTP calls.
    pub accept_invalid_certs: bool,

    pub location_timeout_secs: u64,
    pub weather_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::En.as_str().to_string(),
            round_coordinates: true,
            geolocation_url: DEFAULT_GEOLOCATION_URL.to_string(),
            weather_url_template: DEFAULT_WEATHER_URL_TEMPLATE.to_string(),
            api_key: None,
            env_api_key: None,
            history_path: PathBuf::from("history.json"),
            history_format: None,
            accept_invalid_certs: false,
            location_timeout_secs: DEFAULT_TIMEOUT_SECS,
            weather_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "ipweather", "ipweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    fn apply_env(&mut self) {
        if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()) {
            self.env_api_key = Some(key);
        }
    }

    pub fn language(&self) -> Result<Language, crate::Error> {
        Language::try_from(self.language.as_str())
    }

    /// Explicit format if set, otherwise inferred from the history file extension.
    pub fn history_format(&self) -> Result<HistoryFormat, crate::Error> {
        match &self.history_format {
            Some(name) => HistoryFormat::try_from(name.as_str()),
            None => Ok(HistoryFormat::from_path(&self.history_path)),
        }
    }

    pub fn api_key(&self) -> &str {
        self.env_api_key
            .as_deref()
            .or(self.api_key.as_deref())
            .unwrap_or_default()
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs)
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_secs)
    }
}
