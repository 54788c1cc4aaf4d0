//! Core library for the `ipweather` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - Coordinate lookup from an IP geolocation service
//! - The weather provider abstraction and its OpenWeather implementation
//! - Report formatting and history storage
//! - The pipeline tying those together
//!
//! It is used by `ipweather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod format;
mod http;
pub mod history;
pub mod location;
pub mod model;
pub mod pipeline;
pub mod provider;

pub use config::Config;
pub use error::{Error, Result};
pub use format::format_weather;
pub use history::{HistoryFormat, HistoryRecord, WeatherStorage};
pub use location::{IpInfoLocator, LocationSource};
pub use model::{Coordinates, Language, Weather, WeatherType};
pub use pipeline::{Pipeline, Report};
pub use provider::WeatherProvider;
