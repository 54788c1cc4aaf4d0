//! Coordinate lookup through an IP geolocation service.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::{
    Config,
    error::{Error, Result},
    http::{build_client, truncate_body},
    model::Coordinates,
};

#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    async fn resolve(&self) -> Result<Coordinates>;
}

/// Resolves the caller's coordinates from an ipinfo.io style endpoint.
#[derive(Debug, Clone)]
pub struct IpInfoLocator {
    http: Client,
    url: String,
    round: bool,
}

impl IpInfoLocator {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        accept_invalid_certs: bool,
        round: bool,
    ) -> Result<Self> {
        let http = build_client(timeout, accept_invalid_certs).map_err(Error::location)?;
        Ok(Self {
            http,
            url: url.into(),
            round,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.geolocation_url.clone(),
            config.location_timeout(),
            config.accept_invalid_certs,
            config.round_coordinates,
        )
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        tracing::debug!(url = %self.url, "requesting location");

        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::location(format!("request to {} failed: {e}", self.url)))?;

        let status = res.status();
        let body = res
            .bytes()
            .await
            .map_err(|e| Error::location(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(Error::location(format!(
                "request failed with status {}: {}",
                status,
                truncate_body(&String::from_utf8_lossy(&body)),
            )));
        }

        Ok(body.to_vec())
    }
}

#[async_trait]
impl LocationSource for IpInfoLocator {
    async fn resolve(&self) -> Result<Coordinates> {
        let body = self.fetch().await?;
        let coordinates = parse_ipinfo_response(&body)?;

        let coordinates = if self.round {
            coordinates.rounded()
        } else {
            coordinates
        };

        tracing::info!(
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            "location resolved"
        );
        Ok(coordinates)
    }
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    loc: String,
}

/// Parse a geolocation response body carrying `"loc": "<lat>,<lon>"`.
pub fn parse_ipinfo_response(body: &[u8]) -> Result<Coordinates> {
    let parsed: IpInfoResponse = serde_json::from_slice(body)
        .map_err(|e| Error::location(format!("unexpected geolocation response: {e}")))?;

    parse_loc(&parsed.loc)
}

fn parse_loc(loc: &str) -> Result<Coordinates> {
    let mut parts = loc.split(',');

    let (Some(latitude), Some(longitude), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::location(format!("malformed loc field '{loc}'")));
    };

    Ok(Coordinates::new(parse_component(latitude)?, parse_component(longitude)?))
}

fn parse_component(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::location(format!("'{value}' is not a decimal coordinate")))
}
