//! Free-text location search against a Nominatim-style endpoint.
//!
//! This is a collaborator of the tide pipeline, not part of it: its
//! failures surface on the independent [`SearchError`] channel and never
//! touch tide session state.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{GeocoderConfig, NetworkConfig};
use crate::location::Location;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SearchError {
    #[error("search failed: {0}")]
    Transport(String),
    #[error("search service error (code: {0})")]
    Server(u16),
    #[error("could not read search results: {0}")]
    Decode(String),
}

/// One candidate as returned by the provider. Coordinates arrive as
/// strings on this wire format.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Clone, Debug)]
pub struct GeocoderClient {
    client: reqwest::Client,
    base_url: String,
    max_results: u32,
}

impl GeocoderClient {
    pub fn new(geocoder_config: &GeocoderConfig, network_config: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tide-times/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(network_config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
            .build()
            .context("Failed to create geocoder HTTP client")?;

        Ok(Self {
            client,
            base_url: geocoder_config.base_url.clone(),
            max_results: geocoder_config.max_results,
        })
    }

    /// Resolve a free-text query to location candidates.
    ///
    /// Each candidate's `id` is synthesized from its coordinates and is
    /// the identity key everywhere downstream. An empty query returns no
    /// candidates without touching the network. Hits whose coordinates do
    /// not parse are skipped.
    pub async fn search(&self, query: &str) -> Result<Vec<Location>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(query, "searching locations");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query.to_string()),
                ("format", "jsonv2".to_string()),
                ("limit", self.max_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Server(status.as_u16()));
        }

        let hits = response
            .json::<Vec<SearchHit>>()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        let locations = hits
            .into_iter()
            .filter_map(|hit| {
                let latitude: f64 = hit.lat.parse().ok()?;
                let longitude: f64 = hit.lon.parse().ok()?;
                Some(Location::from_coordinates(
                    hit.display_name,
                    latitude,
                    longitude,
                ))
            })
            .collect();

        Ok(locations)
    }
}
