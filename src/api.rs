use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{ApiConfig, NetworkConfig};
use crate::location::Location;

/// Credential substituted when no real API key is configured. Requests
/// still go out; the provider rejects them with a non-2xx status.
pub const PLACEHOLDER_API_KEY: &str = "MISSING_API_KEY";

/// Half-width of the request window around "now".
const WINDOW_HOURS: i64 = 24;

/// Fetch-path failures, classified at the client boundary.
///
/// The session controller only ever sees these typed variants; nothing
/// opaque crosses the fetch boundary. Payloads are strings so snapshots
/// holding an error stay cheaply cloneable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TideError {
    /// The coordinate has no coastal tide coverage. Not transient, so
    /// callers should offer alternative locations instead of a retry.
    #[error("there is no tide data for this location")]
    NoTidalData,
    #[error("server error (code: {0})")]
    Server(u16),
    #[error("error processing tide data: {0}")]
    Decode(String),
    #[error("network error: {0}")]
    Transport(String),
}

impl TideError {
    /// Whether a retry of the same location is worth offering.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TideError::NoTidalData)
    }
}

/// Decoded tide API payload. `status` is carried for wire contract
/// completeness even though classification happens on the HTTP layer.
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct TideResponse {
    pub status: i64,
    pub extremes: Vec<RawExtreme>,
    pub heights: Vec<RawHeight>,
}

/// A predicted high or low water mark as it appears on the wire.
#[derive(Debug, Deserialize)]
pub struct RawExtreme {
    pub dt: i64,
    pub height: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// An instantaneous height sample; the first one is "now"-relative.
#[derive(Debug, Deserialize)]
pub struct RawHeight {
    pub dt: i64,
    pub height: f64,
}

/// Client for the tide prediction API.
#[derive(Clone, Debug)]
pub struct TideApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TideApiClient {
    /// Create a new API client with configurable timeouts.
    ///
    /// A missing credential is tolerated: the placeholder is substituted
    /// and a warning is the only observable effect at startup.
    pub fn new(api_config: &ApiConfig, network_config: &NetworkConfig) -> Result<Self> {
        if api_config.key == PLACEHOLDER_API_KEY {
            tracing::warn!(
                "no tide API key configured, set WORLDTIDES_API_KEY; requests will be rejected"
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network_config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: api_config.base_url.clone(),
            api_key: api_config.key.clone(),
        })
    }

    /// Fetch extremes and heights for a ±24 h window centered on `now`.
    ///
    /// Single GET, no retry, no caching. Failures come back classified:
    /// a 400, or any non-2xx whose body mentions "out of range" or
    /// "no tide data", means the coordinate is inland and maps to
    /// [`TideError::NoTidalData`]; other non-2xx statuses map to
    /// [`TideError::Server`]; undecodable 2xx bodies to [`TideError::Decode`].
    pub async fn fetch_window(
        &self,
        location: &Location,
        now: DateTime<Utc>,
    ) -> Result<TideResponse, TideError> {
        let start = now.timestamp() - WINDOW_HOURS * 3600;
        let end = now.timestamp() + WINDOW_HOURS * 3600;

        tracing::debug!(
            location = %location.name,
            start,
            end,
            "fetching tide window"
        );

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("extremes", String::new()),
                ("heights", String::new()),
                ("datum", "LAT".to_string()),
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("start", start.to_string()),
                ("end", end.to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| TideError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(code = status.as_u16(), body = %body, "tide API error response");

            if status.as_u16() == 400
                || body.contains("out of range")
                || body.contains("no tide data")
            {
                return Err(TideError::NoTidalData);
            }
            return Err(TideError::Server(status.as_u16()));
        }

        response
            .json::<TideResponse>()
            .await
            .map_err(|e| TideError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_configs() -> (ApiConfig, NetworkConfig) {
        (
            ApiConfig {
                base_url: "https://example.com/api/v3".to_string(),
                key: "test-key".to_string(),
            },
            NetworkConfig {
                request_timeout_secs: 30,
                connect_timeout_secs: 10,
            },
        )
    }

    #[test]
    fn test_client_creation() {
        let (api, network) = make_configs();
        assert!(TideApiClient::new(&api, &network).is_ok());
    }

    #[test]
    fn test_client_tolerates_placeholder_key() {
        let (mut api, network) = make_configs();
        api.key = PLACEHOLDER_API_KEY.to_string();
        // Only observable effect is a warning; construction must succeed.
        assert!(TideApiClient::new(&api, &network).is_ok());
    }

    #[test]
    fn test_no_tidal_data_is_not_retryable() {
        assert!(!TideError::NoTidalData.is_retryable());
    }

    #[test]
    fn test_other_errors_are_retryable() {
        assert!(TideError::Server(500).is_retryable());
        assert!(TideError::Decode("missing field".to_string()).is_retryable());
        assert!(TideError::Transport("dns failure".to_string()).is_retryable());
    }

    #[test]
    fn test_response_decoding() {
        let body = r#"{
            "status": 200,
            "extremes": [
                {"dt": 1700000000, "height": 1.82, "type": "High"},
                {"dt": 1700022000, "height": -0.12, "type": "Low"}
            ],
            "heights": [
                {"dt": 1699999800, "height": 1.63}
            ]
        }"#;

        let decoded: TideResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.status, 200);
        assert_eq!(decoded.extremes.len(), 2);
        assert_eq!(decoded.extremes[0].kind, "High");
        assert_eq!(decoded.heights[0].dt, 1_699_999_800);
    }

    #[test]
    fn test_response_decoding_requires_arrays() {
        // Both arrays are part of the wire contract; a payload without
        // them is a decode failure, not an empty series.
        let body = r#"{"status": 200}"#;
        assert!(serde_json::from_str::<TideResponse>(body).is_err());
    }

    #[test]
    fn test_error_display_messages() {
        assert_eq!(
            TideError::Server(503).to_string(),
            "server error (code: 503)"
        );
        assert_eq!(
            TideError::NoTidalData.to_string(),
            "there is no tide data for this location"
        );
    }
}
