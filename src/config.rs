use std::path::PathBuf;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::api::PLACEHOLDER_API_KEY;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub geocoder: GeocoderConfig,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// WorldTides credential. Falls back to a placeholder when neither the
    /// config file nor WORLDTIDES_API_KEY provides one.
    pub key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub max_results: u32,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org/search".to_string(),
            max_results: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding the three preference files. Empty means the
    /// platform data dir (e.g. ~/.local/share/tide-times).
    pub data_dir: String,
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> PathBuf {
        if self.data_dir.is_empty() {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tide-times")
        } else {
            PathBuf::from(&self.data_dir)
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present - production uses env vars directly)
        let _ = dotenvy::dotenv();

        // The credential is the one value commonly supplied via a bare env
        // var rather than the TIDETIMES__ prefix.
        let api_key =
            std::env::var("WORLDTIDES_API_KEY").unwrap_or_else(|_| PLACEHOLDER_API_KEY.to_string());

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tide-times");

        let builder = Config::builder()
            // 1. Load default values
            // Tide API
            .set_default("api.base_url", "https://www.worldtides.info/api/v3")?
            .set_default("api.key", api_key)?
            // Geocoder
            .set_default("geocoder.base_url", "https://nominatim.openstreetmap.org/search")?
            .set_default("geocoder.max_results", 5)?
            // Network
            .set_default("network.request_timeout_secs", 30)?
            .set_default("network.connect_timeout_secs", 10)?
            // Storage
            .set_default("storage.data_dir", "")?

            // 2. Load from local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))

            // 3. Load from user config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))

            // 4. Load from Environment variables (TIDETIMES__API__KEY=...)
            .add_source(Environment::with_prefix("TIDETIMES").separator("__"));

        let s = builder.build()?;
        Ok(s.try_deserialize()?)
    }
}
