use crate::error::{Result, StreetViewError};
use crate::types::GridSize;
use std::env;

const METADATA_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/streetview";
const TILE_ENDPOINT: &str = "https://streetviewpixels-pa.googleapis.com/v1/tile";
const TILE_CLIENT: &str = "maps_sv.tactile";
const DEFAULT_ZOOM: u8 = 4;
const DEFAULT_RADIUS: u32 = 2000;
const DEFAULT_SOURCE: &str = "outdoor";

/// Environment variable holding the Google Maps API key.
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Settings for resolving and composing panoramas.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Google Maps API key, sent to the metadata endpoint
    pub api_key: Option<String>,
    /// Tile zoom level (3, 4 or 5; default 4)
    pub zoom: u8,
    /// Metadata search radius in meters (default 2000)
    pub radius: u32,
    /// Metadata source filter (default "outdoor")
    pub source: String,
    /// Base URL of the metadata API; `/metadata` is appended
    pub metadata_endpoint: String,
    /// Tile endpoint URL
    pub tile_endpoint: String,
    /// `cb_client` value sent with every tile request
    pub tile_client: String,
}

impl ComposerConfig {
    /// Create default settings without an API key.
    pub fn new() -> Self {
        Self {
            api_key: None,
            zoom: DEFAULT_ZOOM,
            radius: DEFAULT_RADIUS,
            source: DEFAULT_SOURCE.to_string(),
            metadata_endpoint: METADATA_ENDPOINT.to_string(),
            tile_endpoint: TILE_ENDPOINT.to_string(),
            tile_client: TILE_CLIENT.to_string(),
        }
    }

    /// Default settings with the API key read from `GOOGLE_MAPS_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = env::var(API_KEY_ENV).map_err(|_| StreetViewError::MissingApiKey)?;
        Ok(Self::new().api_key(key))
    }

    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the zoom level. Checked against the tile grid table by `validate()`.
    pub fn zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    /// Set the metadata search radius in meters.
    pub fn radius(mut self, radius: u32) -> Self {
        self.radius = radius.max(1);
        self
    }

    /// Set the metadata source filter.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Point the metadata lookups at another base URL.
    pub fn metadata_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.metadata_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Point the tile downloads at another URL.
    pub fn tile_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.tile_endpoint = endpoint.into();
        self
    }

    /// Tile grid for the configured zoom.
    pub fn grid_size(&self) -> Result<GridSize> {
        GridSize::for_zoom(self.zoom)
    }

    /// Check that the settings can drive a composition.
    pub fn validate(&self) -> Result<()> {
        self.grid_size()?;
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err(StreetViewError::MissingApiKey),
        }
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ComposerConfig::default();
        assert_eq!(config.zoom, 4);
        assert_eq!(config.radius, 2000);
        assert_eq!(config.source, "outdoor");
        assert_eq!(config.grid_size().unwrap(), GridSize { columns: 16, rows: 8 });
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            ComposerConfig::new().validate(),
            Err(StreetViewError::MissingApiKey)
        ));
        assert!(matches!(
            ComposerConfig::new().api_key("k").zoom(9).validate(),
            Err(StreetViewError::UnsupportedZoom(9))
        ));
        assert!(ComposerConfig::new().api_key("k").zoom(5).validate().is_ok());
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let config = ComposerConfig::new().metadata_endpoint("http://localhost:9000/sv/");
        assert_eq!(config.metadata_endpoint, "http://localhost:9000/sv");
    }
}
