use crate::error::{Result, StreetViewError};
use chrono::NaiveDate;
use image::DynamicImage;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// GPS location with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude coordinate
    pub lat: f64,
    /// Longitude coordinate
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Status code reported by the Street View metadata endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataStatus {
    Ok,
    ZeroResults,
    NotFound,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
    /// The response body could not be decoded, or had no status.
    DataError,
}

impl MetadataStatus {
    /// Map a wire status string. Unrecognised values become `UnknownError`.
    pub fn from_wire(status: &str) -> Self {
        match status {
            "OK" => MetadataStatus::Ok,
            "ZERO_RESULTS" => MetadataStatus::ZeroResults,
            "NOT_FOUND" => MetadataStatus::NotFound,
            "OVER_QUERY_LIMIT" => MetadataStatus::OverQueryLimit,
            "REQUEST_DENIED" => MetadataStatus::RequestDenied,
            "INVALID_REQUEST" => MetadataStatus::InvalidRequest,
            _ => MetadataStatus::UnknownError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataStatus::Ok => "OK",
            MetadataStatus::ZeroResults => "ZERO_RESULTS",
            MetadataStatus::NotFound => "NOT_FOUND",
            MetadataStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            MetadataStatus::RequestDenied => "REQUEST_DENIED",
            MetadataStatus::InvalidRequest => "INVALID_REQUEST",
            MetadataStatus::UnknownError => "UNKNOWN_ERROR",
            MetadataStatus::DataError => "DATA_ERROR",
        }
    }
}

impl fmt::Display for MetadataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a metadata lookup around a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanoramaMetadata {
    /// Lookup status
    pub status: MetadataStatus,
    /// Panorama ID (optional)
    pub pano_id: Option<String>,
    /// Capture month, stored as the first day of that month (optional)
    pub date: Option<NaiveDate>,
    /// Location of the panorama itself (optional)
    pub location: Option<Coordinate>,
}

impl PanoramaMetadata {
    /// Metadata for a response that could not be decoded.
    pub fn data_error() -> Self {
        Self {
            status: MetadataStatus::DataError,
            pano_id: None,
            date: None,
            location: None,
        }
    }

    /// The panorama id, if this lookup allows composition to proceed.
    pub fn panorama_id(&self) -> Result<&str> {
        if self.status != MetadataStatus::Ok {
            return Err(StreetViewError::MetadataStatus(self.status));
        }
        match self.pano_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(StreetViewError::MissingPanoramaId),
        }
    }
}

/// Number of tile columns and rows at a zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub columns: u32,
    pub rows: u32,
}

/// Zoom level to tile grid.
const GRID_SIZES: &[(u8, GridSize)] = &[
    (3, GridSize { columns: 8, rows: 4 }),
    (4, GridSize { columns: 16, rows: 8 }),
    (5, GridSize { columns: 32, rows: 16 }),
];

impl GridSize {
    pub fn for_zoom(zoom: u8) -> Result<Self> {
        GRID_SIZES
            .iter()
            .find(|(z, _)| *z == zoom)
            .map(|(_, size)| *size)
            .ok_or(StreetViewError::UnsupportedZoom(zoom))
    }

    pub fn tile_count(&self) -> usize {
        (self.columns * self.rows) as usize
    }
}

/// Internal: Information about a single tile to download.
#[derive(Debug, Clone)]
pub(crate) struct TileInfo {
    pub x: u32,
    pub y: u32,
    pub url: Url,
}

/// Internal: A tile download outcome. `image` is `None` when it failed.
#[derive(Debug)]
pub(crate) struct Tile {
    pub x: u32,
    pub y: u32,
    pub image: Option<DynamicImage>,
}

/// A finished equirectangular panorama.
#[derive(Debug, Clone)]
pub struct CompositeImage {
    /// Panorama the tiles came from
    pub pano_id: String,
    /// Composited RGBA image
    pub image: DynamicImage,
    /// Width and height of the reference tile
    pub tile_size: (u32, u32),
    /// Height found by scanning for black padding, when some tiles failed
    pub valid_height: Option<u32>,
}

impl CompositeImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Where a composition run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStage {
    #[default]
    Idle,
    Resolving,
    Fetching,
    Detecting,
    Compositing,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}
