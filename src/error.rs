use crate::types::MetadataStatus;
use thiserror::Error;

/// Result type alias for panorama composition.
pub type Result<T> = std::result::Result<T, StreetViewError>;

/// Errors that can occur while composing a Street View panorama.
#[derive(Error, Debug)]
pub enum StreetViewError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Transport returned something other than a usable response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Metadata resolved, but Google reported no usable panorama
    #[error("Street View metadata lookup returned {0}")]
    MetadataStatus(MetadataStatus),

    /// Metadata status was OK but carried no panorama id
    #[error("Street View metadata did not include a panorama id")]
    MissingPanoramaId,

    /// Tile (0, 0) could not be fetched, so the tile size is unknown
    #[error("Reference tile (0, 0) is missing")]
    MissingReferenceTile,

    /// A request URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Zoom level has no tile grid
    #[error("Unsupported zoom level {0}, expected one of 3, 4 or 5")]
    UnsupportedZoom(u8),

    /// Missing API key
    #[error("API key required. Set GOOGLE_MAPS_API_KEY or use ComposerConfig::api_key().")]
    MissingApiKey,

    /// Image processing error
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StreetViewError {
    /// Whether this failure means "no street view available nearby" rather
    /// than a broken request or transport.
    pub fn is_no_coverage(&self) -> bool {
        matches!(
            self,
            StreetViewError::MetadataStatus(MetadataStatus::ZeroResults | MetadataStatus::NotFound)
                | StreetViewError::MissingPanoramaId
                | StreetViewError::MissingReferenceTile
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_coverage_classification() {
        assert!(StreetViewError::MetadataStatus(MetadataStatus::ZeroResults).is_no_coverage());
        assert!(StreetViewError::MissingReferenceTile.is_no_coverage());
        assert!(!StreetViewError::MetadataStatus(MetadataStatus::RequestDenied).is_no_coverage());
        assert!(!StreetViewError::MissingApiKey.is_no_coverage());
    }

    #[test]
    fn test_status_in_message() {
        let err = StreetViewError::MetadataStatus(MetadataStatus::OverQueryLimit);
        assert_eq!(err.to_string(), "Street View metadata lookup returned OVER_QUERY_LIMIT");
    }
}
