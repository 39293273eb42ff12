//! # rsteleport
//!
//! An async Rust library that turns a map coordinate into a full
//! equirectangular Google Street View panorama.
//!
//! This library provides:
//! - Panorama lookup around a GPS coordinate (Street View metadata API)
//! - Concurrent download of the whole tile grid, tolerating missing tiles
//! - Detection of the real panorama height from black padding
//! - Stitching into one image, published to subscribers and sinks
//! - Export of the result (JPEG, PNG, WebP)
//!
//! ## Example
//!
//! ```no_run
//! use rsteleport::{ComposerConfig, Coordinate, FileSink, StreetViewComposer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ComposerConfig::from_env()?.zoom(4);
//!     let composer = StreetViewComposer::new(config)?.with_sink(FileSink::new("panorama.jpg"));
//!
//!     let composite = composer.compose(Coordinate::new(41.8982208, 12.4764804)).await?;
//!     println!("{}x{}", composite.width(), composite.height());
//!
//!     Ok(())
//! }
//! ```

mod error;
mod types;
mod config;
mod transport;
mod metadata;
mod download;
mod utils;
pub mod compose;
mod composer;
mod save;

pub use error::{Result, StreetViewError};
pub use types::{
    CompositeImage, Coordinate, GridSize, MetadataStatus, PanoramaMetadata, PipelineStage,
};
pub use config::{ComposerConfig, API_KEY_ENV};
pub use transport::Transport;
pub use metadata::resolve;
pub use download::{fetch_tiles, TileFetch, TileGrid};
pub use utils::{first_non_black_row, pixel_rgb};
pub use composer::{PanoramaSink, StreetViewComposer};
pub use save::{encode_panorama, save_panorama, FileSink, ImageFormat, SaveOptions};
