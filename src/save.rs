use crate::composer::PanoramaSink;
use crate::error::Result;
use crate::types::CompositeImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Image output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG format (missing tiles become black)
    Jpeg,
    /// PNG format (missing tiles stay transparent)
    Png,
    /// Lossless WebP
    WebP,
}

impl ImageFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }
}

/// Options for exporting a composite panorama.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Image format
    pub format: ImageFormat,
    /// JPEG quality (1-100, default 90)
    pub jpeg_quality: u8,
}

impl SaveOptions {
    /// Create default save options with JPEG format.
    pub fn new() -> Self {
        Self {
            format: ImageFormat::Jpeg,
            jpeg_quality: 90,
        }
    }

    /// Set the output format.
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Set JPEG quality (1-100).
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_into<W: Write + std::io::Seek>(img: &DynamicImage, writer: W, options: &SaveOptions) -> Result<()> {
    match options.format {
        ImageFormat::Jpeg => {
            let rgb_img = img.to_rgb8();
            let (width, height) = rgb_img.dimensions();
            let mut encoder = JpegEncoder::new_with_quality(writer, options.jpeg_quality);
            encoder.encode(rgb_img.as_raw(), width, height, ExtendedColorType::Rgb8)?;
        }
        ImageFormat::Png => {
            let rgba_img = img.to_rgba8();
            let (width, height) = rgba_img.dimensions();
            PngEncoder::new(writer).write_image(
                rgba_img.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )?;
        }
        ImageFormat::WebP => {
            let mut writer = writer;
            img.write_to(&mut writer, image::ImageFormat::WebP)?;
        }
    }
    Ok(())
}

/// Write a panorama to disk, creating parent directories as needed.
pub fn save_panorama(img: &DynamicImage, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    encode_into(img, &mut writer, options)?;
    writer.flush()?;
    Ok(())
}

/// Encode a panorama into memory.
pub fn encode_panorama(img: &DynamicImage, options: &SaveOptions) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    encode_into(img, &mut buffer, options)?;
    Ok(buffer.into_inner())
}

/// Writes every finished panorama to a fixed path.
///
/// Failures are logged and dropped.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    options: SaveOptions,
}

impl FileSink {
    /// Create a sink; the format is taken from the file extension, JPEG otherwise.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = ImageFormat::from_path(&path).unwrap_or(ImageFormat::Jpeg);
        Self {
            path,
            options: SaveOptions::new().format(format),
        }
    }

    pub fn with_options(mut self, options: SaveOptions) -> Self {
        self.options = options;
        self
    }
}

impl PanoramaSink for FileSink {
    fn apply(&self, composite: &CompositeImage) {
        match save_panorama(&composite.image, &self.path, &self.options) {
            Ok(()) => info!(
                path = %self.path.display(),
                pano_id = %composite.pano_id,
                width = composite.width(),
                height = composite.height(),
                "Saved panorama"
            ),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to save panorama"),
        }
    }
}
