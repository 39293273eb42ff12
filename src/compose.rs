use crate::download::TileGrid;
use crate::error::{Result, StreetViewError};
use crate::types::GridSize;
use crate::utils::first_non_black_row;
use image::{imageops, DynamicImage, GenericImageView, RgbaImage};
use tracing::debug;

/// Find the real pixel height of a panorama from its first tile column.
///
/// Panoramas are often shorter than the nominal grid; the rows below the
/// picture come back missing or solid black. Rows are scanned bottom-up and
/// the first tile with a non-black leftmost pixel decides the height:
/// `row * tile_height + local_row`. Returns `None` when nothing is found.
pub fn detect_valid_height(column: &[Option<&DynamicImage>], tile_height: u32) -> Option<u32> {
    column
        .iter()
        .enumerate()
        .rev()
        .find_map(|(row, tile)| {
            let local = first_non_black_row(tile.as_ref()?)?;
            Some(row as u32 * tile_height + local)
        })
        .filter(|&height| height > 0)
}

/// Canvas size for a composite.
///
/// Without a detected height the full grid is used. With one, the height is
/// truncated and the width follows at 2:1.
pub fn canvas_size(tile_size: (u32, u32), grid: GridSize, valid_height: Option<u32>) -> (u32, u32) {
    let (tile_width, tile_height) = tile_size;
    match valid_height {
        Some(height) => (2 * height, height),
        None => (tile_width * grid.columns, tile_height * grid.rows),
    }
}

/// Size of the reference tile at (0, 0).
pub fn reference_tile_size(grid: &TileGrid) -> Result<(u32, u32)> {
    grid.get(0, 0)
        .map(|tile| tile.dimensions())
        .ok_or(StreetViewError::MissingReferenceTile)
}

/// Paste every fetched tile into one equirectangular image.
///
/// Tiles land at `(x * tile_width, y * tile_height)` and are clipped to the
/// canvas; missing tiles leave transparent holes.
pub fn compose(grid: &TileGrid, valid_height: Option<u32>) -> Result<DynamicImage> {
    let (tile_width, tile_height) = reference_tile_size(grid)?;
    let (width, height) = canvas_size((tile_width, tile_height), grid.size(), valid_height);
    let mut canvas = RgbaImage::new(width, height);

    for (x, y, tile) in grid.tiles() {
        let x_offset = i64::from(x) * i64::from(tile_width);
        let y_offset = i64::from(y) * i64::from(tile_height);
        imageops::replace(&mut canvas, tile, x_offset, y_offset);
    }

    debug!(width, height, tiles = grid.present_count(), "Composited panorama");
    Ok(DynamicImage::ImageRgba8(canvas))
}
