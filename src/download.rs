use crate::config::ComposerConfig;
use crate::error::{Result, StreetViewError};
use crate::transport::Transport;
use crate::types::{GridSize, Tile, TileInfo};
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use reqwest::Url;
use tracing::{debug, instrument, warn};

const TILE_NBT: &str = "1";

/// Decoded tiles of one panorama, indexed by `(x, y)`.
///
/// Always holds `columns * rows` cells; a cell is `None` when that tile
/// could not be fetched.
#[derive(Debug)]
pub struct TileGrid {
    size: GridSize,
    cells: Vec<Option<DynamicImage>>,
}

impl TileGrid {
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: (0..size.tile_count()).map(|_| None).collect(),
        }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.size.columns && y < self.size.rows).then(|| (x * self.size.rows + y) as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&DynamicImage> {
        self.index(x, y).and_then(|i| self.cells[i].as_ref())
    }

    /// Store a tile. Positions outside the grid are ignored.
    pub fn insert(&mut self, x: u32, y: u32, image: DynamicImage) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = Some(image);
        }
    }

    /// Cells of column `x`, top row first.
    pub fn column(&self, x: u32) -> Vec<Option<&DynamicImage>> {
        (0..self.size.rows).map(|y| self.get(x, y)).collect()
    }

    /// Present tiles with their positions, in no particular order.
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32, &DynamicImage)> + '_ {
        let rows = self.size.rows;
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            let i = i as u32;
            cell.as_ref().map(|image| (i / rows, i % rows, image))
        })
    }

    pub fn present_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }
}

/// Result of downloading a full tile grid.
#[derive(Debug)]
pub struct TileFetch {
    pub grid: TileGrid,
    /// Number of tiles that could not be downloaded or decoded
    pub failed: usize,
}

impl TileFetch {
    pub fn any_failed(&self) -> bool {
        self.failed > 0
    }
}

/// Base tile URL shared by every tile of a panorama.
fn make_base_url(config: &ComposerConfig, pano_id: &str) -> Result<Url> {
    let zoom = config.zoom.to_string();
    Url::parse_with_params(
        &config.tile_endpoint,
        &[
            ("cb_client", config.tile_client.as_str()),
            ("nbt", TILE_NBT),
            ("panoid", pano_id),
            ("zoom", zoom.as_str()),
        ],
    )
    .map_err(|e| StreetViewError::InvalidUrl(format!("{}: {e}", config.tile_endpoint)))
}

/// Build the download URL for a single tile.
fn make_download_url(base: &Url, x: u32, y: u32) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("x", &x.to_string())
        .append_pair("y", &y.to_string());
    url
}

/// Generate all tile info for a panorama.
fn iter_tile_info(config: &ComposerConfig, pano_id: &str) -> Result<Vec<TileInfo>> {
    let size = config.grid_size()?;
    let base = make_base_url(config, pano_id)?;
    let mut tiles = Vec::with_capacity(size.tile_count());

    for y in 0..size.rows {
        for x in 0..size.columns {
            tiles.push(TileInfo {
                x,
                y,
                url: make_download_url(&base, x, y),
            });
        }
    }

    Ok(tiles)
}

/// Download and decode a single tile. No retries.
async fn fetch_tile(transport: &dyn Transport, tile_info: TileInfo) -> Tile {
    let image = match transport.fetch(&tile_info.url).await {
        Ok(bytes) => match image::load_from_memory(&bytes) {
            Ok(img) => Some(img),
            Err(e) => {
                debug!(x = tile_info.x, y = tile_info.y, error = %e, "Tile is not a decodable image");
                None
            }
        },
        Err(e) => {
            debug!(x = tile_info.x, y = tile_info.y, error = %e, "Tile download failed");
            None
        }
    };

    Tile {
        x: tile_info.x,
        y: tile_info.y,
        image,
    }
}

/// Download every tile of a panorama concurrently.
///
/// All requests are in flight at once and the call returns only after each
/// one finished. Failed tiles are left empty in the grid and counted; only a
/// bad zoom level or tile endpoint fails the whole call.
#[instrument(skip(transport, config))]
pub async fn fetch_tiles(
    transport: &dyn Transport,
    config: &ComposerConfig,
    pano_id: &str,
) -> Result<TileFetch> {
    let tile_infos = iter_tile_info(config, pano_id)?;
    let mut grid = TileGrid::new(config.grid_size()?);
    let in_flight = tile_infos.len().max(1);

    let tiles: Vec<Tile> = stream::iter(tile_infos)
        .map(|tile_info| fetch_tile(transport, tile_info))
        .buffer_unordered(in_flight)
        .collect()
        .await;

    let mut failed = 0;
    for tile in tiles {
        match tile.image {
            Some(image) => grid.insert(tile.x, tile.y, image),
            None => failed += 1,
        }
    }

    if failed > 0 {
        warn!(failed, fetched = grid.present_count(), "Some tiles could not be downloaded");
    } else {
        debug!(fetched = grid.present_count(), "All tiles downloaded");
    }

    Ok(TileFetch { grid, failed })
}
