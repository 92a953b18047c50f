use fixedbitset::FixedBitSet;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::game::collision::Hitbox;
use crate::game::error::DataError;
use crate::game::geometry::GeometryIndex;
use crate::game::math::Point;
use crate::game::pathfinding::{Door, DoorGraph};

/// Bumped whenever the cached layout changes.
pub const MAP_CACHE_VERSION: u32 = 1;

/// Rasterization settings, see `NavigationConfig`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub hitbox: Hitbox,
    pub padding: f64,
    pub height_margin: f64,
}

/// One preprocessed map: exact geometry, conservative blocked-pixel grid,
/// and the doors leading off it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NavMap {
    pub name: String,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub x_size: usize,
    pub y_size: usize,
    pub blocked: FixedBitSet,
    pub geometry: GeometryIndex,
    pub doors: Vec<Door>,
}

impl NavMap {
    /// Build the walkability grid for `geometry`.
    ///
    /// # Algorithm
    /// Every wall is fattened by the grid hitbox plus `padding` and the
    /// resulting box is filled. x-lines grow by `h` sideways, `vn` above the
    /// top of the extent and `v` below its bottom; y-lines grow by `h` past
    /// both ends of the extent and by `vn`/`v` across the line.
    ///
    /// Cells are map-relative pixels: index = `x_size * row + col`. Box
    /// cells falling outside the grid are dropped, padding is allowed to
    /// overshoot the map edges.
    pub fn rasterize(name: impl Into<String>, geometry: GeometryIndex, settings: &GridSettings) -> Self {
        let min_x = geometry.min_x;
        let min_y = geometry.min_y;
        let x_size = (geometry.max_x - min_x).max(0.0).ceil() as usize + 1;
        let y_size = (geometry.max_y - min_y + settings.height_margin).max(0.0).ceil() as usize + 1;

        let mut map = Self {
            name: name.into(),
            min_x,
            min_y,
            max_x: geometry.max_x,
            max_y: geometry.max_y,
            x_size,
            y_size,
            blocked: FixedBitSet::with_capacity(x_size * y_size),
            geometry,
            doors: Vec::new(),
        };

        let hb = settings.hitbox;
        let pad = settings.padding;
        let mut boxes = Vec::with_capacity(map.geometry.x_lines.len() + map.geometry.y_lines.len());

        for line in &map.geometry.x_lines {
            let (top, bottom) = line.extent();
            boxes.push((
                line.at - hb.h - pad,
                top - hb.vn - pad,
                line.at + hb.h + pad,
                bottom + hb.v + pad,
            ));
        }
        for line in &map.geometry.y_lines {
            let (left, right) = line.extent();
            boxes.push((
                left - hb.h - pad,
                line.at - hb.vn - pad,
                right + hb.h + pad,
                line.at + hb.v + pad,
            ));
        }

        for (x1, y1, x2, y2) in boxes {
            map.fill_box(x1, y1, x2, y2);
        }
        map
    }

    fn fill_box(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let col_lo = (x1 - self.min_x).floor().max(0.0) as usize;
        let row_lo = (y1 - self.min_y).floor().max(0.0) as usize;
        let col_hi = (x2 - self.min_x).ceil();
        let row_hi = (y2 - self.min_y).ceil();
        if col_hi < 0.0 || row_hi < 0.0 {
            return;
        }
        let col_hi = (col_hi as usize).min(self.x_size - 1);
        let row_hi = (row_hi as usize).min(self.y_size - 1);
        if col_lo > col_hi || row_lo > row_hi {
            return;
        }
        for row in row_lo..=row_hi {
            let start = row * self.x_size;
            self.blocked.insert_range(start + col_lo..start + col_hi + 1);
        }
    }

    /// Grid cell holding world position `(x, y)`, or `None` off-grid.
    pub fn index_of(&self, x: f64, y: f64) -> Option<usize> {
        let col = (x - self.min_x).floor();
        let row = (y - self.min_y).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.x_size || row >= self.y_size {
            return None;
        }
        Some(row * self.x_size + col)
    }

    /// Off-grid positions count as blocked.
    pub fn is_blocked(&self, x: f64, y: f64) -> bool {
        self.index_of(x, y).map_or(true, |i| self.blocked.contains(i))
    }

    pub fn is_blocked_at(&self, p: Point) -> bool {
        self.is_blocked(p.x, p.y)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.geometry.contains(x, y)
    }

    pub fn transporter(&self) -> Option<&Door> {
        self.doors.iter().find(|d| d.is_transporter)
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.count_ones(..)
    }
}

// ============================================================================
// Map cache
// ============================================================================

/// Everything preprocessing produces, in the form stored on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapCache {
    pub version: u32,
    /// `GameData::version` the maps were built from
    pub data_version: Option<u64>,
    pub hitbox: Hitbox,
    pub grid: GridSettings,
    pub maps: BTreeMap<String, NavMap>,
    pub graph: DoorGraph,
}

impl MapCache {
    /// Whether this cache was built from the same inputs.
    pub fn matches(&self, data_version: Option<u64>, hitbox: &Hitbox, grid: &GridSettings) -> bool {
        self.version == MAP_CACHE_VERSION
            && self.data_version == data_version
            && self.hitbox == *hitbox
            && self.grid == *grid
    }
}

pub fn save_cache(path: impl AsRef<Path>, cache: &MapCache) -> Result<(), DataError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| DataError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }
    let file = File::create(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let writer = BufWriter::new(file);
    let mut encoder = ZlibEncoder::new(writer, Compression::default());
    bincode::serialize_into(&mut encoder, cache).map_err(|e| DataError::Cache(e.to_string()))?;
    encoder.finish().map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

pub fn load_cache(path: impl AsRef<Path>) -> Result<MapCache, DataError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut decoder = ZlibDecoder::new(reader);
    let cache: MapCache = bincode::deserialize_from(&mut decoder).map_err(|e| DataError::Cache(e.to_string()))?;
    Ok(cache)
}
