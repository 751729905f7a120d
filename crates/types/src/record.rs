//! Persisted world and tile-catalog records.
//!
//! A world record stores a flat, row-major array of tile definition ids where
//! `0` marks an empty cell. Definitions live in a shared tile catalog and carry
//! an optional sprite-sheet frame and a footprint in grid cells (default 1x1).
//!
//! ```
//! use tilescape_types::WorldRecord;
//!
//! let json = r#"{"id":"meadow","width":2,"height":2,"tileW":32,"tileH":32,"tiles":[0,7,0,0]}"#;
//! let world: WorldRecord = serde_json::from_str(json).unwrap();
//! assert_eq!(world.tile_at(1, 0), Some(7));
//! assert_eq!(world.tile_catalog, "tiles");
//! ```

use serde::{Deserialize, Serialize};

/// Tile definition id. `EMPTY_TILE` marks an empty cell.
pub type TileDefId = u32;

/// Marker for an empty cell in `WorldRecord::tiles`
pub const EMPTY_TILE: TileDefId = 0;

/// Sub-rectangle of a sprite sheet, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// One entry of a tile catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileDef {
    pub id: TileDefId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_size: Option<Size>,
    /// Footprint width in grid cells
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Footprint height in grid cells
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl TileDef {
    pub fn new(id: TileDefId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_footprint(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_frame(mut self, frame: FrameRect) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Footprint in grid cells, `(x_size, y_size)`, each at least 1.
    pub fn footprint(&self) -> (u32, u32) {
        (
            self.width.unwrap_or(1).max(1),
            self.height.unwrap_or(1).max(1),
        )
    }

    /// A definition is renderable when it points at a sprite-sheet frame.
    pub fn is_renderable(&self) -> bool {
        self.frame.is_some()
    }
}

/// Tile catalog as stored next to its sprite sheet (`<name>.json` + `<name>.png`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TileCatalog {
    pub tiles: Vec<TileDef>,
}

impl TileCatalog {
    pub fn new(tiles: Vec<TileDef>) -> Self {
        Self { tiles }
    }

    pub fn find(&self, id: TileDefId) -> Option<&TileDef> {
        self.tiles.iter().find(|t| t.id == id)
    }
}

fn default_tile_size() -> u32 {
    crate::DEFAULT_TILE_W
}

fn default_catalog() -> String {
    "tiles".to_string()
}

/// Persisted world layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldRecord {
    pub id: String,
    /// Width in grid cells
    pub width: u32,
    /// Height in grid cells
    pub height: u32,
    #[serde(default = "default_tile_size")]
    pub tile_w: u32,
    #[serde(default = "default_tile_size")]
    pub tile_h: u32,
    /// Row-major tile definition ids, `width * height` long
    pub tiles: Vec<TileDefId>,
    /// Name of the tile catalog the ids refer to
    #[serde(default = "default_catalog")]
    pub tile_catalog: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music: Option<String>,
}

impl WorldRecord {
    /// Create an empty world of `width x height` cells.
    pub fn empty(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            tile_w: crate::DEFAULT_TILE_W,
            tile_h: crate::DEFAULT_TILE_H,
            tiles: vec![EMPTY_TILE; (width as usize) * (height as usize)],
            tile_catalog: default_catalog(),
            background_image: None,
            music: None,
        }
    }

    pub fn with_tile_size(mut self, tile_w: u32, tile_h: u32) -> Self {
        self.tile_w = tile_w;
        self.tile_h = tile_h;
        self
    }

    #[inline]
    pub fn index(&self, gx: u32, gz: u32) -> Option<usize> {
        if gx >= self.width || gz >= self.height {
            return None;
        }
        Some((gz as usize) * (self.width as usize) + (gx as usize))
    }

    pub fn tile_at(&self, gx: u32, gz: u32) -> Option<TileDefId> {
        self.index(gx, gz).and_then(|i| self.tiles.get(i).copied())
    }

    /// Place a definition at a cell. Returns false if out of bounds.
    pub fn set_tile(&mut self, gx: u32, gz: u32, id: TileDefId) -> bool {
        match self.index(gx, gz) {
            Some(i) if i < self.tiles.len() => {
                self.tiles[i] = id;
                true
            }
            _ => false,
        }
    }

    /// World size in world units, saturating at `u32::MAX`.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.tile_w),
            self.height.saturating_mul(self.tile_h),
        )
    }
}
