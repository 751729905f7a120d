//! Tile world.
//!
//! A [`TileWorld`] is built from a [`WorldRecord`] (flat row-major array of tile
//! definition ids) and a [`TileCatalog`]. `generate` rebuilds everything:
//! tile objects, occupancy blocking, the pathfinding grid and the render objects.
//! It is O(width * height) and meant for load time and structural edits only.
//!
//! # Blocking
//!
//! A tile whose definition has a footprint of `xs x ys` cells is the *origin*
//! of that footprint and sits at its bottom-right corner. It blocks every
//! in-bounds cell of rows `gz - ys + 1 ..= gz` and columns `gx - xs + 1 ..= gx`.
//! Tiles are scanned in index order and later origins overwrite earlier ones on
//! overlapping cells.
//!
//! ```text
//! footprint 2x2 at (2,2):
//!
//!   . . . .
//!   . X X .
//!   . X O .      O = origin, X = blocked by O
//!   . . . .
//! ```

use std::sync::Arc;

use log::{debug, info, warn};
use tilescape_types::{
    Color, Rect, TileCatalog, TileDef, TileDefId, WorldRecord, EMPTY_TILE, BACKGROUND_ORDER,
    HIGHLIGHT_PULSE_MS, TILE_RENDER_ORDER,
};

use crate::assets::{AssetCache, AudioHandle, Image, TileSheet};
use crate::camera::Camera;
use crate::entity::Position;
use crate::error::{StoreError, WorldError};
use crate::pathfinding::{find_path, PathGrid};
use crate::rng::SimpleRng;
use crate::store::WorldStore;
use crate::surface::Surface;
use crate::tween::yoyo;
use tilescape_types::InputState;

/// One cell of the world grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Row-major index
    pub index: usize,
    pub gx: u32,
    pub gz: u32,
    pub x: f32,
    pub z: f32,
    pub w: f32,
    pub h: f32,
    pub def_id: TileDefId,
    /// Catalog entry for `def_id`, if any
    pub details: Option<TileDef>,
    /// Index of the occupant origin covering this cell
    pub blocked_by: Option<usize>,
    pub selected: bool,
}

impl Tile {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.z, self.w, self.h)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.z + self.h / 2.0)
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_by.is_some()
    }
}

/// Image blit owned by the world (background or tile sprite).
#[derive(Debug, Clone)]
pub struct RenderObject {
    /// Tile this object was generated for; `None` for the background
    pub tile: Option<usize>,
    pub order: i32,
    pub image: Arc<Image>,
    pub src: Rect,
    pub dst: Rect,
}

/// Look and behavior switches of a world.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldOptions {
    pub save_last_opened: bool,
    pub draw_grid: bool,
    pub play_music: bool,
    pub volume: f32,
    pub grid_line_color: Color,
    pub selected_tile_color: Color,
    pub blocked_tile_color: Color,
    pub hover_tile_color: Color,
    pub highlight_color: Color,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self {
            save_last_opened: true,
            draw_grid: true,
            play_music: true,
            volume: 0.7,
            grid_line_color: Color::GREY,
            selected_tile_color: Color::RED,
            blocked_tile_color: Color::YELLOW.with_alpha(153),
            hover_tile_color: Color::GREEN,
            highlight_color: Color::GREEN,
        }
    }
}

/// Pointer interaction state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldState {
    pub selected_tile: Option<usize>,
    pub hover_tile: Option<usize>,
    /// Definition of the occupant covering the selected tile
    pub selected_object: Option<TileDef>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Highlight {
    tile: usize,
    since_ms: f64,
}

#[derive(Debug, Clone)]
pub struct TileWorld {
    record: WorldRecord,
    catalog: TileCatalog,
    sheet: Option<Arc<Image>>,
    background: Option<Arc<Image>>,
    music: Option<AudioHandle>,
    tiles: Vec<Tile>,
    grid: PathGrid,
    render_objects: Vec<RenderObject>,
    state: WorldState,
    highlight: Option<Highlight>,
    options: WorldOptions,
}

impl TileWorld {
    /// Build and generate a world without a sprite sheet.
    pub fn new(record: WorldRecord, catalog: TileCatalog) -> Result<Self, WorldError> {
        let expected = (record.width as usize) * (record.height as usize);
        if record.tiles.len() != expected {
            return Err(WorldError::TileCount {
                id: record.id.clone(),
                expected,
                actual: record.tiles.len(),
            });
        }

        let grid = PathGrid::new(record.width, record.height);
        let mut world = Self {
            record,
            catalog,
            sheet: None,
            background: None,
            music: None,
            tiles: Vec::new(),
            grid,
            render_objects: Vec::new(),
            state: WorldState::default(),
            highlight: None,
            options: WorldOptions::default(),
        };
        world.generate();
        Ok(world)
    }

    /// Build and generate a world drawing its tiles from `sheet`.
    pub fn with_sheet(record: WorldRecord, sheet: &TileSheet) -> Result<Self, WorldError> {
        let mut world = Self::new(record, sheet.catalog.clone())?;
        world.sheet = Some(sheet.image.clone());
        world.generate();
        Ok(world)
    }

    /// Load the tile sheet, background and music of `record`, then generate.
    ///
    /// The sheet and the background are fetched concurrently. A missing music
    /// track is logged and ignored.
    pub async fn load(
        record: WorldRecord,
        assets: &AssetCache,
        options: WorldOptions,
    ) -> Result<Self, WorldError> {
        let background = async {
            match &record.background_image {
                Some(key) => assets.load_image(key).await.map(Some),
                None => Ok(None),
            }
        };
        let (sheet, background) =
            tokio::try_join!(assets.load_tile_sheet(&record.tile_catalog), background)?;

        let music = match (&record.music, options.play_music) {
            (Some(key), true) => match assets.load_audio(key, options.volume).await {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!("world {}: music unavailable: {e}", record.id);
                    None
                }
            },
            _ => None,
        };

        let mut world = Self::new(record, sheet.catalog.clone())?;
        world.sheet = Some(sheet.image.clone());
        world.background = background;
        world.music = music;
        world.options = options;
        world.generate();
        Ok(world)
    }

    pub fn with_options(mut self, options: WorldOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the background image and regenerate.
    pub fn with_background(mut self, image: Arc<Image>) -> Self {
        self.background = Some(image);
        self.generate();
        self
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &WorldRecord {
        &self.record
    }

    pub fn catalog(&self) -> &TileCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &WorldOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut WorldOptions {
        &mut self.options
    }

    pub fn music(&self) -> Option<&AudioHandle> {
        self.music.as_ref()
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    pub fn render_objects(&self) -> &[RenderObject] {
        &self.render_objects
    }

    pub fn path_grid(&self) -> &PathGrid {
        &self.grid
    }

    pub fn grid_width(&self) -> u32 {
        self.record.width
    }

    pub fn grid_height(&self) -> u32 {
        self.record.height
    }

    pub fn tile_w(&self) -> f32 {
        self.record.tile_w as f32
    }

    pub fn tile_h(&self) -> f32 {
        self.record.tile_h as f32
    }

    /// World width in world units.
    pub fn width(&self) -> f32 {
        self.record.width as f32 * self.tile_w()
    }

    /// World height in world units.
    pub fn height(&self) -> f32 {
        self.record.height as f32 * self.tile_h()
    }

    pub fn blocked_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_blocked()).count()
    }

    /// Full rebuild: tiles, blocking, pathfinding grid, render objects.
    pub fn generate(&mut self) {
        self.render_objects.clear();
        self.state = WorldState::default();
        self.tiles = (0..self.record.tiles.len())
            .map(|i| self.build_tile(i, self.record.tiles[i]))
            .collect();
        self.update_blocked_tiles();

        if let Some(bg) = self.background.clone() {
            self.render_objects.push(RenderObject {
                tile: None,
                order: BACKGROUND_ORDER,
                src: bg.bounds(),
                dst: Rect::new(0.0, 0.0, self.width(), self.height()),
                image: bg,
            });
        }
        for i in 0..self.tiles.len() {
            if let Some(obj) = self.render_object_for(i) {
                self.render_objects.push(obj);
            }
        }
        self.render_objects.sort_by_key(|o| o.order);

        if self.highlight.is_some_and(|h| h.tile >= self.tiles.len()) {
            self.highlight = None;
        }

        info!(
            "generated world {} ({}x{}): {} blocked cells, {} render objects",
            self.record.id,
            self.record.width,
            self.record.height,
            self.blocked_count(),
            self.render_objects.len()
        );
    }

    fn build_tile(&self, index: usize, def_id: TileDefId) -> Tile {
        let w = self.record.width.max(1);
        let gx = (index as u32) % w;
        let gz = (index as u32) / w;
        let details = if def_id == EMPTY_TILE {
            None
        } else {
            let found = self.catalog.find(def_id).cloned();
            if found.is_none() {
                debug!("world {}: tile {index} uses unknown definition {def_id}", self.record.id);
            }
            found
        };
        Tile {
            index,
            gx,
            gz,
            x: gx as f32 * self.tile_w(),
            z: gz as f32 * self.tile_h(),
            w: self.tile_w(),
            h: self.tile_h(),
            def_id,
            details,
            blocked_by: None,
            selected: false,
        }
    }

    /// Sprite of a tile. Multi-cell sprites extend up and to the left of the origin.
    fn render_object_for(&self, index: usize) -> Option<RenderObject> {
        let sheet = self.sheet.as_ref()?;
        let tile = self.tiles.get(index)?;
        let details = tile.details.as_ref()?;
        let frame = details.frame.as_ref()?;
        let (xs, ys) = details.footprint();
        let w = xs as f32 * tile.w;
        let h = ys as f32 * tile.h;
        Some(RenderObject {
            tile: Some(index),
            order: TILE_RENDER_ORDER,
            image: sheet.clone(),
            src: TileSheet::frame_rect(frame),
            dst: Rect::new(tile.x - w + tile.w, tile.z - h + tile.h, w, h),
        })
    }

    /// Recompute `blocked_by` for every tile, then the pathfinding grid.
    pub fn update_blocked_tiles(&mut self) {
        for tile in &mut self.tiles {
            tile.blocked_by = None;
        }

        let width = self.record.width as i64;
        let height = self.record.height as i64;
        for i in 0..self.tiles.len() {
            let Some(details) = self.tiles[i].details.as_ref() else {
                continue;
            };
            let (xs, ys) = details.footprint();
            self.tiles[i].blocked_by = Some(i);
            if xs.saturating_mul(ys) < 2 {
                continue;
            }

            let gx = self.tiles[i].gx as i64;
            let gz = self.tiles[i].gz as i64;
            for row in (gz - ys as i64 + 1)..=gz {
                if row < 0 || row >= height {
                    continue;
                }
                for col in (gx - xs as i64 + 1)..=gx {
                    if col < 0 || col >= width {
                        continue;
                    }
                    self.tiles[(row * width + col) as usize].blocked_by = Some(i);
                }
            }
        }

        self.generate_path_grid();
    }

    /// Derive the binary occupancy grid from `blocked_by`.
    pub fn generate_path_grid(&mut self) {
        let cells = self.tiles.iter().map(|t| u8::from(t.is_blocked())).collect();
        self.grid = PathGrid::from_cells(self.record.width, self.record.height, cells);
    }

    /// Replace the definition of one tile.
    ///
    /// With `merge = false` only the tile object and its render object are
    /// rebuilt; blocking and the pathfinding grid keep their previous state
    /// until the next [`TileWorld::update_blocked_tiles`] or `generate`.
    /// With `merge = true` blocking and the grid are recomputed as well.
    /// Returns `false` if `index` is out of bounds.
    pub fn update_tile(&mut self, index: usize, def_id: TileDefId, merge: bool) -> bool {
        if index >= self.tiles.len() {
            return false;
        }
        self.record.tiles[index] = def_id;

        let selected = self.tiles[index].selected;
        let mut tile = self.build_tile(index, def_id);
        tile.selected = selected;
        self.tiles[index] = tile;

        if merge {
            self.update_blocked_tiles();
        }

        self.render_objects.retain(|o| o.tile != Some(index));
        if let Some(obj) = self.render_object_for(index) {
            let at = self
                .render_objects
                .iter()
                .position(|o| o.order > obj.order)
                .unwrap_or(self.render_objects.len());
            self.render_objects.insert(at, obj);
        }
        true
    }

    /// Drop all render objects; with `reset_tiles` also zero the definition array.
    ///
    /// Tile objects are left as they are until the next `generate`.
    pub fn clear(&mut self, reset_tiles: bool) {
        self.render_objects.clear();
        if reset_tiles {
            self.record.tiles.iter_mut().for_each(|t| *t = EMPTY_TILE);
        }
    }

    /// Zero one entry of the definition array (takes effect on `generate`).
    pub fn clear_tile_by_index(&mut self, index: usize) {
        if let Some(t) = self.record.tiles.get_mut(index) {
            *t = EMPTY_TILE;
        }
    }

    pub fn tile_at_grid(&self, gx: u32, gz: u32) -> Option<&Tile> {
        self.record.index(gx, gz).and_then(|i| self.tiles.get(i))
    }

    pub fn tile_at_world(&self, x: f32, z: f32) -> Option<&Tile> {
        if x < 0.0 || z < 0.0 {
            return None;
        }
        let gx = (x / self.tile_w()).floor() as u32;
        let gz = (z / self.tile_h()).floor() as u32;
        self.tile_at_grid(gx, gz)
    }

    /// Tile under a screen point given the camera view origin.
    pub fn tile_at_screen(&self, x: f32, z: f32, x_view: f32, z_view: f32) -> Option<&Tile> {
        self.tile_at_world(x + x_view, z + z_view)
    }

    /// Shortest path between two cells as tile indices, excluding `from`.
    pub fn path_between(&self, from: (u32, u32), to: (u32, u32)) -> Vec<usize> {
        let path = find_path(&self.grid, from, to);
        if path.is_empty() {
            debug!("world {}: no path {:?} -> {:?}", self.record.id, from, to);
        }
        let w = self.record.width as usize;
        path.into_iter()
            .map(|(gx, gz)| (gz as usize) * w + gx as usize)
            .collect()
    }

    /// Shortest path from a cell to the tile at `to`.
    pub fn path_to_tile(&self, from: (u32, u32), to: usize) -> Vec<usize> {
        match self.tiles.get(to) {
            Some(t) => self.path_between(from, (t.gx, t.gz)),
            None => Vec::new(),
        }
    }

    /// Random unblocked tile in the square neighborhood of `origin`.
    ///
    /// The neighborhood is the inclusive box of half-size `radius / 2` around
    /// the origin cell, clipped to the world. This is an approximation of a
    /// radius, not a circle.
    pub fn random_free_tile_near(&self, origin: (u32, u32), radius: u32, rng: &mut SimpleRng) -> Option<usize> {
        if self.tiles.is_empty() {
            return None;
        }
        let half = radius / 2;
        let x0 = origin.0.saturating_sub(half);
        let x1 = origin.0.saturating_add(half).min(self.record.width - 1);
        let z0 = origin.1.saturating_sub(half);
        let z1 = origin.1.saturating_add(half).min(self.record.height - 1);

        let mut free = Vec::new();
        for gz in z0..=z1 {
            for gx in x0..=x1 {
                if let Some(tile) = self.tile_at_grid(gx, gz) {
                    if !tile.is_blocked() {
                        free.push(tile.index);
                    }
                }
            }
        }
        rng.pick(&free).copied()
    }

    /// Random unblocked tile anywhere in the world.
    pub fn random_free_tile(&self, rng: &mut SimpleRng) -> Option<usize> {
        let free: Vec<usize> = self
            .tiles
            .iter()
            .filter(|t| !t.is_blocked())
            .map(|t| t.index)
            .collect();
        rng.pick(&free).copied()
    }

    /// Clamp a proposed position of an entity sized `w x h` into the world and
    /// resolve its grid cell and tile.
    ///
    /// A move onto a cell blocked by an occupant other than the one blocking
    /// `previous.tile` is rejected and `pos` falls back to `previous`. The final
    /// coordinates are rounded to whole units.
    pub fn normalize_position(&self, pos: &mut Position, w: f32, h: f32, previous: &Position) {
        if self.tiles.is_empty() {
            return;
        }
        let (hw, hh) = (w / 2.0, h / 2.0);
        if pos.x - hw < 0.0 {
            pos.x = hw;
        }
        if pos.z - hh < 0.0 {
            pos.z = hh;
        }
        if pos.x + hw > self.width() {
            pos.x = self.width() - hw;
        }
        if pos.z + hh > self.height() {
            pos.z = self.height() - hh;
        }

        let gx = ((pos.x - hw) / self.tile_w()).round().max(0.0) as u32;
        let gz = ((pos.z - hh) / self.tile_h()).round().max(0.0) as u32;
        pos.gx = gx.min(self.record.width - 1);
        pos.gz = gz.min(self.record.height - 1);

        let Some(tile) = self.tile_at_grid(pos.gx, pos.gz) else {
            pos.tile = None;
            return;
        };

        if let (Some(blocker), Some(prev_tile)) = (tile.blocked_by, previous.tile) {
            let prev_blocker = self.tiles.get(prev_tile).and_then(|t| t.blocked_by);
            if prev_blocker != Some(blocker) {
                pos.x = previous.x;
                pos.z = previous.z;
                pos.gx = previous.gx;
                pos.gz = previous.gz;
                pos.tile = previous.tile;
                pos.x = pos.x.round();
                pos.z = pos.z.round();
                return;
            }
        }

        pos.tile = Some(tile.index);
        pos.x = pos.x.round();
        pos.z = pos.z.round();
    }

    /// Pointer interaction: release toggles the selected tile, movement sets the hover tile.
    pub fn check_pointer(&mut self, input: &InputState, camera: &Camera, scale: f32) {
        if let Some(up) = input.pointer.up {
            let (wx, wz) = camera.screen_to_world(up.x, up.y, scale);
            let Some(index) = self.tile_at_world(wx, wz).map(|t| t.index) else {
                return;
            };

            if self.tiles[index].selected {
                self.tiles[index].selected = false;
                self.state.selected_tile = None;
            } else {
                if let Some(prev) = self.state.selected_tile {
                    if let Some(t) = self.tiles.get_mut(prev) {
                        t.selected = false;
                    }
                }
                self.tiles[index].selected = true;
                self.state.selected_tile = Some(index);
                self.state.selected_object = self.tiles[index]
                    .blocked_by
                    .and_then(|b| self.tiles.get(b))
                    .and_then(|t| t.details.clone());
            }
        } else if let Some(moved) = input.pointer.moved {
            let (wx, wz) = camera.screen_to_world(moved.x, moved.y, scale);
            if let Some(index) = self.tile_at_world(wx, wz).map(|t| t.index) {
                self.state.hover_tile = Some(index);
            }
        }
    }

    pub fn set_highlighted_tile(&mut self, index: usize, now_ms: f64) {
        if index < self.tiles.len() {
            self.highlight = Some(Highlight {
                tile: index,
                since_ms: now_ms,
            });
        }
    }

    pub fn unset_highlighted_tile(&mut self) {
        self.highlight = None;
    }

    pub fn highlighted_tile(&self) -> Option<usize> {
        self.highlight.map(|h| h.tile)
    }

    /// Pulse alpha of the highlighted tile in `[0, 1]`.
    pub fn highlight_alpha(&self, now_ms: f64) -> Option<f32> {
        self.highlight
            .map(|h| yoyo(now_ms - h.since_ms, HIGHLIGHT_PULSE_MS as f64))
    }

    /// Draw render objects in order, culled by the camera, then the highlight.
    pub fn draw(&self, surface: &mut dyn Surface, camera: Option<&Camera>, now_ms: f64) {
        for obj in &self.render_objects {
            let visible = obj.tile.is_none() || camera.map_or(true, |c| c.is_in_view(&obj.dst));
            if visible {
                surface.draw_image(&obj.image, obj.src, obj.dst);
            }
        }

        if let (Some(h), Some(alpha)) = (self.highlight, self.highlight_alpha(now_ms)) {
            if let Some(tile) = self.tiles.get(h.tile) {
                let a = (alpha * 255.0).round() as u8;
                surface.fill_rect(tile.rect(), self.options.highlight_color.with_alpha(a));
            }
        }
    }

    /// Cell range `(x0..x1, z0..z1)` covered by the camera view.
    pub fn visible_cells(&self, camera: Option<&Camera>) -> (std::ops::Range<u32>, std::ops::Range<u32>) {
        let Some(cam) = camera else {
            return (0..self.record.width, 0..self.record.height);
        };
        let x0 = (cam.x_view() / self.tile_w()).floor().max(0.0) as u32;
        let z0 = (cam.z_view() / self.tile_h()).floor().max(0.0) as u32;
        let x1 = ((cam.x_view() + cam.w_view()) / self.tile_w()).ceil().max(0.0) as u32;
        let z1 = ((cam.z_view() + cam.h_view()) / self.tile_h()).ceil().max(0.0) as u32;
        (
            x0.min(self.record.width)..x1.min(self.record.width),
            z0.min(self.record.height)..z1.min(self.record.height),
        )
    }

    /// Grid overlay: lines, blocked cells, selected cell, hover cell.
    pub fn draw_grid(&self, surface: &mut dyn Surface, camera: Option<&Camera>) {
        let (xs, zs) = self.visible_cells(camera);
        let (tw, th) = (self.tile_w(), self.tile_h());
        let color = self.options.grid_line_color;

        let top = zs.start as f32 * th;
        let bottom = zs.end as f32 * th;
        for gx in xs.start..=xs.end {
            let x = gx as f32 * tw;
            surface.draw_line((x, top), (x, bottom), color);
        }
        let left = xs.start as f32 * tw;
        let right = xs.end as f32 * tw;
        for gz in zs.start..=zs.end {
            let z = gz as f32 * th;
            surface.draw_line((left, z), (right, z), color);
        }

        for gz in zs.clone() {
            for gx in xs.clone() {
                if let Some(tile) = self.tile_at_grid(gx, gz) {
                    if tile.is_blocked() {
                        surface.stroke_rect(tile.rect(), self.options.blocked_tile_color);
                    }
                }
            }
        }

        if let Some(tile) = self.state.selected_tile.and_then(|i| self.tiles.get(i)) {
            surface.stroke_rect(tile.rect(), self.options.selected_tile_color);
        }
        if let Some(tile) = self.state.hover_tile.and_then(|i| self.tiles.get(i)) {
            surface.stroke_rect(tile.rect(), self.options.hover_tile_color);
        }
    }

    /// Persist the world record, remembering it as last opened if configured.
    pub async fn save(&self, store: &dyn WorldStore) -> Result<(), StoreError> {
        store.save(&self.record).await?;
        if self.options.save_last_opened {
            store.store_last_opened_world_id(&self.record.id).await?;
        }
        Ok(())
    }
}
