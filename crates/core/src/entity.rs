//! Spatial entity components.
//!
//! A node becomes a spatial entity by carrying a [`Spatial`] component: a
//! center-based world position with size, an optional movement path of tile
//! indices, and behavior parameters driving the wander AI. A [`Sprite`]
//! component gives it an animated image; without one the entity is drawn as a
//! filled box.
//!
//! Movement along a path advances `speed * dt` units per tick along the facing
//! angle. The head of the path is popped once the entity's current tile equals
//! it, and the entity turns towards the next one.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tilescape_types::{Color, Rect, DEFAULT_MOVE_DELAY_MS, DEFAULT_SPEED, SPRITE_CYCLE_MS};

use crate::assets::Image;
use crate::camera::Camera;
use crate::rng::SimpleRng;
use crate::world::TileWorld;

/// World position of an entity. `(x, z)` is the center of its bounding box.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub z: f32,
    /// Facing angle in radians
    pub r: f32,
    pub gx: u32,
    pub gz: u32,
    /// Index of the tile at `(gx, gz)`
    pub tile: Option<usize>,
}

/// Per-entity AI parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BehaviorParams {
    pub aggressive: bool,
    pub view_radius: u32,
    /// Side of the neighborhood box used by the wander AI, in cells; `0` disables wandering
    pub move_radius: u32,
    pub move_everywhere: bool,
    /// Upper bound of the random delay before a wander re-roll
    pub move_delay_ms: u32,
    pub immortal: bool,
    /// World units per second
    pub speed: f32,
}

impl Default for BehaviorParams {
    fn default() -> Self {
        Self {
            aggressive: true,
            view_radius: 4,
            move_radius: 30,
            move_everywhere: false,
            move_delay_ms: DEFAULT_MOVE_DELAY_MS,
            immortal: true,
            speed: DEFAULT_SPEED,
        }
    }
}

/// Result of one auto-movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStep {
    /// No path to follow
    Idle,
    Moving,
    /// The last tile of the path was reached this tick
    Arrived,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spatial {
    pub position: Position,
    pub width: f32,
    pub height: f32,
    /// Screen offset applied while drawing this entity and its children
    pub offset: (f32, f32),
    pub move_path: VecDeque<usize>,
    pub params: BehaviorParams,
    pub is_moving: bool,
    /// Entity controlled by the local player
    pub is_self: bool,
    /// Draw the remaining path (player entity only)
    pub draw_destination: bool,
    pub color: Color,
    wander_at_ms: Option<f64>,
}

impl Spatial {
    pub fn new(x: f32, z: f32, width: f32, height: f32) -> Self {
        Self {
            position: Position {
                x,
                z,
                ..Position::default()
            },
            width,
            height,
            offset: (0.0, 0.0),
            move_path: VecDeque::new(),
            params: BehaviorParams::default(),
            is_moving: false,
            is_self: false,
            draw_destination: false,
            color: Color::WHITE,
            wander_at_ms: None,
        }
    }

    pub fn with_params(mut self, params: BehaviorParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_rotation(mut self, r: f32) -> Self {
        self.position.r = r;
        self
    }

    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset = (x, y);
        self
    }

    /// Axis-aligned bounding box in world units.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.position.x - self.width / 2.0,
            self.position.z - self.height / 2.0,
            self.width,
            self.height,
        )
    }

    /// Path to `tile` and start walking. Returns `false` when there is no path.
    pub fn move_to_tile(&mut self, world: &TileWorld, tile: usize) -> bool {
        let path = world.path_to_tile((self.position.gx, self.position.gz), tile);
        let Some(&first) = path.first() else {
            return false;
        };
        self.move_path = path.into();
        self.is_moving = true;
        self.wander_at_ms = None;
        self.face_direction_by_tile(world, first);
        true
    }

    pub fn unset_move_to(&mut self) {
        self.move_path.clear();
        self.is_moving = false;
    }

    /// Turn towards the center of a tile.
    pub fn face_direction_by_tile(&mut self, world: &TileWorld, tile: usize) {
        if let Some(t) = world.tile(tile) {
            let (cx, cz) = t.center();
            self.position.r = (cz - self.position.z).atan2(cx - self.position.x);
        }
    }

    /// Turn towards a screen point seen through `camera`.
    pub fn face_direction_by_screen(&mut self, sx: f32, sy: f32, camera: &Camera, scale: f32) {
        let (wx, wz) = camera.screen_to_world(sx, sy, scale);
        self.position.r = (wz - self.position.z).atan2(wx - self.position.x);
    }

    /// Place the entity centered on grid cell `(gx, gz)`.
    pub fn set_position_by_grid(&mut self, gx: u32, gz: u32, r: f32, world: &TileWorld) {
        self.position.x = gx as f32 * world.tile_w() + self.width / 2.0;
        self.position.z = gz as f32 * world.tile_h() + self.height / 2.0;
        self.position.r = r;
        self.position.gx = gx;
        self.position.gz = gz;
        self.position.tile = world.tile_at_grid(gx, gz).map(|t| t.index);
    }

    /// Step along `move_path`.
    pub fn check_auto_movement(&mut self, dt: f32, world: &TileWorld) -> MoveStep {
        let Some(&head) = self.move_path.front() else {
            return MoveStep::Idle;
        };

        self.is_moving = true;
        let step = self.params.speed * dt;
        self.position.x += step * self.position.r.cos();
        self.position.z += step * self.position.r.sin();

        if self.position.tile == Some(head) {
            self.move_path.pop_front();
            match self.move_path.front() {
                Some(&next) => self.face_direction_by_tile(world, next),
                None => {
                    self.is_moving = false;
                    return MoveStep::Arrived;
                }
            }
        } else if let Some(t) = world.tile(head) {
            // drifted off the straight line, aim again
            if t.gx.abs_diff(self.position.gx) > 1 || t.gz.abs_diff(self.position.gz) > 1 {
                self.face_direction_by_tile(world, head);
            }
        }
        MoveStep::Moving
    }

    /// Schedule a wander re-roll at a random time within `move_delay_ms` from `now_ms`.
    pub fn schedule_wander(&mut self, now_ms: f64, rng: &mut SimpleRng) {
        let delay = rng.next_range(self.params.move_delay_ms);
        self.wander_at_ms = Some(now_ms + delay as f64);
    }

    pub fn cancel_wander(&mut self) {
        self.wander_at_ms = None;
    }

    pub fn wander_at_ms(&self) -> Option<f64> {
        self.wander_at_ms
    }

    /// Run a due wander re-roll: path to a random free tile nearby. A failed
    /// attempt schedules another one.
    pub fn wander(&mut self, world: &TileWorld, rng: &mut SimpleRng, now_ms: f64) -> bool {
        match self.wander_at_ms {
            Some(at) if at <= now_ms => {}
            _ => return false,
        }
        self.wander_at_ms = None;

        let target = if self.params.move_everywhere {
            world.random_free_tile(rng)
        } else {
            world.random_free_tile_near(
                (self.position.gx, self.position.gz),
                self.params.move_radius,
                rng,
            )
        };
        let moved = target.is_some_and(|t| self.move_to_tile(world, t));
        if !moved {
            self.schedule_wander(now_ms, rng);
        }
        moved
    }
}

/// Image component with optional horizontal frame strip animation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    /// Asset key resolved during `init`
    pub image_key: Option<String>,
    pub image: Option<Arc<Image>>,
    pub frame_w: f32,
    pub frame_h: f32,
    pub draw_w: f32,
    pub draw_h: f32,
    pub max_frames: u32,
    current_frame: u32,
    last_frame_ms: f64,
}

impl Sprite {
    pub fn new(image_key: impl Into<String>, frame_w: f32, frame_h: f32) -> Self {
        Self {
            image_key: Some(image_key.into()),
            image: None,
            frame_w,
            frame_h,
            draw_w: frame_w,
            draw_h: frame_h,
            max_frames: 1,
            current_frame: 0,
            last_frame_ms: 0.0,
        }
    }

    /// Sprite over an already decoded image, one frame covering all of it.
    pub fn from_image(image: Arc<Image>) -> Self {
        let (w, h) = (image.width() as f32, image.height() as f32);
        Self {
            image_key: None,
            image: Some(image),
            frame_w: w,
            frame_h: h,
            draw_w: w,
            draw_h: h,
            max_frames: 1,
            current_frame: 0,
            last_frame_ms: 0.0,
        }
    }

    pub fn with_frames(mut self, max_frames: u32) -> Self {
        self.max_frames = max_frames.max(1);
        self
    }

    pub fn with_draw_size(mut self, w: f32, h: f32) -> Self {
        self.draw_w = w;
        self.draw_h = h;
        self
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    /// Advance the frame so the whole strip cycles every `SPRITE_CYCLE_MS`.
    pub fn advance(&mut self, now_ms: f64) {
        if self.max_frames <= 1 {
            return;
        }
        let interval = SPRITE_CYCLE_MS as f64 / self.max_frames as f64;
        if now_ms - self.last_frame_ms >= interval {
            self.current_frame = (self.current_frame + 1) % self.max_frames;
            self.last_frame_ms = now_ms;
        }
    }

    /// Source rectangle of the current frame.
    pub fn src_rect(&self) -> Rect {
        Rect::new(
            self.current_frame as f32 * self.frame_w,
            0.0,
            self.frame_w,
            self.frame_h,
        )
    }

    /// Destination rectangle centered on `(x, z)`.
    pub fn dst_rect(&self, x: f32, z: f32) -> Rect {
        Rect::new(x - self.draw_w / 2.0, z - self.draw_h / 2.0, self.draw_w, self.draw_h)
    }
}

/// Normalize an angle into `(-PI, PI]`.
pub fn wrap_angle(r: f32) -> f32 {
    let mut r = r % (2.0 * PI);
    if r <= -PI {
        r += 2.0 * PI;
    } else if r > PI {
        r -= 2.0 * PI;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilescape_types::{TileCatalog, TileDef, WorldRecord};

    fn open_world(w: u32, h: u32) -> TileWorld {
        TileWorld::new(WorldRecord::empty("e", w, h), TileCatalog::new(vec![TileDef::new(1)])).unwrap()
    }

    fn placed(world: &TileWorld, gx: u32, gz: u32) -> Spatial {
        let mut s = Spatial::new(0.0, 0.0, 32.0, 32.0);
        s.set_position_by_grid(gx, gz, 0.0, world);
        s
    }

    #[test]
    fn defaults_match_behavior_table() {
        let p = BehaviorParams::default();
        assert!(p.aggressive && p.immortal && !p.move_everywhere);
        assert_eq!((p.view_radius, p.move_radius, p.move_delay_ms), (4, 30, 10_000));
        assert_eq!(p.speed, 200.0);
    }

    #[test]
    fn grid_placement_centers_on_cell() {
        let world = open_world(4, 4);
        let s = placed(&world, 2, 1);
        assert_eq!((s.position.x, s.position.z), (80.0, 48.0));
        assert_eq!(s.position.tile, Some(6));
        assert_eq!(s.bounds(), Rect::new(64.0, 32.0, 32.0, 32.0));
    }

    #[test]
    fn move_to_tile_faces_first_step() {
        let world = open_world(4, 4);
        let mut s = placed(&world, 0, 0);
        assert!(s.move_to_tile(&world, 5));
        assert_eq!(s.move_path, VecDeque::from(vec![5]));
        assert!(s.is_moving);
        assert!((s.position.r - PI / 4.0).abs() < 1e-5);

        s.unset_move_to();
        assert!(s.move_path.is_empty() && !s.is_moving);
        assert!(!s.move_to_tile(&world, 0));
    }

    #[test]
    fn auto_movement_pops_head_and_arrives() {
        let world = open_world(4, 1);
        let mut s = placed(&world, 0, 0);
        assert!(s.move_to_tile(&world, 1));
        assert_eq!(s.check_auto_movement(0.1, &world), MoveStep::Moving);
        assert_eq!(s.position.x, 36.0);

        s.position.tile = Some(1);
        assert_eq!(s.check_auto_movement(0.1, &world), MoveStep::Arrived);
        assert!(!s.is_moving);
        assert_eq!(s.check_auto_movement(0.1, &world), MoveStep::Idle);
    }

    #[test]
    fn wander_waits_for_schedule() {
        let world = open_world(6, 6);
        let mut s = placed(&world, 3, 3);
        s.params.move_radius = 4;
        let mut rng = SimpleRng::new(3);

        assert!(!s.wander(&world, &mut rng, 0.0));
        s.schedule_wander(1000.0, &mut rng);
        let at = s.wander_at_ms().unwrap();
        assert!((1000.0..11_000.0).contains(&at));
        assert!(!s.wander(&world, &mut rng, at - 1.0));

        // the rolled tile may be the current one; then a new roll is scheduled
        let moved = s.wander(&world, &mut rng, at);
        assert_eq!(moved, !s.move_path.is_empty());
        assert_eq!(moved, s.wander_at_ms().is_none());
    }

    #[test]
    fn sprite_cycles_frames() {
        let mut sprite = Sprite::new("hero.png", 16.0, 16.0).with_frames(3);
        sprite.advance(100.0);
        assert_eq!(sprite.current_frame(), 0);
        sprite.advance(200.0);
        assert_eq!(sprite.current_frame(), 1);
        sprite.advance(400.0);
        sprite.advance(600.0);
        assert_eq!(sprite.current_frame(), 0);
        assert_eq!(sprite.src_rect(), Rect::new(0.0, 0.0, 16.0, 16.0));
    }

    #[test]
    fn angles_wrap() {
        assert!((wrap_angle(2.5 * PI) - PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-5);
    }
}
