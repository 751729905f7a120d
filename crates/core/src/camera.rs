//! Viewport camera.
//!
//! The camera owns a view rectangle `(x_view, z_view, w_view, h_view)` into a
//! world rectangle anchored at the origin. Following keeps the subject outside
//! a dead-zone margin from the viewport edges, pushing the view only as far as
//! needed. After every position update the viewport is clamped back inside the
//! world, and the view size never exceeds the world size.
//!
//! `follow` with `animate = true` starts a quadratic-out transition of the view
//! center towards the subject; ordinary following is suppressed until it ends.

use tilescape_types::{Axis, Rect, CAMERA_FOLLOW_MS};

use crate::entity::Spatial;
use crate::scene::NodeHandle;
use crate::tween::{Easing, Tween};
use crate::world::Tile;

#[derive(Debug, Clone)]
pub struct Camera {
    x_view: f32,
    z_view: f32,
    w_view: f32,
    h_view: f32,
    viewport: Rect,
    world: Rect,
    x_dead_zone: f32,
    z_dead_zone: f32,
    axis: Axis,
    following: Option<NodeHandle>,
    tween: Option<Tween>,
}

impl Camera {
    pub fn new(w_view: f32, h_view: f32, world_width: f32, world_height: f32) -> Self {
        let mut camera = Self {
            x_view: 0.0,
            z_view: 0.0,
            w_view: 0.0,
            h_view: 0.0,
            viewport: Rect::default(),
            world: Rect::default(),
            x_dead_zone: 0.0,
            z_dead_zone: 0.0,
            axis: Axis::Both,
            following: None,
            tween: None,
        };
        camera.update_world_size(world_width, world_height);
        camera.update_view_port_size(w_view, h_view);
        camera
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_position(mut self, x_view: f32, z_view: f32) -> Self {
        self.set_position(x_view, z_view);
        self
    }

    pub fn x_view(&self) -> f32 {
        self.x_view
    }

    pub fn z_view(&self) -> f32 {
        self.z_view
    }

    pub fn w_view(&self) -> f32 {
        self.w_view
    }

    pub fn h_view(&self) -> f32 {
        self.h_view
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn world(&self) -> Rect {
        self.world
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn set_axis(&mut self, axis: Axis) {
        self.axis = axis;
    }

    pub fn dead_zone(&self) -> (f32, f32) {
        (self.x_dead_zone, self.z_dead_zone)
    }

    pub fn following(&self) -> Option<NodeHandle> {
        self.following
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    /// Move the view origin and clamp it into the world.
    pub fn set_position(&mut self, x_view: f32, z_view: f32) {
        self.x_view = x_view;
        self.z_view = z_view;
        self.sync_viewport();
        self.clamp_to_world();
    }

    /// Start following a node.
    ///
    /// With `animate` the view center eases from where it is now towards the
    /// subject over `CAMERA_FOLLOW_MS`, see [`Camera::advance`].
    pub fn follow(&mut self, target: NodeHandle, x_dead_zone: f32, z_dead_zone: f32, animate: bool) {
        self.following = Some(target);
        self.x_dead_zone = x_dead_zone.max(0.0);
        self.z_dead_zone = z_dead_zone.max(0.0);
        self.tween = animate.then(|| {
            Tween::new(
                (self.x_view + self.w_view / 2.0, self.z_view + self.h_view / 2.0),
                CAMERA_FOLLOW_MS as f32,
                Easing::QuadraticOut,
            )
        });
    }

    pub fn unfollow(&mut self) {
        self.following = None;
        self.tween = None;
    }

    /// Advance the follow transition. The view center tracks the eased point.
    pub fn advance(&mut self, dt_ms: f32, target: Option<(f32, f32)>) {
        let Some(tween) = self.tween.as_mut() else {
            return;
        };
        let Some(target) = target else {
            self.tween = None;
            return;
        };

        let (cx, cz) = tween.advance(dt_ms, target);
        let done = tween.is_complete();
        self.x_view = cx - self.w_view / 2.0;
        self.z_view = cz - self.h_view / 2.0;
        if done {
            self.tween = None;
        }
        self.sync_viewport();
        self.clamp_to_world();
    }

    /// Apply dead-zone following for `followed` (when not animating), then clamp.
    pub fn update_position(&mut self, followed: Option<(f32, f32)>) {
        if let (Some((fx, fz)), true, false) = (followed, self.following.is_some(), self.is_animating()) {
            if self.axis.follows_horizontal() {
                if fx - self.x_view + self.x_dead_zone > self.w_view {
                    self.x_view = fx - (self.w_view - self.x_dead_zone);
                }
                if fx - self.x_dead_zone < self.x_view {
                    self.x_view = fx - self.x_dead_zone;
                }
            }
            if self.axis.follows_vertical() {
                if fz - self.z_view + self.z_dead_zone > self.h_view {
                    self.z_view = fz - (self.h_view - self.z_dead_zone);
                }
                if fz - self.z_dead_zone < self.z_view {
                    self.z_view = fz - self.z_dead_zone;
                }
            }
            self.sync_viewport();
        }

        self.clamp_to_world();
    }

    /// Resize the view; each dimension is capped to the world's.
    pub fn update_view_port_size(&mut self, width: f32, height: f32) {
        self.w_view = width.max(0.0).min(self.world.width);
        self.h_view = height.max(0.0).min(self.world.height);
        self.sync_viewport();
        self.clamp_to_world();
    }

    /// Replace the world rectangle; the view is re-capped and re-clamped.
    pub fn update_world_size(&mut self, width: f32, height: f32) {
        self.world = Rect::new(0.0, 0.0, width.max(0.0), height.max(0.0));
        self.w_view = self.w_view.min(self.world.width);
        self.h_view = self.h_view.min(self.world.height);
        self.sync_viewport();
        self.clamp_to_world();
    }

    /// Screen point (device units, before `scale`) to world coordinates.
    pub fn screen_to_world(&self, sx: f32, sy: f32, scale: f32) -> (f32, f32) {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        (sx / scale + self.x_view, sy / scale + self.z_view)
    }

    pub fn is_in_view(&self, rect: &Rect) -> bool {
        self.viewport.overlaps(rect)
    }

    pub fn is_in_view_by_tile(&self, tile: &Tile) -> bool {
        self.is_in_view(&tile.rect())
    }

    pub fn is_in_view_by_spatial(&self, spatial: &Spatial) -> bool {
        self.is_in_view(&spatial.bounds())
    }

    fn sync_viewport(&mut self) {
        self.viewport = Rect::new(self.x_view, self.z_view, self.w_view, self.h_view);
    }

    fn clamp_to_world(&mut self) {
        if self.viewport.within(&self.world) {
            return;
        }
        if self.viewport.left < self.world.left {
            self.x_view = self.world.left;
        }
        if self.viewport.top < self.world.top {
            self.z_view = self.world.top;
        }
        if self.viewport.right() > self.world.right() {
            self.x_view = self.world.right() - self.w_view;
        }
        if self.viewport.bottom() > self.world.bottom() {
            self.z_view = self.world.bottom() - self.h_view;
        }
        self.sync_viewport();
    }
}
