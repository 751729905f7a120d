//! Rendering layer: binds a drawing surface, a camera and an optional tile
//! world to a subtree of the scene.
//!
//! Per tick a layer resolves pointer interaction on its world, runs the update
//! pass over its subtree, flushes queued commands and moves the camera. Its
//! draw pass renders, inside the camera transform:
//!
//! 1. world render objects (background, then tile sprites) and the highlight
//! 2. the entity tree
//! 3. the grid overlay, when enabled in the world options

use tilescape_types::{InputState, Rect};

use crate::behavior::{DrawContext, SceneCommand, UpdateContext};
use crate::camera::Camera;
use crate::rng::SimpleRng;
use crate::scene::{NodeHandle, Scene};
use crate::surface::Surface;
use crate::world::TileWorld;

pub struct Layer<S: Surface> {
    id: String,
    root: NodeHandle,
    camera: Camera,
    world: Option<TileWorld>,
    surface: S,
    scale: f32,
    auto_clear: bool,
    enabled: bool,
}

impl<S: Surface> Layer<S> {
    /// Layer drawing the subtree under `root`. The camera starts with the
    /// surface size as viewport.
    pub fn new(id: impl Into<String>, root: NodeHandle, surface: S) -> Self {
        let (w, h) = surface.size();
        Self {
            id: id.into(),
            root,
            camera: Camera::new(w, h, w, h),
            world: None,
            surface,
            scale: 1.0,
            auto_clear: true,
            enabled: true,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.set_scale(scale);
        self
    }

    pub fn with_auto_clear(mut self, auto_clear: bool) -> Self {
        self.auto_clear = auto_clear;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn world(&self) -> Option<&TileWorld> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut TileWorld> {
        self.world.as_mut()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Attach a world; the camera adopts its size.
    pub fn set_world(&mut self, world: TileWorld) {
        self.camera.update_world_size(world.width(), world.height());
        self.resize_viewport();
        self.world = Some(world);
    }

    pub fn take_world(&mut self) -> Option<TileWorld> {
        self.world.take()
    }

    /// Zoom factor; the camera viewport shrinks as the scale grows.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = if scale > 0.0 { scale } else { 1.0 };
        self.resize_viewport();
    }

    /// Device size changed.
    pub fn resize(&mut self, width: f32, height: f32) -> (f32, f32) {
        self.camera
            .update_view_port_size(width / self.scale, height / self.scale);
        (self.camera.w_view(), self.camera.h_view())
    }

    fn resize_viewport(&mut self) {
        let (w, h) = self.surface.size();
        self.resize(w, h);
    }

    pub fn follow(&mut self, target: NodeHandle, x_dead_zone: f32, z_dead_zone: f32, animate: bool) {
        self.camera.follow(target, x_dead_zone, z_dead_zone, animate);
    }

    /// One update pass over the layer's subtree.
    pub fn update(&mut self, scene: &mut Scene, dt: f32, t: f64, input: &InputState, rng: &mut SimpleRng) {
        if !self.enabled {
            return;
        }
        if let Some(world) = self.world.as_mut() {
            world.check_pointer(input, &self.camera, self.scale);
        }

        let mut ctx = UpdateContext::new(dt, t, input, rng)
            .with_world(self.world.as_ref())
            .with_camera(Some(&self.camera), self.scale);
        scene.update(self.root, &mut ctx);
        let commands = std::mem::take(&mut ctx.commands);

        for command in scene.apply_commands(commands) {
            let Some(world) = self.world.as_mut() else {
                continue;
            };
            match command {
                SceneCommand::SetHighlight(tile) => world.set_highlighted_tile(tile, t),
                SceneCommand::UnsetHighlight => world.unset_highlighted_tile(),
                _ => {}
            }
        }

        let followed = self
            .camera
            .following()
            .and_then(|h| scene.get(h))
            .and_then(|n| n.spatial.as_ref())
            .map(|s| (s.position.x, s.position.z));
        self.camera.advance(dt * 1000.0, followed);
        self.camera.update_position(followed);
    }

    /// One draw pass over the layer's subtree.
    pub fn draw(&mut self, scene: &mut Scene, dt: f32, t: f64) {
        if !self.enabled {
            return;
        }

        self.surface.save();
        if self.auto_clear {
            let (w, h) = self.surface.size();
            self.surface.clear_rect(Rect::new(0.0, 0.0, w, h));
        }
        self.surface.scale(self.scale, self.scale);
        self.surface
            .translate(-self.camera.x_view(), -self.camera.z_view());

        if let Some(world) = &self.world {
            world.draw(&mut self.surface, Some(&self.camera), t);
        }

        let mut ctx = DrawContext {
            surface: &mut self.surface,
            camera: Some(&self.camera),
            world: self.world.as_ref(),
            dt,
            t,
        };
        scene.draw(self.root, &mut ctx);

        if let Some(world) = self.world.as_ref().filter(|w| w.options().draw_grid) {
            world.draw_grid(&mut self.surface, Some(&self.camera));
        }
        self.surface.restore();
    }
}
