//! Node lifecycle hooks and the contexts passed to them.
//!
//! Hooks never reach for global state: everything a hook may touch during a
//! pass arrives through its context. Structural edits of the tree are not
//! possible from inside a pass; hooks queue a [`SceneCommand`] instead and the
//! owner flushes the queue once the pass is over.

use serde_json::Value;
use tilescape_types::InputState;

use crate::assets::AssetCache;
use crate::camera::Camera;
use crate::rng::SimpleRng;
use crate::scene::{Node, NodeHandle};
use crate::surface::Surface;
use crate::world::TileWorld;
use crate::BoxFuture;

/// Services available to `on_init`.
#[derive(Clone)]
pub struct InitContext {
    pub assets: AssetCache,
}

impl InitContext {
    pub fn new(assets: AssetCache) -> Self {
        Self { assets }
    }
}

/// Per-tick state handed to `on_update`.
pub struct UpdateContext<'a> {
    /// Seconds since the previous tick
    pub dt: f32,
    /// Absolute time in milliseconds
    pub t: f64,
    pub world: Option<&'a TileWorld>,
    pub camera: Option<&'a Camera>,
    /// Zoom of the layer being updated
    pub scale: f32,
    pub input: &'a InputState,
    pub rng: &'a mut SimpleRng,
    /// Deferred tree edits, flushed after the pass
    pub commands: Vec<SceneCommand>,
    /// Node whose hook is running
    pub current: NodeHandle,
}

impl<'a> UpdateContext<'a> {
    pub fn new(dt: f32, t: f64, input: &'a InputState, rng: &'a mut SimpleRng) -> Self {
        Self {
            dt,
            t,
            world: None,
            camera: None,
            scale: 1.0,
            input,
            rng,
            commands: Vec::new(),
            current: NodeHandle::from_raw(0, 0),
        }
    }

    pub fn with_world(mut self, world: Option<&'a TileWorld>) -> Self {
        self.world = world;
        self
    }

    pub fn with_camera(mut self, camera: Option<&'a Camera>, scale: f32) -> Self {
        self.camera = camera;
        self.scale = scale;
        self
    }

    pub fn push(&mut self, command: SceneCommand) {
        self.commands.push(command);
    }
}

/// Per-frame state handed to `on_draw`.
pub struct DrawContext<'a> {
    pub surface: &'a mut dyn Surface,
    pub camera: Option<&'a Camera>,
    pub world: Option<&'a TileWorld>,
    pub dt: f32,
    pub t: f64,
}

/// Tree edits and world requests queued from inside a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCommand {
    RemoveChild { parent: NodeHandle, child: NodeHandle },
    RemoveChildById { parent: NodeHandle, id: String },
    Clear(NodeHandle),
    Destroy { node: NodeHandle, payload: Option<Value> },
    /// Pulse the given tile of the layer's world
    SetHighlight(usize),
    UnsetHighlight,
}

/// Custom lifecycle hooks of a node. Every hook has a no-op default.
pub trait Behavior: Send {
    /// Setup run once by `Scene::init`. May suspend, e.g. on asset loads.
    fn on_init<'a>(&'a mut self, _ctx: &'a InitContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn on_update(&mut self, _node: &mut Node, _ctx: &mut UpdateContext<'_>) {}

    fn on_draw(&mut self, _node: &Node, _ctx: &mut DrawContext<'_>) {}

    fn on_destroy(&mut self, _node: &mut Node, _payload: Option<&Value>) {}
}
