//! Engine module - frame loop over layers of a shared scene
//!
//! The engine owns the [`Scene`], one root node and a list of [`Layer`]s. Each
//! layer gets its own subtree under the root, a surface and a camera. A frame
//! is one [`Engine::tick`]:
//!
//! | Step | Effect |
//! |------|--------|
//! | clock | delta seconds and absolute ms since start |
//! | update | every enabled layer runs its update pass |
//! | input clear | per-frame input (releases, clicks) is dropped |
//! | draw | every enabled layer draws its subtree |
//!
//! Input is cleared before drawing so per-frame input can only be consumed by
//! update hooks.

pub mod clock;
pub mod config;

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;

use tilescape_core::{
    AssetCache, Layer, NodeBuilder, NodeHandle, Scene, SceneError, SimpleRng, StoreError, Surface,
    TileWorld, WorldError, WorldStore,
};
use tilescape_types::{InputState, WorldRecord, DEFAULT_WORLD_ID};

pub use clock::FrameClock;
pub use config::EngineConfig;

/// Grid size of the world created when no saved world exists.
pub const DEFAULT_WORLD_CELLS: (u32, u32) = (32, 32);

/// Dead zone used when the camera follows the player.
pub const PLAYER_DEAD_ZONE: (f32, f32) = (150.0, 150.0);

/// Errors raised by the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("player already set ({0})")]
    PlayerAlreadySet(NodeHandle),

    #[error("unknown layer: {0}")]
    UnknownLayer(String),

    #[error("node {0} has no spatial component")]
    NotSpatial(NodeHandle),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Engine<S: Surface> {
    config: EngineConfig,
    scene: Scene,
    root: NodeHandle,
    layers: Vec<Layer<S>>,
    store: Arc<dyn WorldStore>,
    input: InputState,
    rng: SimpleRng,
    clock: FrameClock,
    player: Option<NodeHandle>,
    running: bool,
}

impl<S: Surface> Engine<S> {
    pub fn new(config: EngineConfig, assets: AssetCache, store: Arc<dyn WorldStore>) -> Self {
        let mut scene = Scene::with_assets(assets);
        let root = scene.create(NodeBuilder::new().with_id("engine"));
        if config.dev {
            info!("running in dev mode");
        }
        Self {
            config,
            scene,
            root,
            layers: Vec::new(),
            store,
            input: InputState::new(),
            rng: SimpleRng::new(1),
            clock: FrameClock::new(),
            player: None,
            running: false,
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.rng = SimpleRng::new(seed);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn player(&self) -> Option<NodeHandle> {
        self.player
    }

    pub fn store(&self) -> &Arc<dyn WorldStore> {
        &self.store
    }

    /// Initialize the scene tree. Layers added afterwards initialize on attach.
    pub async fn init(&mut self) -> Result<(), EngineError> {
        self.scene.init(self.root).await?;
        debug!("engine initialized with {} layer(s)", self.layers.len());
        Ok(())
    }

    /// Add a layer drawing to `surface`. Layers draw in insertion order.
    pub async fn add_layer(&mut self, id: &str, surface: S) -> Result<NodeHandle, EngineError> {
        let layer_root = self.scene.create(NodeBuilder::new().with_id(id));
        let order = self.layers.len() as i32;
        self.scene.add_child(self.root, layer_root, Some(order)).await?;

        self.layers.push(Layer::new(id, layer_root, surface));
        Ok(layer_root)
    }

    pub fn layers(&self) -> &[Layer<S>] {
        &self.layers
    }

    pub fn layer(&self, id: &str) -> Option<&Layer<S>> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<&mut Layer<S>> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    fn layer_index(&self, id: &str) -> Result<usize, EngineError> {
        self.layers
            .iter()
            .position(|l| l.id() == id)
            .ok_or_else(|| EngineError::UnknownLayer(id.to_string()))
    }

    /// Create a node from `builder` and attach it to the layer's subtree.
    pub async fn spawn(&mut self, layer: &str, builder: NodeBuilder) -> Result<NodeHandle, EngineError> {
        let i = self.layer_index(layer)?;
        let parent = self.layers[i].root();
        let node = self.scene.create(builder);
        self.scene.add_child(parent, node, None).await?;
        Ok(node)
    }

    /// Mark `node` as the local player and let the layer camera follow it.
    ///
    /// Assigning a second player is an error.
    pub fn set_player_self(&mut self, layer: &str, node: NodeHandle, animate: bool) -> Result<(), EngineError> {
        if let Some(current) = self.player {
            return Err(EngineError::PlayerAlreadySet(current));
        }
        let i = self.layer_index(layer)?;
        let spatial = self
            .scene
            .get_mut(node)
            .ok_or(SceneError::UnknownNode(node))?
            .spatial
            .as_mut()
            .ok_or(EngineError::NotSpatial(node))?;
        spatial.is_self = true;
        spatial.draw_destination = true;

        let (x_dead, z_dead) = PLAYER_DEAD_ZONE;
        self.layers[i].follow(node, x_dead, z_dead, animate);
        self.player = Some(node);
        info!("player set to {node} on layer {layer}");
        Ok(())
    }

    /// Id of the world to open: explicit, configured, last opened, then default.
    pub async fn resolve_world_id(&self, id: Option<&str>) -> Result<String, EngineError> {
        if let Some(id) = id.or(self.config.world.as_deref()) {
            return Ok(id.to_string());
        }
        let last = self.store.load_last_opened_world_id().await?;
        Ok(last.unwrap_or_else(|| DEFAULT_WORLD_ID.to_string()))
    }

    /// Load a world from the store into a layer. A world missing from the
    /// store starts out empty.
    pub async fn load_world(&mut self, layer: &str, id: Option<&str>) -> Result<(), EngineError> {
        self.load_world_with(layer, id, |id| {
            let (w, h) = DEFAULT_WORLD_CELLS;
            WorldRecord::empty(id, w, h)
        })
        .await
    }

    /// Load a world from the store into a layer, building it with `fallback`
    /// when the store does not have it.
    pub async fn load_world_with(
        &mut self,
        layer: &str,
        id: Option<&str>,
        fallback: impl FnOnce(&str) -> WorldRecord,
    ) -> Result<(), EngineError> {
        self.layer_index(layer)?;
        let id = self.resolve_world_id(id).await?;
        let record = match self.store.load(&id).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                warn!("world {id} not found, starting a new one");
                fallback(&id)
            }
            Err(e) => return Err(e.into()),
        };
        let world = TileWorld::load(record, self.scene.assets(), self.config.world_options()).await?;
        self.set_world(layer, world)
    }

    /// Attach an already built world to a layer.
    pub fn set_world(&mut self, layer: &str, world: TileWorld) -> Result<(), EngineError> {
        let i = self.layer_index(layer)?;
        info!(
            "layer {layer}: world {} ({}x{}, {} blocked)",
            world.id(),
            world.grid_width(),
            world.grid_height(),
            world.blocked_count()
        );
        self.layers[i].set_world(world);
        Ok(())
    }

    /// Persist the world of a layer. A layer without a world saves nothing.
    pub async fn save_world(&self, layer: &str) -> Result<bool, EngineError> {
        let i = self.layer_index(layer)?;
        let Some(world) = self.layers[i].world() else {
            return Ok(false);
        };
        world.save(self.store.as_ref()).await?;
        info!("saved world {}", world.id());
        Ok(true)
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one frame at the clock's current time.
    pub fn tick(&mut self) -> (f32, f64) {
        let now = self.clock.now_ms();
        self.tick_at(now)
    }

    /// Run one frame at `now_ms`: update, clear input, draw.
    pub fn tick_at(&mut self, now_ms: f64) -> (f32, f64) {
        let (dt, t) = self.clock.tick(now_ms);

        for layer in &mut self.layers {
            layer.update(&mut self.scene, dt, t, &self.input, &mut self.rng);
        }

        self.input.clear();

        for layer in &mut self.layers {
            layer.draw(&mut self.scene, dt, t);
        }
        (dt, t)
    }

    /// Resize every layer to a new device size.
    pub fn switch_resolution(&mut self, width: f32, height: f32) {
        self.config.display_width = width.max(0.0) as u32;
        self.config.display_height = height.max(0.0) as u32;
        for layer in &mut self.layers {
            layer.resize(width, height);
        }
        debug!("resolution switched to {width}x{height}");
    }

    /// Stop and tear down the scene.
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        self.stop();
        self.scene.clear(self.root)?;
        self.scene.destroy(self.root, None)?;
        self.layers.clear();
        self.player = None;
        Ok(())
    }
}
