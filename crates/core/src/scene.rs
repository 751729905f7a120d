//! Scene graph.
//!
//! Nodes live in a generational arena owned by [`Scene`] and are addressed by
//! [`NodeHandle`]. Parent and child links are handles, never owning pointers.
//!
//! # Lifecycle
//!
//! | Flag | Set by | Cleared by |
//! |------|--------|------------|
//! | `initialized` | `init` (before the setup hook runs) | `destroy` |
//! | `enabled` | `init`, once the setup hook succeeded | `destroy` |
//! | `destroyed` | `destroy` | never |
//!
//! A node is enabled only while it is initialized and not destroyed. Only
//! enabled nodes take part in `update` and `draw`.
//!
//! # Initialization
//!
//! `init` runs each node's setup as a task on a [`JoinSet`]. As soon as a
//! node's setup completes, its uninitialized children are spawned, so siblings
//! initialize concurrently in no particular order, and `init` returns only when
//! the whole subtree has finished. A failing setup rejects that node's subtree
//! only; the first failure is reported once every other task has drained.
//!
//! # Passes
//!
//! `update` and `draw` iterate a snapshot of each child list. Structural edits
//! requested by hooks go through [`SceneCommand`] and are applied with
//! [`Scene::apply_commands`] after the pass.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;
use tilescape_types::SPATIAL_ORDER_OFFSET;
use tokio::task::JoinSet;

use crate::assets::{AssetCache, Image};
use crate::behavior::{Behavior, DrawContext, InitContext, SceneCommand, UpdateContext};
use crate::entity::{MoveStep, Spatial, Sprite};
use crate::error::{AssetError, SceneError};

/// Order given to nodes without a spatial component when none is requested.
pub const DEFAULT_ORDER: i32 = 1;

/// Stable reference to a node in a [`Scene`].
///
/// A handle goes stale once its node is removed; lookups through a stale
/// handle return `None` even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl NodeHandle {
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Parameters of a node to create.
#[derive(Default)]
pub struct NodeBuilder {
    id: Option<String>,
    order: Option<i32>,
    state: Value,
    spatial: Option<Spatial>,
    sprite: Option<Sprite>,
    behavior: Option<Box<dyn Behavior>>,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }

    pub fn with_spatial(mut self, spatial: Spatial) -> Self {
        self.spatial = Some(spatial);
        self
    }

    pub fn with_sprite(mut self, sprite: Sprite) -> Self {
        self.sprite = Some(sprite);
        self
    }

    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }
}

pub struct Node {
    id: String,
    order: i32,
    /// Opaque per-node data
    pub state: Value,
    children: Vec<NodeHandle>,
    parent: Option<NodeHandle>,
    initialized: bool,
    enabled: bool,
    destroyed: bool,
    pub spatial: Option<Spatial>,
    pub sprite: Option<Sprite>,
    behavior: Option<Box<dyn Behavior>>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("order", &self.order)
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("initialized", &self.initialized)
            .field("enabled", &self.enabled)
            .field("destroyed", &self.destroyed)
            .field("spatial", &self.spatial.is_some())
            .field("sprite", &self.sprite.is_some())
            .field("behavior", &self.behavior.is_some())
            .finish()
    }
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Order used when the node is added without an explicit one.
    fn default_order(&self) -> i32 {
        match &self.spatial {
            Some(s) => s.position.z.round() as i32 + SPATIAL_ORDER_OFFSET,
            None => self.order,
        }
    }
}

struct InitOutcome {
    handle: NodeHandle,
    behavior: Option<Box<dyn Behavior>>,
    image: Option<Result<Arc<Image>, AssetError>>,
    result: anyhow::Result<()>,
}

pub struct Scene {
    nodes: Vec<Option<Node>>,
    generations: Vec<u32>,
    free_list: Vec<u32>,
    next_id: u64,
    init_ctx: InitContext,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("live", &self.len())
            .field("free", &self.free_list.len())
            .finish()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_assets(AssetCache::empty())
    }

    /// Scene whose setup hooks and sprites load through `assets`.
    pub fn with_assets(assets: AssetCache) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            next_id: 0,
            init_ctx: InitContext::new(assets),
        }
    }

    pub fn assets(&self) -> &AssetCache {
        &self.init_ctx.assets
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a detached node.
    pub fn create(&mut self, builder: NodeBuilder) -> NodeHandle {
        let id = builder.id.unwrap_or_else(|| {
            let id = format!("__{}", self.next_id);
            self.next_id += 1;
            id
        });
        let node = Node {
            id,
            order: builder.order.unwrap_or(DEFAULT_ORDER),
            state: builder.state,
            children: Vec::new(),
            parent: None,
            initialized: false,
            enabled: false,
            destroyed: false,
            spatial: builder.spatial,
            sprite: builder.sprite,
            behavior: builder.behavior,
        };

        match self.free_list.pop() {
            Some(index) => {
                self.nodes[index as usize] = Some(node);
                NodeHandle::from_raw(index, self.generations[index as usize])
            }
            None => {
                let index = self.nodes.len() as u32;
                self.nodes.push(Some(node));
                self.generations.push(0);
                NodeHandle::from_raw(index, 0)
            }
        }
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        let i = handle.index as usize;
        if self.generations.get(i) != Some(&handle.generation) {
            return None;
        }
        self.nodes.get(i)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        let i = handle.index as usize;
        if self.generations.get(i) != Some(&handle.generation) {
            return None;
        }
        self.nodes.get_mut(i)?.as_mut()
    }

    pub fn is_alive(&self, handle: NodeHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        self.get(handle).map_or(&[], |n| n.children.as_slice())
    }

    fn order_of(&self, handle: NodeHandle) -> i32 {
        self.get(handle).map_or(DEFAULT_ORDER, |n| n.order)
    }

    fn is_ancestor(&self, ancestor: NodeHandle, mut node: NodeHandle) -> bool {
        while let Some(parent) = self.get(node).and_then(|n| n.parent) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    /// Every node below `handle`, depth first.
    pub fn descendants(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeHandle> = self.children(handle).iter().rev().copied().collect();
        while let Some(h) = stack.pop() {
            out.push(h);
            stack.extend(self.children(h).iter().rev().copied());
        }
        out
    }

    /// Attach `child` under `parent`.
    ///
    /// The child is inserted before the first sibling with a greater order, so
    /// equal orders keep their arrival order. Without an explicit `order`, a
    /// spatial node gets `z + 10` and any other node keeps its own order. When
    /// the parent is already initialized the child (or, if the child itself is
    /// initialized, its uninitialized descendants) is initialized before this
    /// returns.
    pub async fn add_child(
        &mut self,
        parent: NodeHandle,
        child: NodeHandle,
        order: Option<i32>,
    ) -> Result<(), SceneError> {
        let p = self.get(parent).ok_or(SceneError::UnknownNode(parent))?;
        if p.destroyed {
            return Err(SceneError::ParentDestroyed(p.id.clone()));
        }
        let parent_initialized = p.initialized;

        let c = self.get(child).ok_or(SceneError::UnknownNode(child))?;
        if c.destroyed {
            return Err(SceneError::Destroyed(c.id.clone()));
        }
        if c.parent.is_some() {
            return Err(SceneError::AlreadyAttached(c.id.clone()));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle(c.id.clone()));
        }
        let order = order.unwrap_or_else(|| c.default_order());
        let child_initialized = c.initialized;

        let siblings = self.children(parent);
        let at = siblings
            .iter()
            .position(|&h| self.order_of(h) > order)
            .unwrap_or(siblings.len());

        if let Some(c) = self.get_mut(child) {
            c.order = order;
            c.parent = Some(parent);
        }
        if let Some(p) = self.get_mut(parent) {
            p.children.insert(at, child);
        }

        if parent_initialized {
            let roots = if child_initialized {
                self.uninitialized_below(child)
            } else {
                vec![child]
            };
            if !roots.is_empty() {
                self.init_subtree(roots).await?;
            }
        }
        Ok(())
    }

    /// Attach several children in order.
    pub async fn add_children(
        &mut self,
        parent: NodeHandle,
        children: &[NodeHandle],
        order: Option<i32>,
    ) -> Result<(), SceneError> {
        for &child in children {
            self.add_child(parent, child, order).await?;
        }
        Ok(())
    }

    /// Topmost uninitialized, live nodes below an initialized node.
    fn uninitialized_below(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        for &child in self.children(handle) {
            match self.get(child) {
                Some(n) if n.destroyed => {}
                Some(n) if !n.initialized => out.push(child),
                Some(_) => out.extend(self.uninitialized_below(child)),
                None => {}
            }
        }
        out
    }

    /// Initialize `handle` and its subtree.
    ///
    /// Calling it on an initialized node is an error and changes nothing.
    pub async fn init(&mut self, handle: NodeHandle) -> Result<(), SceneError> {
        let node = self.get(handle).ok_or(SceneError::UnknownNode(handle))?;
        if node.destroyed {
            return Err(SceneError::Destroyed(node.id.clone()));
        }
        if node.initialized {
            return Err(SceneError::AlreadyInitialized(node.id.clone()));
        }
        self.init_subtree(vec![handle]).await
    }

    async fn init_subtree(&mut self, roots: Vec<NodeHandle>) -> Result<(), SceneError> {
        let mut tasks = JoinSet::new();
        for handle in roots {
            self.start_init(handle, &mut tasks);
        }

        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("init task failed: {e}");
                    first_err.get_or_insert(SceneError::InitTask(e.to_string()));
                    continue;
                }
            };
            match self.finish_init(outcome) {
                Ok(children) => {
                    for child in children {
                        self.start_init(child, &mut tasks);
                    }
                }
                Err(e) => {
                    warn!("{e}");
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start_init(&mut self, handle: NodeHandle, tasks: &mut JoinSet<InitOutcome>) {
        let ctx = self.init_ctx.clone();
        let Some(node) = self.get_mut(handle) else {
            return;
        };
        node.initialized = true;
        let mut behavior = node.behavior.take();
        let image_key = node
            .sprite
            .as_ref()
            .filter(|s| s.image.is_none())
            .and_then(|s| s.image_key.clone());

        tasks.spawn(async move {
            let image = match image_key {
                Some(key) => Some(ctx.assets.load_image(&key).await),
                None => None,
            };
            let result = match behavior.as_mut() {
                Some(b) => b.on_init(&ctx).await,
                None => Ok(()),
            };
            InitOutcome {
                handle,
                behavior,
                image,
                result,
            }
        });
    }

    /// Store the outcome of a setup task. On success the node is enabled and
    /// its children still waiting for init are returned.
    fn finish_init(&mut self, outcome: InitOutcome) -> Result<Vec<NodeHandle>, SceneError> {
        let Some(node) = self.get_mut(outcome.handle) else {
            return Ok(Vec::new());
        };
        node.behavior = outcome.behavior;

        let result = match outcome.image {
            Some(Err(e)) => Err(anyhow::Error::new(e)),
            Some(Ok(image)) => {
                if let Some(sprite) = node.sprite.as_mut() {
                    sprite.image = Some(image);
                }
                outcome.result
            }
            None => outcome.result,
        };
        if let Err(source) = result {
            return Err(SceneError::Init {
                id: node.id.clone(),
                source,
            });
        }

        node.enabled = !node.destroyed;
        debug!("initialized node {}", node.id);
        let children = node.children.clone();
        Ok(children
            .into_iter()
            .filter(|&c| self.get(c).is_some_and(|n| !n.initialized && !n.destroyed))
            .collect())
    }

    /// First node with `id` below `parent`, depth first. Without `recursive`
    /// only direct children are searched.
    pub fn find_child_by_id(&self, parent: NodeHandle, id: &str, recursive: bool) -> Option<NodeHandle> {
        for &child in self.children(parent) {
            let Some(node) = self.get(child) else {
                continue;
            };
            if node.id == id {
                return Some(child);
            }
            if recursive {
                if let Some(found) = self.find_child_by_id(child, id, true) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Mark `handle` destroyed and run its teardown hook. Children are left alone.
    pub fn destroy(&mut self, handle: NodeHandle, payload: Option<Value>) -> Result<(), SceneError> {
        let node = self.get_mut(handle).ok_or(SceneError::UnknownNode(handle))?;
        if node.destroyed {
            return Ok(());
        }
        node.destroyed = true;
        node.enabled = false;
        node.initialized = false;
        if let Some(spatial) = node.spatial.as_mut() {
            spatial.cancel_wander();
        }

        let mut behavior = node.behavior.take();
        if let Some(b) = behavior.as_mut() {
            b.on_destroy(node, payload.as_ref());
        }
        node.behavior = behavior;
        debug!("destroyed node {}", node.id);
        Ok(())
    }

    /// Destroy and detach a direct child, then free its subtree.
    ///
    /// Returns `false` if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<bool, SceneError> {
        let p = self.get(parent).ok_or(SceneError::UnknownNode(parent))?;
        if !p.children.contains(&child) {
            return Ok(false);
        }

        let subtree = self.descendants(child);
        self.destroy(child, None)?;
        for &h in &subtree {
            self.destroy(h, None)?;
        }
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        self.free(child);
        for h in subtree {
            self.free(h);
        }
        Ok(true)
    }

    pub fn remove_child_by_id(&mut self, parent: NodeHandle, id: &str) -> Result<bool, SceneError> {
        match self.find_child_by_id(parent, id, false) {
            Some(child) => self.remove_child(parent, child),
            None => Ok(false),
        }
    }

    /// Remove every child of `parent`.
    pub fn clear(&mut self, parent: NodeHandle) -> Result<(), SceneError> {
        let children = self.children(parent).to_vec();
        for child in children {
            self.remove_child(parent, child)?;
        }
        Ok(())
    }

    fn free(&mut self, handle: NodeHandle) {
        let i = handle.index as usize;
        if self.get(handle).is_none() {
            return;
        }
        self.nodes[i] = None;
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free_list.push(handle.index);
    }

    /// Enable or disable an initialized node. Uninitialized and destroyed
    /// nodes stay disabled.
    pub fn set_enabled(&mut self, handle: NodeHandle, enabled: bool) -> Result<(), SceneError> {
        let node = self.get_mut(handle).ok_or(SceneError::UnknownNode(handle))?;
        node.enabled = enabled && node.initialized && !node.destroyed;
        Ok(())
    }

    /// Update pass: enabled children first (depth first), then the node's hook,
    /// then built-in sprite animation, path movement, wandering and collision.
    pub fn update(&mut self, root: NodeHandle, ctx: &mut UpdateContext<'_>) {
        let children = match self.get(root) {
            Some(n) if n.enabled => n.children.clone(),
            _ => return,
        };
        for child in children {
            if self.get(child).is_some_and(|n| n.enabled) {
                self.update(child, ctx);
            }
        }

        let Some(node) = self.get_mut(root) else {
            return;
        };
        let previous = node.spatial.as_ref().map(|s| s.position.clone());

        ctx.current = root;
        let mut behavior = node.behavior.take();
        if let Some(b) = behavior.as_mut() {
            b.on_update(node, ctx);
        }
        node.behavior = behavior;

        if let Some(sprite) = node.sprite.as_mut() {
            sprite.advance(ctx.t);
        }

        let (Some(spatial), Some(world), Some(previous)) = (node.spatial.as_mut(), ctx.world, previous) else {
            return;
        };
        match spatial.check_auto_movement(ctx.dt, world) {
            MoveStep::Arrived if spatial.is_self => ctx.push(SceneCommand::UnsetHighlight),
            MoveStep::Arrived if spatial.params.move_radius > 0 => spatial.schedule_wander(ctx.t, ctx.rng),
            _ => {}
        }
        if !spatial.is_self {
            // Idle wanderers that never walked still need a first re-roll.
            let idle = spatial.move_path.is_empty() && spatial.wander_at_ms().is_none();
            if idle && spatial.params.move_radius > 0 {
                spatial.schedule_wander(ctx.t, ctx.rng);
            }
            spatial.wander(world, ctx.rng, ctx.t);
        }
        let (w, h) = (spatial.width, spatial.height);
        world.normalize_position(&mut spatial.position, w, h, &previous);
    }

    /// Draw pass: own appearance, then enabled children in view, then the
    /// node's hook. Spatial children outside the camera view are culled;
    /// without a camera everything is drawn.
    pub fn draw(&mut self, root: NodeHandle, ctx: &mut DrawContext<'_>) {
        let Some(node) = self.get(root) else {
            return;
        };
        if !node.enabled {
            return;
        }
        let offset = node.spatial.as_ref().map_or((0.0, 0.0), |s| s.offset);
        let children = node.children.clone();

        ctx.surface.save();
        ctx.surface.translate(offset.0, offset.1);
        draw_appearance(node, ctx);

        for child in children {
            let visible = match self.get(child) {
                Some(c) if c.enabled => match (&c.spatial, ctx.camera) {
                    (Some(s), Some(camera)) => camera.is_in_view_by_spatial(s),
                    _ => true,
                },
                _ => false,
            };
            if visible {
                self.draw(child, ctx);
            }
        }

        if let Some(node) = self.get_mut(root) {
            let mut behavior = node.behavior.take();
            if let Some(b) = behavior.as_mut() {
                b.on_draw(node, ctx);
            }
            node.behavior = behavior;
        }
        ctx.surface.restore();
    }

    /// Apply queued tree edits. Commands aimed at the world (highlight) are
    /// returned for the caller.
    pub fn apply_commands(&mut self, commands: Vec<SceneCommand>) -> Vec<SceneCommand> {
        let mut rest = Vec::new();
        for command in commands {
            let applied = match &command {
                SceneCommand::RemoveChild { parent, child } => self.remove_child(*parent, *child).map(|_| ()),
                SceneCommand::RemoveChildById { parent, id } => self.remove_child_by_id(*parent, id).map(|_| ()),
                SceneCommand::Clear(parent) => self.clear(*parent),
                SceneCommand::Destroy { node, payload } => self.destroy(*node, payload.clone()),
                SceneCommand::SetHighlight(_) | SceneCommand::UnsetHighlight => {
                    rest.push(command);
                    continue;
                }
            };
            if let Err(e) = applied {
                debug!("skipped {command:?}: {e}");
            }
        }
        rest
    }
}

fn draw_appearance(node: &Node, ctx: &mut DrawContext<'_>) {
    let Some(spatial) = &node.spatial else {
        if let Some(sprite) = &node.sprite {
            if let Some(image) = &sprite.image {
                let dst = sprite.dst_rect(sprite.draw_w / 2.0, sprite.draw_h / 2.0);
                ctx.surface.draw_image(image, sprite.src_rect(), dst);
            }
        }
        return;
    };

    let sprite = node.sprite.as_ref().and_then(|s| s.image.as_ref().map(|img| (s, img)));
    match sprite {
        Some((sprite, image)) => {
            let dst = sprite.dst_rect(spatial.position.x, spatial.position.z);
            ctx.surface.draw_image(image, sprite.src_rect(), dst);
        }
        None => ctx.surface.fill_rect(spatial.bounds(), spatial.color),
    }

    if spatial.is_self && spatial.draw_destination {
        if let Some(world) = ctx.world {
            for (step, &index) in spatial.move_path.iter().enumerate() {
                if let Some(tile) = world.tile(index) {
                    ctx.surface.stroke_rect(tile.rect(), spatial.color);
                    let label = (step + 1).to_string();
                    ctx.surface.fill_text(&label, tile.x + 2.0, tile.z + 2.0, spatial.color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Asset;
    use crate::camera::Camera;
    use crate::rng::SimpleRng;
    use crate::surface::{DrawOp, RecordingSurface};
    use crate::world::TileWorld;
    use crate::BoxFuture;
    use std::sync::Mutex;
    use std::time::Duration;
    use tilescape_types::{Color, InputState, Rect, TileCatalog, WorldRecord};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        fail: bool,
        delay_ms: u64,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                fail: false,
                delay_ms: 0,
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn slow(mut self, ms: u64) -> Self {
            self.delay_ms = ms;
            self
        }
    }

    impl Behavior for Recorder {
        fn on_init<'a>(&'a mut self, _ctx: &'a InitContext) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async move {
                if self.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
                }
                self.log.lock().unwrap().push(format!("init {}", self.name));
                if self.fail {
                    anyhow::bail!("{} refused", self.name);
                }
                Ok(())
            })
        }

        fn on_update(&mut self, _node: &mut Node, _ctx: &mut UpdateContext<'_>) {
            self.log.lock().unwrap().push(format!("update {}", self.name));
        }

        fn on_draw(&mut self, _node: &Node, _ctx: &mut DrawContext<'_>) {
            self.log.lock().unwrap().push(format!("draw {}", self.name));
        }

        fn on_destroy(&mut self, _node: &mut Node, payload: Option<&Value>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("destroy {} {:?}", self.name, payload));
        }
    }

    fn recorder(scene: &mut Scene, name: &'static str, log: &Log) -> NodeHandle {
        scene.create(NodeBuilder::new().with_id(name).with_behavior(Recorder::new(name, log)))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn ids(scene: &Scene, parent: NodeHandle) -> Vec<String> {
        scene
            .children(parent)
            .iter()
            .map(|&h| scene.get(h).unwrap().id().to_string())
            .collect()
    }

    #[tokio::test]
    async fn children_stay_sorted_with_stable_ties() {
        let mut scene = Scene::new();
        let root = scene.create(NodeBuilder::new().with_id("root"));
        for (id, order) in [("a", 5), ("b", 1), ("c", 5), ("d", 3), ("e", 1)] {
            let h = scene.create(NodeBuilder::new().with_id(id));
            scene.add_child(root, h, Some(order)).await.unwrap();
        }
        assert_eq!(ids(&scene, root), vec!["b", "e", "d", "a", "c"]);
    }

    #[tokio::test]
    async fn spatial_nodes_default_to_depth_order() {
        let mut scene = Scene::new();
        let root = scene.create(NodeBuilder::new());
        let deep = scene.create(NodeBuilder::new().with_id("deep").with_spatial(Spatial::new(0.0, 90.0, 8.0, 8.0)));
        let shallow = scene.create(NodeBuilder::new().with_id("shallow").with_spatial(Spatial::new(0.0, 5.0, 8.0, 8.0)));
        let plain = scene.create(NodeBuilder::new().with_id("plain").with_order(50));
        scene.add_children(root, &[deep, shallow, plain], None).await.unwrap();

        assert_eq!(scene.get(shallow).unwrap().order(), 15);
        assert_eq!(scene.get(deep).unwrap().order(), 100);
        assert_eq!(ids(&scene, root), vec!["shallow", "plain", "deep"]);
    }

    #[tokio::test]
    async fn generated_ids_are_unique() {
        let mut scene = Scene::new();
        let a = scene.create(NodeBuilder::new());
        let b = scene.create(NodeBuilder::new());
        assert_eq!(scene.get(a).unwrap().id(), "__0");
        assert_eq!(scene.get(b).unwrap().id(), "__1");
    }

    #[tokio::test]
    async fn init_twice_fails_without_side_effects() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = recorder(&mut scene, "root", &log);
        scene.init(root).await.unwrap();
        assert_eq!(entries(&log), vec!["init root"]);

        let err = scene.init(root).await.unwrap_err();
        assert!(matches!(err, SceneError::AlreadyInitialized(ref id) if id == "root"));
        assert_eq!(entries(&log), vec!["init root"]);
        assert!(scene.get(root).unwrap().is_enabled());
    }

    #[tokio::test]
    async fn init_covers_the_whole_subtree_concurrently() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = recorder(&mut scene, "root", &log);
        let slow = scene.create(NodeBuilder::new().with_id("slow").with_behavior(Recorder::new("slow", &log).slow(30)));
        let fast = recorder(&mut scene, "fast", &log);
        let leaf = recorder(&mut scene, "leaf", &log);
        scene.add_child(root, slow, None).await.unwrap();
        scene.add_child(root, fast, None).await.unwrap();
        scene.add_child(slow, leaf, None).await.unwrap();

        scene.init(root).await.unwrap();
        let log = entries(&log);
        assert_eq!(log[0], "init root");
        assert_eq!(log.last().map(String::as_str), Some("init leaf"));
        assert!(log.iter().position(|e| e == "init fast") < log.iter().position(|e| e == "init slow"));
        for h in [root, slow, fast, leaf] {
            assert!(scene.get(h).unwrap().is_enabled());
        }
    }

    #[tokio::test]
    async fn adding_to_a_running_tree_initializes_immediately() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = recorder(&mut scene, "root", &log);
        scene.init(root).await.unwrap();

        let branch = recorder(&mut scene, "branch", &log);
        let twig = recorder(&mut scene, "twig", &log);
        scene.add_child(branch, twig, None).await.unwrap();
        assert!(!scene.get(twig).unwrap().is_initialized());

        scene.add_child(root, branch, None).await.unwrap();
        assert!(scene.get(branch).unwrap().is_enabled());
        assert!(scene.get(twig).unwrap().is_enabled());
    }

    #[tokio::test]
    async fn failing_setup_rejects_only_its_subtree() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = recorder(&mut scene, "root", &log);
        let bad = scene.create(NodeBuilder::new().with_id("bad").with_behavior(Recorder::new("bad", &log).failing()));
        let below_bad = recorder(&mut scene, "below_bad", &log);
        let good = recorder(&mut scene, "good", &log);
        scene.add_child(bad, below_bad, None).await.unwrap();
        scene.add_children(root, &[bad, good], None).await.unwrap();

        let err = scene.init(root).await.unwrap_err();
        assert!(matches!(err, SceneError::Init { ref id, .. } if id == "bad"));
        assert!(scene.get(good).unwrap().is_enabled());
        assert!(!scene.get(bad).unwrap().is_enabled());
        assert!(!scene.get(below_bad).unwrap().is_initialized());
    }

    #[tokio::test]
    async fn missing_sprite_image_fails_init() {
        let mut scene = Scene::new();
        let node = scene.create(NodeBuilder::new().with_sprite(Sprite::new("ghost.png", 8.0, 8.0)));
        let err = scene.init(node).await.unwrap_err();
        assert!(matches!(err, SceneError::Init { .. }));
    }

    #[tokio::test]
    async fn sprite_image_is_resolved_during_init() {
        let assets = AssetCache::empty();
        let image = Arc::new(Image::solid("hero.png", 8, 8, Color::BLUE));
        assets.insert("hero.png", Asset::Image(image.clone()));
        let mut scene = Scene::with_assets(assets);
        let node = scene.create(NodeBuilder::new().with_sprite(Sprite::new("hero.png", 8.0, 8.0)));
        scene.init(node).await.unwrap();
        assert_eq!(scene.get(node).unwrap().sprite.as_ref().unwrap().image, Some(image));
    }

    #[tokio::test]
    async fn misuse_of_add_child_is_rejected() {
        let mut scene = Scene::new();
        let root = scene.create(NodeBuilder::new().with_id("root"));
        let child = scene.create(NodeBuilder::new().with_id("child"));
        let grandchild = scene.create(NodeBuilder::new().with_id("grandchild"));
        scene.add_child(root, child, None).await.unwrap();
        scene.add_child(child, grandchild, None).await.unwrap();

        let other = scene.create(NodeBuilder::new());
        assert!(matches!(
            scene.add_child(other, child, None).await,
            Err(SceneError::AlreadyAttached(_))
        ));
        assert!(matches!(
            scene.add_child(grandchild, root, None).await,
            Err(SceneError::Cycle(_))
        ));

        scene.destroy(other, None).unwrap();
        let orphan = scene.create(NodeBuilder::new());
        assert!(matches!(
            scene.add_child(other, orphan, None).await,
            Err(SceneError::ParentDestroyed(_))
        ));
    }

    #[tokio::test]
    async fn find_child_by_id_searches_depth_first() {
        let mut scene = Scene::new();
        let root = scene.create(NodeBuilder::new());
        let a = scene.create(NodeBuilder::new().with_id("a"));
        let deep = scene.create(NodeBuilder::new().with_id("target"));
        let shallow = scene.create(NodeBuilder::new().with_id("target"));
        scene.add_child(root, a, Some(1)).await.unwrap();
        scene.add_child(a, deep, None).await.unwrap();
        scene.add_child(root, shallow, Some(2)).await.unwrap();

        assert_eq!(scene.find_child_by_id(root, "target", true), Some(deep));
        assert_eq!(scene.find_child_by_id(root, "target", false), Some(shallow));
        assert_eq!(scene.find_child_by_id(root, "nope", true), None);
    }

    #[tokio::test]
    async fn find_child_by_id_skips_freed_children() {
        let mut scene = Scene::new();
        let root = scene.create(NodeBuilder::new());
        let gone = scene.create(NodeBuilder::new().with_id("gone"));
        let kept = scene.create(NodeBuilder::new().with_id("kept"));
        scene.add_children(root, &[gone, kept], None).await.unwrap();
        scene.free(gone);

        assert_eq!(scene.find_child_by_id(root, "kept", false), Some(kept));
        assert_eq!(scene.find_child_by_id(root, "kept", true), Some(kept));
    }

    #[tokio::test]
    async fn destroy_is_not_recursive() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = recorder(&mut scene, "root", &log);
        let child = recorder(&mut scene, "child", &log);
        scene.add_child(root, child, None).await.unwrap();
        scene.init(root).await.unwrap();

        scene.destroy(root, Some(Value::from(7))).unwrap();
        let node = scene.get(root).unwrap();
        assert!(node.is_destroyed() && !node.is_enabled() && !node.is_initialized());
        assert!(scene.get(child).unwrap().is_enabled());
        assert!(entries(&log).contains(&"destroy root Some(Number(7))".to_string()));
        assert!(matches!(scene.init(root).await, Err(SceneError::Destroyed(_))));
    }

    #[tokio::test]
    async fn remove_child_destroys_and_frees_the_subtree() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = recorder(&mut scene, "root", &log);
        let child = recorder(&mut scene, "child", &log);
        let grandchild = recorder(&mut scene, "grandchild", &log);
        scene.add_child(root, child, None).await.unwrap();
        scene.add_child(child, grandchild, None).await.unwrap();

        assert!(scene.remove_child_by_id(root, "child").unwrap());
        assert!(scene.children(root).is_empty());
        assert!(!scene.is_alive(child) && !scene.is_alive(grandchild));
        assert!(entries(&log).contains(&"destroy grandchild None".to_string()));
        assert!(!scene.remove_child(root, child).unwrap());

        let reused = scene.create(NodeBuilder::new());
        assert!(scene.is_alive(reused));
        assert!(!scene.is_alive(child) && !scene.is_alive(grandchild));
    }

    #[tokio::test]
    async fn clear_removes_every_child() {
        let mut scene = Scene::new();
        let root = scene.create(NodeBuilder::new());
        for _ in 0..3 {
            let h = scene.create(NodeBuilder::new());
            scene.add_child(root, h, None).await.unwrap();
        }
        scene.clear(root).unwrap();
        assert!(scene.children(root).is_empty());
        assert_eq!(scene.len(), 1);
    }

    #[tokio::test]
    async fn update_visits_children_before_parent() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = recorder(&mut scene, "root", &log);
        let a = recorder(&mut scene, "a", &log);
        let b = recorder(&mut scene, "b", &log);
        let a1 = recorder(&mut scene, "a1", &log);
        scene.add_children(root, &[a, b], None).await.unwrap();
        scene.add_child(a, a1, None).await.unwrap();
        scene.init(root).await.unwrap();
        scene.set_enabled(b, false).unwrap();
        log.lock().unwrap().clear();

        let input = InputState::new();
        let mut rng = SimpleRng::new(1);
        let mut ctx = UpdateContext::new(0.016, 16.0, &input, &mut rng);
        scene.update(root, &mut ctx);
        assert_eq!(entries(&log), vec!["update a1", "update a", "update root"]);
    }

    #[tokio::test]
    async fn idle_wanderer_starts_walking_on_its_own() {
        let world = TileWorld::new(WorldRecord::empty("open", 16, 16), TileCatalog::default()).unwrap();
        let mut spatial = Spatial::new(0.0, 0.0, 32.0, 32.0);
        spatial.set_position_by_grid(8, 8, 0.0, &world);
        spatial.params.move_radius = 4;
        spatial.params.move_delay_ms = 500;

        let mut scene = Scene::new();
        let root = scene.create(NodeBuilder::new());
        let npc = scene.create(NodeBuilder::new().with_spatial(spatial));
        scene.add_child(root, npc, None).await.unwrap();
        scene.init(root).await.unwrap();

        let input = InputState::new();
        let mut rng = SimpleRng::new(9);
        let mut ctx = UpdateContext::new(0.016, 0.0, &input, &mut rng).with_world(Some(&world));
        scene.update(root, &mut ctx);
        let first = scene.get(npc).unwrap().spatial.as_ref().unwrap();
        assert!(first.wander_at_ms().is_some() || !first.move_path.is_empty());

        let mut walked = false;
        for tick in 1..=200 {
            let mut ctx = UpdateContext::new(0.016, tick as f64 * 16.0, &input, &mut rng).with_world(Some(&world));
            scene.update(root, &mut ctx);
            let s = scene.get(npc).unwrap().spatial.as_ref().unwrap();
            walked |= !s.move_path.is_empty() || (s.position.gx, s.position.gz) != (8, 8);
        }
        assert!(walked, "an entity that never had a path still wanders");
    }

    #[tokio::test]
    async fn draw_culls_spatial_children_outside_the_view() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = recorder(&mut scene, "root", &log);
        let near = scene.create(
            NodeBuilder::new()
                .with_spatial(Spatial::new(50.0, 50.0, 10.0, 10.0).with_color(Color::GREEN))
                .with_behavior(Recorder::new("near", &log)),
        );
        let far = scene.create(
            NodeBuilder::new()
                .with_spatial(Spatial::new(900.0, 900.0, 10.0, 10.0))
                .with_behavior(Recorder::new("far", &log)),
        );
        scene.add_children(root, &[near, far], None).await.unwrap();
        scene.init(root).await.unwrap();
        log.lock().unwrap().clear();

        let camera = Camera::new(200.0, 200.0, 1000.0, 1000.0);
        let mut surface = RecordingSurface::new(200.0, 200.0);
        let mut ctx = DrawContext {
            surface: &mut surface,
            camera: Some(&camera),
            world: None,
            dt: 0.016,
            t: 16.0,
        };
        scene.draw(root, &mut ctx);
        assert_eq!(entries(&log), vec!["draw near", "draw root"]);
        assert!(surface
            .ops()
            .contains(&DrawOp::Fill(Rect::new(45.0, 45.0, 10.0, 10.0), Color::GREEN)));
        assert_eq!(surface.transform_depth(), 0);

        log.lock().unwrap().clear();
        let mut ctx = DrawContext {
            surface: &mut surface,
            camera: None,
            world: None,
            dt: 0.016,
            t: 32.0,
        };
        scene.draw(root, &mut ctx);
        assert_eq!(entries(&log), vec!["draw near", "draw far", "draw root"]);
    }

    #[tokio::test]
    async fn queued_commands_apply_after_the_pass() {
        let mut scene = Scene::new();
        let root = scene.create(NodeBuilder::new());
        let a = scene.create(NodeBuilder::new().with_id("a"));
        let b = scene.create(NodeBuilder::new().with_id("b"));
        scene.add_children(root, &[a, b], None).await.unwrap();

        let rest = scene.apply_commands(vec![
            SceneCommand::RemoveChildById {
                parent: root,
                id: "a".into(),
            },
            SceneCommand::SetHighlight(3),
            SceneCommand::Destroy { node: b, payload: None },
            SceneCommand::RemoveChild { parent: root, child: a },
        ]);
        assert_eq!(rest, vec![SceneCommand::SetHighlight(3)]);
        assert!(!scene.is_alive(a));
        assert!(scene.get(b).unwrap().is_destroyed());
    }

}
