//! Core engine module - scene graph, tile world and camera
//!
//! This crate contains the engine logic: the node tree and its lifecycle, the
//! tile world with occupancy blocking and pathfinding, and the viewport camera.
//! It draws through the [`Surface`] trait and loads data through the
//! [`AssetProvider`] and [`WorldStore`] traits, so it runs the same way in a
//! terminal, headless, or in tests.
//!
//! - **Single-threaded frames**: `update` and `draw` are synchronous and never suspend
//! - **Async setup only**: node `init` is the one place that awaits (asset loads)
//! - **Arena ownership**: nodes are addressed by generational handles, no back-pointers
//! - **Deterministic**: all randomness goes through a seeded [`SimpleRng`]
//!
//! # Module Structure
//!
//! - [`scene`]: node arena, lifecycle (`init` / `destroy`), update and draw passes
//! - [`behavior`]: lifecycle hook trait and the contexts passed to hooks
//! - [`entity`]: spatial component (position, path movement, wandering) and sprites
//! - [`player`]: keyboard and pointer steering of the local player
//! - [`world`]: tile grid, footprint blocking, path queries, pointer selection
//! - [`pathfinding`]: A* over the binary occupancy grid
//! - [`camera`]: viewport with dead-zone following and world clamping
//! - [`layer`]: surface + camera + world bound to a subtree
//! - [`assets`]: asset cache over pluggable providers
//! - [`store`]: world persistence
//! - [`surface`]: drawing surface trait and a recording implementation
//! - [`tween`], [`rng`]: easing and seeded randomness
//!
//! # Frame
//!
//! | Step | Call |
//! |------|------|
//! | pointer selection | [`TileWorld::check_pointer`] |
//! | update pass | [`Scene::update`] (children first, then hook, then movement) |
//! | deferred edits | [`Scene::apply_commands`] |
//! | camera | [`Camera::advance`], [`Camera::update_position`] |
//! | draw pass | [`Layer::draw`] |
//!
//! [`Layer`] runs these steps for its subtree.
//!
//! # Example
//!
//! ```
//! use tilescape_core::{find_path, PathGrid, TileWorld};
//! use tilescape_core::types::{TileCatalog, TileDef, WorldRecord};
//!
//! let mut record = WorldRecord::empty("demo", 4, 4);
//! record.set_tile(1, 1, 7);
//! let world = TileWorld::new(record, TileCatalog::new(vec![TileDef::new(7)])).unwrap();
//! assert_eq!(world.tile(5).unwrap().blocked_by, Some(5));
//!
//! let path = world.path_between((0, 0), (3, 3));
//! assert_eq!(path.last(), Some(&15));
//! assert!(!path.contains(&5));
//!
//! let mut grid = PathGrid::new(3, 1);
//! grid.set_blocked(1, 0, true);
//! assert!(find_path(&grid, (0, 0), (2, 0)).is_empty());
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod assets;
pub mod behavior;
pub mod camera;
pub mod entity;
pub mod error;
pub mod layer;
pub mod pathfinding;
pub mod player;
pub mod rng;
pub mod scene;
pub mod store;
pub mod surface;
pub mod tween;
pub mod world;

pub use tilescape_types as types;

/// Boxed future returned by the async trait methods of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export commonly used types for convenience
pub use assets::{Asset, AssetCache, AssetProvider, AudioHandle, DirAssetProvider, Image, MemoryAssetProvider, TileSheet};
pub use behavior::{Behavior, DrawContext, InitContext, SceneCommand, UpdateContext};
pub use camera::Camera;
pub use entity::{BehaviorParams, MoveStep, Position, Spatial, Sprite};
pub use error::{AssetError, SceneError, StoreError, WorldError};
pub use layer::Layer;
pub use pathfinding::{find_path, PathGrid};
pub use player::PlayerController;
pub use rng::SimpleRng;
pub use scene::{Node, NodeBuilder, NodeHandle, Scene};
pub use store::{JsonDirStore, MemoryWorldStore, WorldStore};
pub use surface::{DrawOp, RecordingSurface, Surface, Transform, TransformStack};
pub use tween::{Easing, Tween};
pub use world::{RenderObject, Tile, TileWorld, WorldOptions, WorldState};
