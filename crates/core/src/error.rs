use thiserror::Error;

use crate::scene::NodeHandle;

/// Errors raised by the scene arena and node lifecycle.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("node {0} is already initialized")]
    AlreadyInitialized(String),

    #[error("node {0} is destroyed")]
    Destroyed(String),

    #[error("cannot add a child to destroyed node {0}")]
    ParentDestroyed(String),

    #[error("node {0} already has a parent")]
    AlreadyAttached(String),

    #[error("unknown node handle {0:?}")]
    UnknownNode(NodeHandle),

    #[error("init of node {id} failed: {source}")]
    Init {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("node {0} would become its own ancestor")]
    Cycle(String),

    #[error("init task failed: {0}")]
    InitTask(String),
}

/// Errors raised while fetching or decoding assets.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("IO error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error("invalid JSON in {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("asset {key} is not {expected}")]
    WrongKind { key: String, expected: &'static str },
}

/// Errors raised by world persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("world not found: {0}")]
    NotFound(String),
}

/// Errors raised by tile world loading.
#[derive(Error, Debug)]
pub enum WorldError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("world {id} has {actual} tiles, expected {expected}")]
    TileCount {
        id: String,
        expected: usize,
        actual: usize,
    },
}
