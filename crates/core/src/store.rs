//! World persistence.
//!
//! [`JsonDirStore`] writes one pretty-printed JSON file per world
//! (`<dir>/<id>.json`) and remembers the last opened world in
//! `<dir>/last_opened`. [`MemoryWorldStore`] keeps everything in memory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use log::info;
use tilescape_types::WorldRecord;

use crate::error::StoreError;
use crate::BoxFuture;

const LAST_OPENED_FILE: &str = "last_opened";

/// Persistence provider for world records.
pub trait WorldStore: Send + Sync {
    fn save<'a>(&'a self, record: &'a WorldRecord) -> BoxFuture<'a, Result<(), StoreError>>;
    fn load<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<WorldRecord, StoreError>>;
    fn load_last_opened_world_id(&self) -> BoxFuture<'_, Result<Option<String>, StoreError>>;
    fn store_last_opened_world_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;
}

#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn world_path(&self, id: &str) -> PathBuf {
        // World ids become file names; keep them flat.
        let safe: String = id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl WorldStore for JsonDirStore {
    fn save<'a>(&'a self, record: &'a WorldRecord) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir).await?;
            let json = serde_json::to_vec_pretty(record)?;
            let path = self.world_path(&record.id);
            tokio::fs::write(&path, json).await?;
            info!("saved world {} to {}", record.id, path.display());
            Ok(())
        })
    }

    fn load<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<WorldRecord, StoreError>> {
        Box::pin(async move {
            let bytes = match tokio::fs::read(self.world_path(id)).await {
                Ok(b) => b,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(StoreError::NotFound(id.to_string()))
                }
                Err(e) => return Err(e.into()),
            };
            Ok(serde_json::from_slice(&bytes)?)
        })
    }

    fn load_last_opened_world_id(&self) -> BoxFuture<'_, Result<Option<String>, StoreError>> {
        Box::pin(async move {
            match tokio::fs::read_to_string(self.dir.join(LAST_OPENED_FILE)).await {
                Ok(s) => {
                    let id = s.trim();
                    Ok((!id.is_empty()).then(|| id.to_string()))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn store_last_opened_world_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(self.dir.join(LAST_OPENED_FILE), id).await?;
            Ok(())
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryWorldStore {
    worlds: Mutex<HashMap<String, WorldRecord>>,
    last_opened: Mutex<Option<String>>,
}

impl MemoryWorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.worlds.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WorldStore for MemoryWorldStore {
    fn save<'a>(&'a self, record: &'a WorldRecord) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.worlds
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(record.id.clone(), record.clone());
            Ok(())
        })
    }

    fn load<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<WorldRecord, StoreError>> {
        Box::pin(async move {
            self.worlds
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(id.to_string()))
        })
    }

    fn load_last_opened_world_id(&self) -> BoxFuture<'_, Result<Option<String>, StoreError>> {
        Box::pin(async move { Ok(self.last_opened.lock().unwrap_or_else(|e| e.into_inner()).clone()) })
    }

    fn store_last_opened_world_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            *self.last_opened.lock().unwrap_or_else(|e| e.into_inner()) = Some(id.to_string());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_dir_store_round_trips_and_remembers_last_opened() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());

        assert_eq!(store.load_last_opened_world_id().await.unwrap(), None);

        let mut record = WorldRecord::empty("meadow", 3, 2);
        record.set_tile(1, 1, 4);
        store.save(&record).await.unwrap();
        store.store_last_opened_world_id("meadow").await.unwrap();

        assert_eq!(store.load("meadow").await.unwrap(), record);
        assert_eq!(
            store.load_last_opened_world_id().await.unwrap().as_deref(),
            Some("meadow")
        );
    }

    #[tokio::test]
    async fn missing_world_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());
        assert!(matches!(
            store.load("ghost").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn memory_store_saves_by_id() {
        let store = MemoryWorldStore::new();
        store.save(&WorldRecord::empty("a", 1, 1)).await.unwrap();
        store.save(&WorldRecord::empty("a", 2, 2)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("a").await.unwrap().width, 2);
    }
}
