//! Asset loading and caching.
//!
//! An [`AssetProvider`] fetches raw bytes by key; [`AssetCache`] decodes them by
//! file extension and caches the result under the normalized key:
//!
//! | Extension | Decoded as |
//! |-----------|------------|
//! | `png`, `jpg`, `jpeg`, `bmp` | [`Image`] (RGBA pixels) |
//! | `mp3`, `ogg`, `wav` | [`AudioHandle`] (playback is left to the host) |
//! | anything else | JSON value |
//!
//! Tile catalogs are a pair of files, `<name>.json` and `<name>.png`, fetched
//! concurrently and cached together as a [`TileSheet`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use tilescape_types::{Color, FrameRect, Rect, TileCatalog};

use crate::error::AssetError;
use crate::BoxFuture;

/// Decoded RGBA image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    key: String,
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Image {
    /// Build an image from row-major pixels. Missing pixels are transparent.
    pub fn from_pixels(key: impl Into<String>, width: u32, height: u32, mut pixels: Vec<Color>) -> Self {
        pixels.resize((width as usize) * (height as usize), Color::default());
        Self {
            key: key.into(),
            width,
            height,
            pixels,
        }
    }

    /// Solid single-color image.
    pub fn solid(key: impl Into<String>, width: u32, height: u32, color: Color) -> Self {
        let pixels = vec![color; (width as usize) * (height as usize)];
        Self::from_pixels(key, width, height, pixels)
    }

    /// Decode PNG/JPEG/BMP bytes.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes).map_err(|e| AssetError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba
            .pixels()
            .map(|p| Color::rgba(p[0], p[1], p[2], p[3]))
            .collect();
        Ok(Self::from_pixels(key, width, height, pixels))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get((y as usize) * (self.width as usize) + (x as usize))
            .copied()
    }

    /// Sample the pixel at fractional position `(u, v)` of `src` (both in `[0, 1)`).
    ///
    /// Returns `None` for fully transparent or out-of-image samples.
    pub fn sample(&self, src: Rect, u: f32, v: f32) -> Option<Color> {
        let x = (src.left + src.width * u.clamp(0.0, 1.0)).floor();
        let y = (src.top + src.height * v.clamp(0.0, 1.0)).floor();
        if x < 0.0 || y < 0.0 {
            return None;
        }
        self.pixel(x as u32, y as u32).filter(|c| c.a > 0)
    }

    /// Full image bounds.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

/// Handle to a loaded audio clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioHandle {
    pub key: String,
    pub volume: f32,
    pub byte_len: usize,
}

/// Tile catalog together with its sprite sheet.
#[derive(Debug, Clone)]
pub struct TileSheet {
    pub name: String,
    pub catalog: TileCatalog,
    pub image: Arc<Image>,
}

impl TileSheet {
    /// Source rect of a frame on the sheet.
    pub fn frame_rect(frame: &FrameRect) -> Rect {
        Rect::new(frame.x as f32, frame.y as f32, frame.w as f32, frame.h as f32)
    }
}

/// Decoded, cacheable asset.
#[derive(Debug, Clone)]
pub enum Asset {
    Image(Arc<Image>),
    Json(Arc<serde_json::Value>),
    Audio(Arc<AudioHandle>),
    TileSheet(Arc<TileSheet>),
}

/// Source of raw asset bytes.
pub trait AssetProvider: Send + Sync {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>>;
}

/// Reads assets from a directory with `tokio::fs`.
#[derive(Debug, Clone)]
pub struct DirAssetProvider {
    root: PathBuf,
}

impl DirAssetProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl AssetProvider for DirAssetProvider {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>> {
        Box::pin(async move {
            let path = self.root.join(key);
            tokio::fs::read(&path).await.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AssetError::NotFound(key.to_string()),
                _ => AssetError::Io {
                    key: key.to_string(),
                    source: e,
                },
            })
        })
    }
}

/// In-memory provider, mostly for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetProvider {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssetProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.files.insert(normalize_key(key), bytes.into());
    }

    pub fn with_file(mut self, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(key, bytes);
        self
    }

    pub fn with_json(self, key: &str, value: &serde_json::Value) -> Self {
        let bytes = value.to_string().into_bytes();
        self.with_file(key, bytes)
    }
}

impl AssetProvider for MemoryAssetProvider {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>> {
        Box::pin(async move {
            self.files
                .get(&normalize_key(key))
                .cloned()
                .ok_or_else(|| AssetError::NotFound(key.to_string()))
        })
    }
}

/// Normalize an asset key: forward slashes, no leading `./` or `/`, no repeated `/`.
pub fn normalize_key(key: &str) -> String {
    let key = key.replace('\\', "/");
    let mut out = String::with_capacity(key.len());
    for part in key.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(part);
    }
    out
}

fn extension(key: &str) -> String {
    key.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Shared, cloneable asset cache.
#[derive(Clone)]
pub struct AssetCache {
    provider: Arc<dyn AssetProvider>,
    cache: Arc<Mutex<HashMap<String, Asset>>>,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("cached", &self.lock().len())
            .finish()
    }
}

impl AssetCache {
    pub fn new(provider: Arc<dyn AssetProvider>) -> Self {
        Self {
            provider,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Cache over an empty in-memory provider.
    pub fn empty() -> Self {
        Self::new(Arc::new(MemoryAssetProvider::new()))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Asset>> {
        // A poisoned map is still a valid map.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get_cached(&self, key: &str) -> Option<Asset> {
        self.lock().get(&normalize_key(key)).cloned()
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.lock().contains_key(&normalize_key(key))
    }

    pub fn remove_from_cache(&self, key: &str) -> Option<Asset> {
        self.lock().remove(&normalize_key(key))
    }

    pub fn clear_cache(&self) {
        self.lock().clear();
    }

    /// Insert an already decoded asset.
    pub fn insert(&self, key: &str, asset: Asset) {
        self.lock().insert(normalize_key(key), asset);
    }

    /// Load and cache an asset, returning the cached copy when present.
    pub async fn load(&self, key: &str) -> Result<Asset, AssetError> {
        self.load_with(key, true, false).await
    }

    /// Load, bypassing and refreshing the cache.
    pub async fn reload(&self, key: &str) -> Result<Asset, AssetError> {
        self.load_with(key, true, true).await
    }

    pub async fn load_with(&self, key: &str, cache: bool, reload: bool) -> Result<Asset, AssetError> {
        let key = normalize_key(key);
        if !reload {
            if let Some(asset) = self.get_cached(&key) {
                return Ok(asset);
            }
        }

        let bytes = self.provider.fetch(&key).await?;
        let asset = match extension(&key).as_str() {
            "png" | "jpg" | "jpeg" | "bmp" => Asset::Image(Arc::new(Image::decode(&key, &bytes)?)),
            "mp3" | "ogg" | "wav" => Asset::Audio(Arc::new(AudioHandle {
                key: key.clone(),
                volume: 1.0,
                byte_len: bytes.len(),
            })),
            _ => {
                let value = serde_json::from_slice(&bytes).map_err(|e| AssetError::Json {
                    key: key.clone(),
                    source: e,
                })?;
                Asset::Json(Arc::new(value))
            }
        };
        debug!("loaded asset {key} ({} bytes)", bytes.len());

        if cache {
            self.lock().insert(key, asset.clone());
        }
        Ok(asset)
    }

    pub async fn load_image(&self, key: &str) -> Result<Arc<Image>, AssetError> {
        match self.load(key).await? {
            Asset::Image(img) => Ok(img),
            _ => Err(AssetError::WrongKind {
                key: key.to_string(),
                expected: "an image",
            }),
        }
    }

    pub async fn load_json(&self, key: &str) -> Result<Arc<serde_json::Value>, AssetError> {
        match self.load(key).await? {
            Asset::Json(v) => Ok(v),
            _ => Err(AssetError::WrongKind {
                key: key.to_string(),
                expected: "JSON",
            }),
        }
    }

    /// Load an audio handle tagged with the requested volume.
    pub async fn load_audio(&self, key: &str, volume: f32) -> Result<AudioHandle, AssetError> {
        match self.load(key).await? {
            Asset::Audio(a) => Ok(AudioHandle {
                volume: volume.clamp(0.0, 1.0),
                ..(*a).clone()
            }),
            _ => Err(AssetError::WrongKind {
                key: key.to_string(),
                expected: "audio",
            }),
        }
    }

    /// Load `<name>.json` and `<name>.png` concurrently.
    pub async fn load_tile_sheet(&self, name: &str) -> Result<Arc<TileSheet>, AssetError> {
        let name = normalize_key(name);
        if let Some(Asset::TileSheet(sheet)) = self.get_cached(&name) {
            return Ok(sheet);
        }

        let json_key = format!("{name}.json");
        let png_key = format!("{name}.png");
        let (json, image) = tokio::try_join!(self.load_json(&json_key), self.load_image(&png_key))?;
        let catalog: TileCatalog =
            serde_json::from_value((*json).clone()).map_err(|e| AssetError::Json {
                key: json_key,
                source: e,
            })?;

        debug!("tile sheet {name}: {} definitions", catalog.tiles.len());
        let sheet = Arc::new(TileSheet {
            name: name.clone(),
            catalog,
            image,
        });
        self.lock().insert(name, Asset::TileSheet(sheet.clone()));
        Ok(sheet)
    }
}
