use image::codecs::jpeg::JpegEncoder;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use super::resolver::ContentResolver;
use crate::error::Result;

/// Filename prefix of every stored photo
pub const ASSET_PREFIX: &str = "clothing_item_";

/// Re-encode quality for stored photos
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// App-private copies of picked photos
///
/// Every stored photo is a JPEG named `clothing_item_<uuid>.jpg` directly
/// inside `dir`. Failures are logged and reported as `None`/`false`; nothing
/// here returns an error to the caller.
pub struct AssetStore {
    dir: PathBuf,
    quality: u8,
    resolver: Arc<dyn ContentResolver>,
}

impl AssetStore {
    /// Create a store rooted at `dir`. The directory is created on first copy.
    pub fn new(dir: impl Into<PathBuf>, resolver: Arc<dyn ContentResolver>) -> Self {
        let dir = dir.into();
        // Stored references must be absolute paths
        let dir = if dir.is_absolute() {
            dir
        } else {
            std::env::current_dir().map(|cwd| cwd.join(&dir)).unwrap_or(dir)
        };
        let dir = fs::canonicalize(&dir).unwrap_or(dir);
        Self {
            dir,
            quality: DEFAULT_JPEG_QUALITY,
            resolver,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy the photo behind `uri` into internal storage.
    /// Returns the absolute path of the stored JPEG, or None if anything failed.
    pub fn copy_to_internal(&self, uri: &str) -> Option<PathBuf> {
        match self.try_copy(uri) {
            Ok(path) => {
                debug!(%uri, path = %path.display(), "stored photo");
                Some(path)
            }
            Err(e) => {
                warn!(%uri, error = %e, "could not copy photo into internal storage");
                None
            }
        }
    }

    fn try_copy(&self, uri: &str) -> Result<PathBuf> {
        // Decode fully in memory; peak memory grows with the source photo
        let mut bytes = Vec::new();
        self.resolver.open(uri)?.read_to_end(&mut bytes)?;
        let decoded = image::load_from_memory(&bytes)?;
        drop(bytes);

        // JPEG has no alpha channel
        let rgb = decoded.to_rgb8();
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.quality).encode_image(&rgb)?;

        fs::create_dir_all(&self.dir)?;
        let path = self
            .canonical_dir()
            .join(format!("{ASSET_PREFIX}{}.jpg", Uuid::new_v4()));
        write_atomically(&path, &encoded)?;
        Ok(path)
    }

    /// Remove a stored photo. Returns whether a file was removed;
    /// a missing file is not an error.
    pub fn delete(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted photo");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not delete photo");
                false
            }
        }
    }

    /// Check if a photo file exists
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Whether `path` lives inside this store (and so may be deleted by it).
    /// The parent directory is compared after resolving `..` and symlinks.
    pub fn owns(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) if parent == self.dir => true,
            Some(parent) => fs::canonicalize(parent)
                .map(|parent| parent == self.canonical_dir())
                .unwrap_or(false),
            None => false,
        }
    }

    /// The form of `path` that `stored_files` reports for the same file.
    /// Paths this store does not own come back unchanged.
    pub fn normalize(&self, path: &Path) -> PathBuf {
        match path.file_name() {
            Some(name) if self.owns(path) => self.canonical_dir().join(name),
            _ => path.to_path_buf(),
        }
    }

    /// Stored photos currently on disk
    pub fn stored_files(&self) -> Vec<PathBuf> {
        self.scan(is_asset_name)
    }

    /// Temp files left behind by a copy that never reached its rename
    pub fn stale_temp_files(&self) -> Vec<PathBuf> {
        self.scan(is_temp_name)
    }

    fn scan(&self, keep: fn(&str) -> bool) -> Vec<PathBuf> {
        let dir = self.canonical_dir();
        if !dir.exists() {
            return Vec::new();
        }
        WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| keep(&e.file_name().to_string_lossy()))
            .map(|e| e.into_path())
            .collect()
    }

    /// `dir` with symlinks resolved, once it exists
    fn canonical_dir(&self) -> PathBuf {
        fs::canonicalize(&self.dir).unwrap_or_else(|_| self.dir.clone())
    }
}

fn is_asset_name(name: &str) -> bool {
    name.starts_with(ASSET_PREFIX) && name.ends_with(".jpg")
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with(ASSET_PREFIX) && name.ends_with(".tmp")
}

/// Write to a sibling temp file, then rename into place
fn write_atomically(target: &Path, content: &[u8]) -> Result<()> {
    let temp = target.with_extension("tmp");
    fs::write(&temp, content)?;
    if let Err(e) = fs::rename(&temp, target) {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }
    Ok(())
}

impl std::fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStore")
            .field("dir", &self.dir)
            .field("quality", &self.quality)
            .finish()
    }
}
