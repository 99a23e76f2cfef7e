use std::path::{Path, PathBuf};

use crate::assets::store::DEFAULT_JPEG_QUALITY;
use crate::error::{ClosetError, Result};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "MY_CLOSET_DATA_DIR";

const APP_DIR: &str = "my-closet";
const DATABASE_FILE: &str = "mycloset.db";
const IMAGE_DIR: &str = "clothing_images";

/// Where the closet keeps its database and photos
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosetConfig {
    /// App-private root directory
    pub data_dir: PathBuf,
    /// Database file name, relative to `data_dir`
    pub database_file: String,
    /// Photo directory name, relative to `data_dir`
    pub image_dir: String,
    pub jpeg_quality: u8,
}

impl ClosetConfig {
    /// Configuration rooted at an explicit directory
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            database_file: DATABASE_FILE.to_string(),
            image_dir: IMAGE_DIR.to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Resolve the data directory.
    ///
    /// `MY_CLOSET_DATA_DIR` wins, then `explicit`, then the platform data directory:
    /// - Linux: ~/.local/share/my-closet
    /// - macOS: ~/Library/Application Support/my-closet
    /// - Windows: %APPDATA%\my-closet
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(DATA_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let data_dir = match (from_env, explicit) {
            (Some(dir), _) => dir,
            (None, Some(dir)) => dir.to_path_buf(),
            (None, None) => default_data_dir()?,
        };
        Ok(Self::at(data_dir))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn image_dir_path(&self) -> PathBuf {
        self.data_dir.join(&self.image_dir)
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| ClosetError::Config("could not determine user data directory".into()))?;
    path.push(APP_DIR);
    Ok(path)
}
