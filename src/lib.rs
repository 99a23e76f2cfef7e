//! my-closet: a personal wardrobe catalog
//!
//! Clothing items with photos, categories and outfits, persisted in SQLite.
//! Picked photos are re-encoded into app-private storage and cleaned up
//! when the rows that own them change or go away.
//!
//! The [`Repository`] is the only write path; front ends read through its
//! queries or subscribe to [`LiveQuery`] snapshots.

pub mod assets;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;

pub use assets::{AssetStore, ContentResolver, FileUriResolver, MemoryResolver};
pub use config::ClosetConfig;
pub use error::{ClosetError, Result};
pub use state::catalog::Catalog;
pub use state::data::{
    AssetOwner, CategoryCount, CategoryOverview, ClothingItem, ImageRef, MissingAsset, Outfit,
    OutfitItem,
};
pub use state::live::{ChangeFeed, LiveQuery, Table};
pub use state::repository::Repository;
