//! The repository: single write gate and read composition point
//!
//! Keeps the catalog and the asset store consistent:
//! - external photo references are copied into internal storage before a
//!   row that mentions them is written;
//! - an old photo is deleted only after the row stops pointing at it;
//! - a fresh copy is deleted again when the row write fails.
//!
//! Cross-store sequences are ordered, not transactional. Deleting a photo
//! can fail without undoing the row change; the file is then an orphan that
//! `sweep_orphaned_assets` reclaims.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::catalog::Catalog;
use super::data::{
    outfit_name, AssetOwner, CategoryCount, CategoryOverview, ClothingItem, ImageRef,
    MissingAsset, Outfit, OutfitItem, OutfitRecord, ALL_CATEGORIES, DEFAULT_CATEGORIES,
};
use super::live::{LiveQuery, Table};
use crate::assets::{AssetStore, ContentResolver};
use crate::config::ClosetConfig;
use crate::error::{ClosetError, Result};

pub struct Repository {
    catalog: Arc<Catalog>,
    assets: AssetStore,
}

impl Repository {
    pub fn new(catalog: Arc<Catalog>, assets: AssetStore) -> Self {
        Self { catalog, assets }
    }

    /// Open the catalog and asset store described by `config`
    pub fn open(config: &ClosetConfig, resolver: Arc<dyn ContentResolver>) -> Result<Self> {
        let catalog = Arc::new(Catalog::open(config.database_path())?);
        let assets =
            AssetStore::new(config.image_dir_path(), resolver).with_quality(config.jpeg_quality);
        Ok(Self::new(catalog, assets))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    /// Seed the default categories into an empty catalog.
    /// Safe to call on every startup; returns how many were inserted.
    pub fn initialize_default_categories(&self) -> Result<usize> {
        let inserted = self.catalog.seed_categories(&DEFAULT_CATEGORIES)?;
        if inserted > 0 {
            info!(inserted, "seeded default categories");
        }
        Ok(inserted)
    }

    // ========== Clothing items ==========

    /// Store a new item, importing its photo first when it is external.
    ///
    /// Returns the item as persisted. Nothing is stored when the photo
    /// cannot be imported.
    pub fn add_clothing_item(&self, mut item: ClothingItem) -> Result<ClothingItem> {
        item.category = required("category", &item.category)?;
        let previous = self.catalog.item_by_id(&item.id)?;

        let copied = self.import_image(&item.image_uri)?;
        if let Some(path) = &copied {
            item.image_uri = path_string(path);
        }

        if let Err(e) = self.catalog.upsert_item(&item) {
            self.discard_copy(copied.as_deref());
            return Err(e);
        }

        // Same id re-added with another photo
        if let Some(previous) = previous {
            if previous.image_uri != item.image_uri {
                self.release_image(&previous.image_uri);
            }
        }

        info!(id = %item.id, category = %item.category, "added clothing item");
        Ok(item)
    }

    /// Replace an item's fields. A new external photo is imported before
    /// anything is written; the old photo is deleted only once the row
    /// points at the new one.
    pub fn update_clothing_item(&self, mut item: ClothingItem) -> Result<ClothingItem> {
        let stored = self
            .catalog
            .item_by_id(&item.id)?
            .ok_or_else(|| ClosetError::not_found("clothing item", &item.id))?;
        item.category = required("category", &item.category)?;

        let copied = if item.image_uri != stored.image_uri {
            self.import_image(&item.image_uri)?
        } else {
            None
        };
        if let Some(path) = &copied {
            item.image_uri = path_string(path);
        }

        match self.catalog.update_item(&item) {
            Ok(0) => {
                self.discard_copy(copied.as_deref());
                return Err(ClosetError::not_found("clothing item", &item.id));
            }
            Ok(_) => {}
            Err(e) => {
                self.discard_copy(copied.as_deref());
                return Err(e);
            }
        }

        if stored.image_uri != item.image_uri {
            self.release_image(&stored.image_uri);
        }

        item.created_at = stored.created_at;
        info!(id = %item.id, "updated clothing item");
        Ok(item)
    }

    /// Delete an item and its photo. Outfits lose the item, nothing else.
    pub fn remove_clothing_item(&self, id: &str) -> Result<ClothingItem> {
        let stored = self
            .catalog
            .item_by_id(id)?
            .ok_or_else(|| ClosetError::not_found("clothing item", id))?;

        if self.catalog.delete_item(id)? == 0 {
            return Err(ClosetError::not_found("clothing item", id));
        }
        self.release_image(&stored.image_uri);

        info!(%id, "removed clothing item");
        Ok(stored)
    }

    pub fn clothing_item(&self, id: &str) -> Result<Option<ClothingItem>> {
        self.catalog.item_by_id(id)
    }

    pub fn all_clothing_items(&self) -> Result<Vec<ClothingItem>> {
        self.catalog.all_items()
    }

    /// Items of one category; `"All"` means every item
    pub fn items_by_category(&self, category: &str) -> Result<Vec<ClothingItem>> {
        items_in(&self.catalog, category)
    }

    pub fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        self.catalog.category_counts()
    }

    /// `All` with the total, then each category with its item count
    pub fn category_overview(&self) -> Result<Vec<CategoryOverview>> {
        overview(&self.catalog)
    }

    // ========== Categories ==========

    pub fn categories(&self) -> Result<Vec<String>> {
        self.catalog.all_categories()
    }

    pub fn add_category(&self, name: &str) -> Result<String> {
        let name = required("category", name)?;
        self.catalog.insert_category(&name)?;
        info!(%name, "added category");
        Ok(name)
    }

    /// Remove a category record. Items filed under it keep the name.
    pub fn remove_category(&self, name: &str) -> Result<bool> {
        let removed = self.catalog.delete_category(name)? > 0;
        if removed {
            info!(%name, "removed category");
        }
        Ok(removed)
    }

    /// Rename a category and every item filed under it, atomically.
    /// Returns the number of items moved.
    pub fn update_category(&self, old: &str, new: &str) -> Result<usize> {
        let new = required("category", new)?;
        if old == new {
            return Ok(0);
        }
        let moved = self.catalog.rename_category(old, &new)?;
        info!(%old, %new, moved, "renamed category");
        Ok(moved)
    }

    // ========== Outfits ==========

    /// Store a new outfit with its members. An external model photo is
    /// imported first; if that fails nothing is stored.
    pub fn add_outfit(&self, mut outfit: Outfit) -> Result<Outfit> {
        outfit.name = outfit_name(&outfit.name);
        let previous = self.catalog.outfit_by_id(&outfit.id)?;

        let copied = match &outfit.model_image_uri {
            Some(uri) => self.import_image(uri)?,
            None => None,
        };
        if let Some(path) = &copied {
            outfit.model_image_uri = Some(path_string(path));
        }

        let links = links_for(&outfit);
        if let Err(e) = self.catalog.upsert_outfit(&OutfitRecord::from(&outfit), &links) {
            self.discard_copy(copied.as_deref());
            return Err(e);
        }

        if let Some(previous) = previous {
            self.release_replaced(previous.model_image_uri.as_deref(), outfit.model_image_uri.as_deref());
        }

        info!(id = %outfit.id, items = links.len(), "added outfit");
        self.stored_outfit(&outfit.id)
    }

    /// Replace an outfit's name, model photo and members.
    ///
    /// Same photo ordering as items: import the new one, write the row,
    /// then delete the old one. Setting the photo to `None` deletes it.
    pub fn update_outfit(&self, mut outfit: Outfit) -> Result<Outfit> {
        let stored = self
            .catalog
            .outfit_by_id(&outfit.id)?
            .ok_or_else(|| ClosetError::not_found("outfit", &outfit.id))?;
        outfit.name = outfit_name(&outfit.name);

        let copied = match &outfit.model_image_uri {
            Some(uri) if stored.model_image_uri.as_deref() != Some(uri.as_str()) => {
                self.import_image(uri)?
            }
            _ => None,
        };
        if let Some(path) = &copied {
            outfit.model_image_uri = Some(path_string(path));
        }

        let links = links_for(&outfit);
        match self.catalog.update_outfit(&OutfitRecord::from(&outfit), &links) {
            Ok(0) => {
                self.discard_copy(copied.as_deref());
                return Err(ClosetError::not_found("outfit", &outfit.id));
            }
            Ok(_) => {}
            Err(e) => {
                self.discard_copy(copied.as_deref());
                return Err(e);
            }
        }

        self.release_replaced(stored.model_image_uri.as_deref(), outfit.model_image_uri.as_deref());

        info!(id = %outfit.id, items = links.len(), "updated outfit");
        self.stored_outfit(&outfit.id)
    }

    /// Delete an outfit and its model photo. Member items stay.
    pub fn remove_outfit(&self, id: &str) -> Result<Outfit> {
        let stored = self
            .catalog
            .outfit_by_id(id)?
            .ok_or_else(|| ClosetError::not_found("outfit", id))?;
        let outfit = assemble_outfit(&self.catalog, stored)?;

        if self.catalog.delete_outfit(id)? == 0 {
            return Err(ClosetError::not_found("outfit", id));
        }
        if let Some(uri) = &outfit.model_image_uri {
            self.release_image(uri);
        }

        info!(%id, "removed outfit");
        Ok(outfit)
    }

    /// An outfit with its member items
    pub fn outfit(&self, id: &str) -> Result<Option<Outfit>> {
        match self.catalog.outfit_by_id(id)? {
            Some(record) => Ok(Some(assemble_outfit(&self.catalog, record)?)),
            None => Ok(None),
        }
    }

    pub fn outfits(&self) -> Result<Vec<Outfit>> {
        assemble_outfits(&self.catalog)
    }

    fn stored_outfit(&self, id: &str) -> Result<Outfit> {
        self.outfit(id)?
            .ok_or_else(|| ClosetError::not_found("outfit", id))
    }

    // ========== Live queries ==========

    pub fn observe_items(&self) -> LiveQuery<Vec<ClothingItem>> {
        let catalog = Arc::clone(&self.catalog);
        LiveQuery::new(self.catalog.changes(), &[Table::ClothingItems], move || {
            catalog.all_items()
        })
    }

    pub fn observe_items_by_category(&self, category: impl Into<String>) -> LiveQuery<Vec<ClothingItem>> {
        let catalog = Arc::clone(&self.catalog);
        let category = category.into();
        LiveQuery::new(self.catalog.changes(), &[Table::ClothingItems], move || {
            items_in(&catalog, &category)
        })
    }

    pub fn observe_categories(&self) -> LiveQuery<Vec<String>> {
        let catalog = Arc::clone(&self.catalog);
        LiveQuery::new(self.catalog.changes(), &[Table::Categories], move || {
            catalog.all_categories()
        })
    }

    pub fn observe_category_counts(&self) -> LiveQuery<Vec<CategoryCount>> {
        let catalog = Arc::clone(&self.catalog);
        LiveQuery::new(self.catalog.changes(), &[Table::ClothingItems], move || {
            catalog.category_counts()
        })
    }

    pub fn observe_category_overview(&self) -> LiveQuery<Vec<CategoryOverview>> {
        let catalog = Arc::clone(&self.catalog);
        LiveQuery::new(
            self.catalog.changes(),
            &[Table::ClothingItems, Table::Categories],
            move || overview(&catalog),
        )
    }

    pub fn observe_outfits(&self) -> LiveQuery<Vec<Outfit>> {
        let catalog = Arc::clone(&self.catalog);
        LiveQuery::new(
            self.catalog.changes(),
            &[Table::Outfits, Table::OutfitItems, Table::ClothingItems],
            move || assemble_outfits(&catalog),
        )
    }

    // ========== Asset maintenance ==========

    /// Rows whose internal photo is no longer on disk
    pub fn missing_assets(&self) -> Result<Vec<MissingAsset>> {
        let mut missing = Vec::new();
        for item in self.catalog.all_items()? {
            if is_missing(&item.image_uri) {
                missing.push(MissingAsset {
                    owner: AssetOwner::ClothingItem,
                    id: item.id,
                    path: item.image_uri,
                });
            }
        }
        for outfit in self.catalog.all_outfits()? {
            if let Some(uri) = outfit.model_image_uri.filter(|uri| is_missing(uri)) {
                missing.push(MissingAsset {
                    owner: AssetOwner::Outfit,
                    id: outfit.id,
                    path: uri,
                });
            }
        }
        if !missing.is_empty() {
            warn!(count = missing.len(), "rows point at missing photos");
        }
        Ok(missing)
    }

    /// Delete stored photos no row references. Returns the removed paths.
    ///
    /// Run it while no write is in flight: a photo copied for an add that
    /// has not committed yet looks like an orphan.
    pub fn sweep_orphaned_assets(&self) -> Result<Vec<PathBuf>> {
        // Rows may spell the asset directory differently than this store does
        let referenced: HashSet<PathBuf> = self
            .catalog
            .image_references()?
            .iter()
            .filter_map(|uri| match ImageRef::classify(uri) {
                ImageRef::Internal(path) => Some(self.assets.normalize(path)),
                _ => None,
            })
            .collect();

        let mut removed: Vec<PathBuf> = self
            .assets
            .stored_files()
            .into_iter()
            .filter(|path| !referenced.contains(path))
            .filter(|path| self.assets.delete(path))
            .collect();
        removed.extend(
            self.assets
                .stale_temp_files()
                .into_iter()
                .filter(|path| self.assets.delete(path)),
        );

        info!(removed = removed.len(), "swept orphaned photos");
        Ok(removed)
    }

    // ========== Photo ownership ==========

    /// Copy an external reference into internal storage.
    /// `Ok(None)` when the reference needs no copy.
    fn import_image(&self, uri: &str) -> Result<Option<PathBuf>> {
        if !ImageRef::classify(uri).is_external() {
            return Ok(None);
        }
        match self.assets.copy_to_internal(uri) {
            Some(path) => Ok(Some(path)),
            None => Err(ClosetError::AssetCopy { uri: uri.to_string() }),
        }
    }

    /// Undo a copy whose row never got written
    fn discard_copy(&self, copied: Option<&Path>) {
        if let Some(path) = copied {
            self.assets.delete(path);
        }
    }

    fn release_replaced(&self, old: Option<&str>, new: Option<&str>) {
        if let Some(old) = old {
            if Some(old) != new {
                self.release_image(old);
            }
        }
    }

    /// Delete a photo the catalog no longer references, if this store owns it
    fn release_image(&self, uri: &str) {
        match ImageRef::classify(uri) {
            ImageRef::Internal(path) if self.assets.owns(path) => {
                if !self.assets.delete(path) {
                    debug!(%uri, "photo was already gone");
                }
            }
            _ => debug!(%uri, "photo not owned by the asset store, leaving it"),
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("catalog", &self.catalog)
            .field("assets", &self.assets)
            .finish()
    }
}

fn items_in(catalog: &Catalog, category: &str) -> Result<Vec<ClothingItem>> {
    if category == ALL_CATEGORIES {
        catalog.all_items()
    } else {
        catalog.items_by_category(category)
    }
}

fn overview(catalog: &Catalog) -> Result<Vec<CategoryOverview>> {
    let counts = catalog.category_counts()?;
    let total = counts.iter().map(|c| c.count).sum();

    let mut entries = vec![CategoryOverview {
        category: ALL_CATEGORIES.to_string(),
        count: total,
    }];
    for category in catalog.all_categories()? {
        let count = counts
            .iter()
            .find(|c| c.category == category)
            .map_or(0, |c| c.count);
        entries.push(CategoryOverview { category, count });
    }
    Ok(entries)
}

/// Join rows plus item lookups; members that vanished are skipped
fn assemble_outfit(catalog: &Catalog, record: OutfitRecord) -> Result<Outfit> {
    let links = catalog.outfit_links(&record.id)?;
    let mut items = Vec::with_capacity(links.len());
    for link in links {
        if let Some(item) = catalog.item_by_id(&link.clothing_item_id)? {
            items.push(item);
        }
    }
    Ok(record.into_outfit(items))
}

fn assemble_outfits(catalog: &Catalog) -> Result<Vec<Outfit>> {
    catalog
        .all_outfits()?
        .into_iter()
        .map(|record| assemble_outfit(catalog, record))
        .collect()
}

fn links_for(outfit: &Outfit) -> Vec<OutfitItem> {
    outfit
        .item_ids()
        .iter()
        .map(|item_id| OutfitItem::link(&outfit.id, item_id))
        .collect()
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClosetError::InvalidInput(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}

fn is_missing(uri: &str) -> bool {
    matches!(ImageRef::classify(uri), ImageRef::Internal(path) if !AssetStore::exists(path))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
