/// Shared data structures for the closet catalog
///
/// These structs represent the data model that flows between
/// the database layer, the repository and whatever front end renders it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Name given to an outfit saved without one
pub const UNTITLED_OUTFIT: &str = "Untitled Outfit";

/// Pseudo-category that means "no filter"
pub const ALL_CATEGORIES: &str = "All";

/// Categories seeded into an empty catalog
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Tops", "Bottoms", "Dresses", "Shoes", "Accessories"];

/// A single piece of clothing in the closet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClothingItem {
    /// Opaque unique id (UUID v4 unless the caller picks one)
    pub id: String,
    /// External reference before persistence, internal path afterwards
    pub image_uri: String,
    /// Category name
    pub category: String,
    /// Optional display name
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ClothingItem {
    pub fn new(image_uri: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            image_uri: image_uri.into(),
            category: category.into(),
            name: None,
            created_at: timestamp_now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.trim().is_empty() { None } else { Some(name) };
        self
    }
}

/// A lookbook entry grouping clothing items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outfit {
    pub id: String,
    pub name: String,
    /// Optional photo of the outfit being worn
    pub model_image_uri: Option<String>,
    /// Member items; order carries no meaning
    pub items: Vec<ClothingItem>,
    pub created_at: DateTime<Utc>,
}

impl Outfit {
    pub fn new(name: impl Into<String>, items: Vec<ClothingItem>) -> Self {
        Self {
            id: new_id(),
            name: outfit_name(&name.into()),
            model_image_uri: None,
            items,
            created_at: timestamp_now(),
        }
    }

    pub fn with_model_image(mut self, uri: impl Into<String>) -> Self {
        self.model_image_uri = Some(uri.into());
        self
    }

    /// Ids of the member items, deduplicated
    pub fn item_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.items.iter().map(|item| item.id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Join row linking one outfit to one clothing item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutfitItem {
    pub id: String,
    pub outfit_id: String,
    pub clothing_item_id: String,
}

impl OutfitItem {
    pub fn link(outfit_id: &str, clothing_item_id: &str) -> Self {
        Self {
            id: new_id(),
            outfit_id: outfit_id.to_string(),
            clothing_item_id: clothing_item_id.to_string(),
        }
    }
}

/// Outfit row as stored, without its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutfitRecord {
    pub id: String,
    pub name: String,
    pub model_image_uri: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OutfitRecord {
    pub fn into_outfit(self, items: Vec<ClothingItem>) -> Outfit {
        Outfit {
            id: self.id,
            name: self.name,
            model_image_uri: self.model_image_uri,
            items,
            created_at: self.created_at,
        }
    }
}

impl From<&Outfit> for OutfitRecord {
    fn from(outfit: &Outfit) -> Self {
        Self {
            id: outfit.id.clone(),
            name: outfit.name.clone(),
            model_image_uri: outfit.model_image_uri.clone(),
            created_at: outfit.created_at,
        }
    }
}

/// Number of items filed under one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u32,
}

/// One entry of the closet filter bar: `All` first, then every category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOverview {
    pub category: String,
    pub count: u32,
}

impl CategoryOverview {
    /// Label shown to users, e.g. `Tops (3)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.category, self.count)
    }
}

/// Kind of entity a stored photo belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetOwner {
    ClothingItem,
    Outfit,
}

/// A row pointing at an internal photo that is no longer on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingAsset {
    pub owner: AssetOwner,
    pub id: String,
    pub path: String,
}

/// What kind of location an image reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRef<'a> {
    /// A transient `scheme://` reference that must be copied before storage
    External(&'a str),
    /// An absolute filesystem path
    Internal(&'a Path),
    /// Anything else; stored as given
    Opaque,
}

impl<'a> ImageRef<'a> {
    pub fn classify(uri: &'a str) -> Self {
        if has_scheme(uri) {
            ImageRef::External(uri)
        } else if Path::new(uri).is_absolute() {
            ImageRef::Internal(Path::new(uri))
        } else {
            ImageRef::Opaque
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, ImageRef::External(_))
    }
}

fn has_scheme(uri: &str) -> bool {
    match uri.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Trim an outfit name, falling back to the untitled default
pub fn outfit_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNTITLED_OUTFIT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Current time at the millisecond precision the catalog stores
pub fn timestamp_now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_content_uri_is_external() {
        assert!(ImageRef::classify("content://media/external/images/42").is_external());
        assert!(ImageRef::classify("file:///tmp/shirt.png").is_external());
    }

    #[test]
    fn test_classify_absolute_path_is_internal() {
        let uri = if cfg!(windows) { "C:\\closet\\a.jpg" } else { "/data/closet/a.jpg" };
        assert_eq!(ImageRef::classify(uri), ImageRef::Internal(Path::new(uri)));
    }

    #[test]
    fn test_classify_other_is_opaque() {
        assert_eq!(ImageRef::classify(""), ImageRef::Opaque);
        assert_eq!(ImageRef::classify("shirt.jpg"), ImageRef::Opaque);
        assert_eq!(ImageRef::classify("://nothing"), ImageRef::Opaque);
    }

    #[test]
    fn test_blank_outfit_name_defaults() {
        assert_eq!(Outfit::new("   ", vec![]).name, UNTITLED_OUTFIT);
        assert_eq!(Outfit::new(" Friday ", vec![]).name, "Friday");
    }

    #[test]
    fn test_item_ids_deduplicated() {
        let shirt = ClothingItem::new("/a.jpg", "Tops");
        let outfit = Outfit::new("Twice", vec![shirt.clone(), shirt.clone()]);
        assert_eq!(outfit.item_ids(), vec![shirt.id]);
    }

    #[test]
    fn test_blank_item_name_is_none() {
        let item = ClothingItem::new("/a.jpg", "Tops").with_name("  ");
        assert_eq!(item.name, None);
    }

    #[test]
    fn test_overview_label() {
        let entry = CategoryOverview { category: "Shoes".into(), count: 3 };
        assert_eq!(entry.label(), "Shoes (3)");
    }
}
