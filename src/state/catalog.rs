use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, trace};

use super::data::{CategoryCount, ClothingItem, OutfitItem, OutfitRecord};
use super::live::{ChangeFeed, Table};
use crate::error::Result;

const ITEM_COLUMNS: &str = "id, image_uri, category, name, created_at";
const OUTFIT_COLUMNS: &str = "id, name, model_image_uri, created_at";

/// The Catalog manages the SQLite wardrobe database.
/// It stores clothing items, categories, outfits and outfit membership.
///
/// One connection is shared by the whole process; every statement runs
/// under its lock, and every committed write that changed rows is
/// announced on the change feed so live queries can refresh.
pub struct Catalog {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    changes: ChangeFeed,
}

impl Catalog {
    /// Open (or create) the catalog database at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        // WAL replies with the resulting mode, so it has to be read as a row
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!(%mode, "journal mode set");

        info!(path = %db_path.display(), "catalog opened");
        Self::with_connection(conn, Some(db_path))
    }

    /// Open a throwaway in-memory catalog
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let catalog = Catalog {
            conn: Mutex::new(conn),
            db_path,
            changes: ChangeFeed::new(),
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Create all tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS clothing_items (
                id              TEXT PRIMARY KEY NOT NULL,
                image_uri       TEXT NOT NULL,
                category        TEXT NOT NULL,
                name            TEXT,
                created_at      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS categories (
                name            TEXT PRIMARY KEY NOT NULL
            );

            CREATE TABLE IF NOT EXISTS outfits (
                id              TEXT PRIMARY KEY NOT NULL,
                name            TEXT NOT NULL,
                model_image_uri TEXT,
                created_at      INTEGER NOT NULL
            );

            -- Membership rows disappear with either parent
            CREATE TABLE IF NOT EXISTS outfit_items (
                id               TEXT PRIMARY KEY NOT NULL,
                outfit_id        TEXT NOT NULL,
                clothing_item_id TEXT NOT NULL,
                FOREIGN KEY(outfit_id) REFERENCES outfits(id) ON DELETE CASCADE,
                FOREIGN KEY(clothing_item_id) REFERENCES clothing_items(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_clothing_items_category
             ON clothing_items(category);

            CREATE INDEX IF NOT EXISTS idx_clothing_items_created_at
             ON clothing_items(created_at DESC);

            CREATE INDEX IF NOT EXISTS idx_outfit_items_outfit_id
             ON outfit_items(outfit_id);

            CREATE INDEX IF NOT EXISTS idx_outfit_items_clothing_item_id
             ON outfit_items(clothing_item_id);",
        )?;

        debug!("catalog schema initialized");
        Ok(())
    }

    /// Path of the database file, `None` for in-memory catalogs
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Feed announcing committed writes
    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave SQLite half-written
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a write and announce it once it has committed.
    /// Writes that touched no row are not announced.
    fn write<R>(&self, tables: &[Table], op: impl FnOnce(&mut Connection) -> Result<R>) -> Result<R> {
        let (result, changed) = {
            let mut conn = self.conn();
            let before = total_changes(&conn)?;
            let result = op(&mut *conn)?;
            (result, total_changes(&conn)? != before)
        };
        if changed {
            self.changes.publish(tables);
        } else {
            trace!(?tables, "write changed no rows");
        }
        Ok(result)
    }

    // ========== Clothing items ==========

    /// Insert an item, overwriting any row with the same id.
    ///
    /// The existing row is updated in place rather than deleted, so the
    /// item keeps its outfit memberships.
    pub fn upsert_item(&self, item: &ClothingItem) -> Result<()> {
        self.write(&[Table::ClothingItems], |conn| {
            conn.execute(
                "INSERT INTO clothing_items (id, image_uri, category, name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    image_uri = excluded.image_uri,
                    category = excluded.category,
                    name = excluded.name,
                    created_at = excluded.created_at",
                params![
                    item.id,
                    item.image_uri,
                    item.category,
                    item.name,
                    item.created_at.timestamp_millis(),
                ],
            )?;
            Ok(())
        })
    }

    /// Update an existing item; returns the number of rows changed (0 or 1)
    pub fn update_item(&self, item: &ClothingItem) -> Result<usize> {
        self.write(&[Table::ClothingItems], |conn| {
            Ok(conn.execute(
                "UPDATE clothing_items SET image_uri = ?1, category = ?2, name = ?3 WHERE id = ?4",
                params![item.image_uri, item.category, item.name, item.id],
            )?)
        })
    }

    /// Delete an item; its outfit memberships go with it
    pub fn delete_item(&self, id: &str) -> Result<usize> {
        self.write(&[Table::ClothingItems, Table::OutfitItems], |conn| {
            Ok(conn.execute("DELETE FROM clothing_items WHERE id = ?1", [id])?)
        })
    }

    pub fn item_by_id(&self, id: &str) -> Result<Option<ClothingItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM clothing_items WHERE id = ?1");
        Ok(self.conn().query_row(&sql, [id], item_from_row).optional()?)
    }

    /// All items, newest first
    pub fn all_items(&self) -> Result<Vec<ClothingItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM clothing_items ORDER BY created_at DESC, id");
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt.query_map([], item_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Items filed under exactly `category`, newest first
    pub fn items_by_category(&self, category: &str) -> Result<Vec<ClothingItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM clothing_items WHERE category = ?1 ORDER BY created_at DESC, id"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map([category], item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Number of items per category name actually used by items
    pub fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM clothing_items GROUP BY category ORDER BY category",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok(CategoryCount {
                    category: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }

    // ========== Categories ==========

    /// Insert a category; inserting an existing name changes nothing
    pub fn insert_category(&self, name: &str) -> Result<()> {
        self.write(&[Table::Categories], |conn| {
            conn.execute(
                "INSERT INTO categories (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                [name],
            )?;
            Ok(())
        })
    }

    pub fn delete_category(&self, name: &str) -> Result<usize> {
        self.write(&[Table::Categories], |conn| {
            Ok(conn.execute("DELETE FROM categories WHERE name = ?1", [name])?)
        })
    }

    /// Category names in insertion order
    pub fn all_categories(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name FROM categories ORDER BY rowid")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    pub fn category_count(&self) -> Result<u32> {
        Ok(self
            .conn()
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?)
    }

    /// Seed `names` only if no category exists yet; returns how many were inserted
    pub fn seed_categories(&self, names: &[&str]) -> Result<usize> {
        self.write(&[Table::Categories], |conn| {
            let tx = conn.transaction()?;
            let existing: u32 = tx.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
            if existing > 0 {
                return Ok(0);
            }
            for name in names {
                tx.execute(
                    "INSERT INTO categories (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                    [name],
                )?;
            }
            tx.commit()?;
            Ok(names.len())
        })
    }

    /// Move every item from `old` to `new` and replace the category record,
    /// all in one transaction. Returns the number of items moved.
    pub fn rename_category(&self, old: &str, new: &str) -> Result<usize> {
        self.write(&[Table::ClothingItems, Table::Categories], |conn| {
            let tx = conn.transaction()?;
            let moved = tx.execute(
                "UPDATE clothing_items SET category = ?2 WHERE category = ?1",
                [old, new],
            )?;
            tx.execute("DELETE FROM categories WHERE name = ?1", [old])?;
            tx.execute(
                "INSERT INTO categories (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                [new],
            )?;
            tx.commit()?;
            Ok(moved)
        })
    }

    // ========== Outfits ==========

    /// Insert or overwrite an outfit together with its full membership
    pub fn upsert_outfit(&self, outfit: &OutfitRecord, links: &[OutfitItem]) -> Result<()> {
        self.write(&[Table::Outfits, Table::OutfitItems], |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO outfits (id, name, model_image_uri, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    model_image_uri = excluded.model_image_uri,
                    created_at = excluded.created_at",
                params![
                    outfit.id,
                    outfit.name,
                    outfit.model_image_uri,
                    outfit.created_at.timestamp_millis(),
                ],
            )?;
            replace_links(&tx, &outfit.id, links)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Update an existing outfit and replace its membership.
    ///
    /// Returns 0 without touching anything when the outfit does not exist.
    pub fn update_outfit(&self, outfit: &OutfitRecord, links: &[OutfitItem]) -> Result<usize> {
        self.write(&[Table::Outfits, Table::OutfitItems], |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE outfits SET name = ?1, model_image_uri = ?2 WHERE id = ?3",
                params![outfit.name, outfit.model_image_uri, outfit.id],
            )?;
            if changed == 0 {
                return Ok(0);
            }
            replace_links(&tx, &outfit.id, links)?;
            tx.commit()?;
            Ok(changed)
        })
    }

    /// Delete an outfit; its membership rows go with it, member items stay
    pub fn delete_outfit(&self, id: &str) -> Result<usize> {
        self.write(&[Table::Outfits, Table::OutfitItems], |conn| {
            Ok(conn.execute("DELETE FROM outfits WHERE id = ?1", [id])?)
        })
    }

    pub fn outfit_by_id(&self, id: &str) -> Result<Option<OutfitRecord>> {
        let sql = format!("SELECT {OUTFIT_COLUMNS} FROM outfits WHERE id = ?1");
        Ok(self.conn().query_row(&sql, [id], outfit_from_row).optional()?)
    }

    /// All outfits, newest first
    pub fn all_outfits(&self) -> Result<Vec<OutfitRecord>> {
        let sql = format!("SELECT {OUTFIT_COLUMNS} FROM outfits ORDER BY created_at DESC, id");
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let outfits = stmt
            .query_map([], outfit_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(outfits)
    }

    /// Membership rows of one outfit
    pub fn outfit_links(&self, outfit_id: &str) -> Result<Vec<OutfitItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, outfit_id, clothing_item_id FROM outfit_items WHERE outfit_id = ?1 ORDER BY rowid",
        )?;
        let links = stmt
            .query_map([outfit_id], |row| {
                Ok(OutfitItem {
                    id: row.get(0)?,
                    outfit_id: row.get(1)?,
                    clothing_item_id: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    // ========== Assets ==========

    /// Every image reference stored on an item or outfit
    pub fn image_references(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT image_uri FROM clothing_items
             UNION
             SELECT model_image_uri FROM outfits WHERE model_image_uri IS NOT NULL",
        )?;
        let uris = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(uris)
    }
}

fn replace_links(conn: &Connection, outfit_id: &str, links: &[OutfitItem]) -> Result<()> {
    conn.execute("DELETE FROM outfit_items WHERE outfit_id = ?1", [outfit_id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO outfit_items (id, outfit_id, clothing_item_id) VALUES (?1, ?2, ?3)",
    )?;
    for link in links {
        stmt.execute(params![link.id, outfit_id, link.clothing_item_id])?;
    }
    Ok(())
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ClothingItem> {
    Ok(ClothingItem {
        id: row.get(0)?,
        image_uri: row.get(1)?,
        category: row.get(2)?,
        name: row.get(3)?,
        created_at: from_millis(row.get(4)?),
    })
}

fn outfit_from_row(row: &Row<'_>) -> rusqlite::Result<OutfitRecord> {
    Ok(OutfitRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        model_image_uri: row.get(2)?,
        created_at: from_millis(row.get(3)?),
    })
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

// Implement Debug for better error messages
/// Rows changed by every statement on this connection so far
fn total_changes(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT total_changes()", [], |row| row.get(0))?)
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::Outfit;
    use tempfile::TempDir;

    fn item(category: &str) -> ClothingItem {
        ClothingItem::new("/closet/clothing_images/a.jpg", category)
    }

    fn outfit_with(catalog: &Catalog, items: &[&ClothingItem]) -> OutfitRecord {
        let outfit = Outfit::new("Weekend", vec![]);
        let record = OutfitRecord::from(&outfit);
        let links: Vec<OutfitItem> = items.iter().map(|i| OutfitItem::link(&outfit.id, &i.id)).collect();
        catalog.upsert_outfit(&record, &links).unwrap();
        record
    }

    #[test]
    fn test_open_creates_file_and_reopens() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("mycloset.db");

        let shirt = item("Tops");
        {
            let catalog = Catalog::open(&db_path).unwrap();
            catalog.upsert_item(&shirt).unwrap();
        }

        let catalog = Catalog::open(&db_path).unwrap();
        assert_eq!(catalog.path(), Some(db_path.as_path()));
        assert_eq!(catalog.item_by_id(&shirt.id).unwrap(), Some(shirt));
    }

    #[test]
    fn test_upsert_same_id_overwrites() {
        let catalog = Catalog::open_in_memory().unwrap();
        let mut shirt = item("Tops");
        catalog.upsert_item(&shirt).unwrap();

        shirt.category = "Bottoms".to_string();
        catalog.upsert_item(&shirt).unwrap();

        let all = catalog.all_items().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].category, "Bottoms");
    }

    #[test]
    fn test_upsert_item_keeps_outfit_membership() {
        let catalog = Catalog::open_in_memory().unwrap();
        let shirt = item("Tops");
        catalog.upsert_item(&shirt).unwrap();
        let outfit = outfit_with(&catalog, &[&shirt]);

        catalog.upsert_item(&shirt).unwrap();

        assert_eq!(catalog.outfit_links(&outfit.id).unwrap().len(), 1);
    }

    #[test]
    fn test_update_missing_item_changes_nothing() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert_eq!(catalog.update_item(&item("Tops")).unwrap(), 0);
        assert!(catalog.all_items().unwrap().is_empty());
    }

    #[test]
    fn test_lookup_missing_is_none() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert_eq!(catalog.item_by_id("nope").unwrap(), None);
        assert_eq!(catalog.outfit_by_id("nope").unwrap(), None);
    }

    #[test]
    fn test_items_by_category_is_exact_match() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_item(&item("Tops")).unwrap();
        catalog.upsert_item(&item("Tops")).unwrap();
        catalog.upsert_item(&item("tops")).unwrap();

        assert_eq!(catalog.items_by_category("Tops").unwrap().len(), 2);
        assert_eq!(catalog.items_by_category("Top").unwrap().len(), 0);
    }

    #[test]
    fn test_category_counts_grouped() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_item(&item("Tops")).unwrap();
        catalog.upsert_item(&item("Shoes")).unwrap();
        catalog.upsert_item(&item("Shoes")).unwrap();

        let counts = catalog.category_counts().unwrap();
        assert_eq!(
            counts,
            vec![
                CategoryCount { category: "Shoes".into(), count: 2 },
                CategoryCount { category: "Tops".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_delete_item_cascades_to_links() {
        let catalog = Catalog::open_in_memory().unwrap();
        let shirt = item("Tops");
        let shoes = item("Shoes");
        catalog.upsert_item(&shirt).unwrap();
        catalog.upsert_item(&shoes).unwrap();
        let outfit = outfit_with(&catalog, &[&shirt, &shoes]);

        assert_eq!(catalog.delete_item(&shirt.id).unwrap(), 1);

        let links = catalog.outfit_links(&outfit.id).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].clothing_item_id, shoes.id);
    }

    #[test]
    fn test_delete_outfit_cascades_but_keeps_items() {
        let catalog = Catalog::open_in_memory().unwrap();
        let shirt = item("Tops");
        catalog.upsert_item(&shirt).unwrap();
        let outfit = outfit_with(&catalog, &[&shirt]);

        assert_eq!(catalog.delete_outfit(&outfit.id).unwrap(), 1);

        assert!(catalog.outfit_links(&outfit.id).unwrap().is_empty());
        assert!(catalog.item_by_id(&shirt.id).unwrap().is_some());
    }

    #[test]
    fn test_link_to_unknown_item_is_rejected_atomically() {
        let catalog = Catalog::open_in_memory().unwrap();
        let outfit = Outfit::new("Ghost", vec![]);
        let record = OutfitRecord::from(&outfit);
        let links = vec![OutfitItem::link(&outfit.id, "missing-item")];

        assert!(catalog.upsert_outfit(&record, &links).is_err());
        assert_eq!(catalog.outfit_by_id(&outfit.id).unwrap(), None);
    }

    #[test]
    fn test_update_outfit_replaces_links() {
        let catalog = Catalog::open_in_memory().unwrap();
        let shirt = item("Tops");
        let shoes = item("Shoes");
        catalog.upsert_item(&shirt).unwrap();
        catalog.upsert_item(&shoes).unwrap();
        let mut record = outfit_with(&catalog, &[&shirt]);

        record.name = "Renamed".into();
        let links = vec![OutfitItem::link(&record.id, &shoes.id)];
        assert_eq!(catalog.update_outfit(&record, &links).unwrap(), 1);

        let stored = catalog.outfit_by_id(&record.id).unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        let links = catalog.outfit_links(&record.id).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].clothing_item_id, shoes.id);
    }

    #[test]
    fn test_update_missing_outfit_changes_nothing() {
        let catalog = Catalog::open_in_memory().unwrap();
        let outfit = Outfit::new("Nowhere", vec![]);
        assert_eq!(catalog.update_outfit(&OutfitRecord::from(&outfit), &[]).unwrap(), 0);
    }

    #[test]
    fn test_categories_keep_insertion_order() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.insert_category("Shoes").unwrap();
        catalog.insert_category("Tops").unwrap();
        catalog.insert_category("Shoes").unwrap();

        assert_eq!(catalog.all_categories().unwrap(), vec!["Shoes", "Tops"]);
        assert_eq!(catalog.category_count().unwrap(), 2);
    }

    #[test]
    fn test_seed_only_when_empty() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert_eq!(catalog.seed_categories(&["A", "B"]).unwrap(), 2);
        assert_eq!(catalog.seed_categories(&["C"]).unwrap(), 0);
        assert_eq!(catalog.all_categories().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_rename_category_moves_items() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.insert_category("Tops").unwrap();
        catalog.upsert_item(&item("Tops")).unwrap();
        catalog.upsert_item(&item("Tops")).unwrap();
        catalog.upsert_item(&item("Shoes")).unwrap();

        assert_eq!(catalog.rename_category("Tops", "Shirts").unwrap(), 2);

        assert_eq!(catalog.items_by_category("Shirts").unwrap().len(), 2);
        assert!(catalog.items_by_category("Tops").unwrap().is_empty());
        assert_eq!(catalog.all_categories().unwrap(), vec!["Shirts"]);
    }

    #[test]
    fn test_image_references_cover_items_and_outfits() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_item(&ClothingItem::new("/a.jpg", "Tops")).unwrap();
        let outfit = Outfit::new("Photo", vec![]).with_model_image("/b.jpg");
        catalog.upsert_outfit(&OutfitRecord::from(&outfit), &[]).unwrap();
        catalog
            .upsert_outfit(&OutfitRecord::from(&Outfit::new("Plain", vec![])), &[])
            .unwrap();

        let mut refs = catalog.image_references().unwrap();
        refs.sort();
        assert_eq!(refs, vec!["/a.jpg", "/b.jpg"]);
    }

    #[test]
    fn test_writes_publish_touched_tables() {
        let catalog = Catalog::open_in_memory().unwrap();
        let mut rx = catalog.changes().subscribe();

        catalog.insert_category("Tops").unwrap();

        assert_eq!(rx.try_recv().unwrap(), Table::Categories);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_writes_that_change_nothing_stay_quiet() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.seed_categories(&["Tops"]).unwrap();
        let mut rx = catalog.changes().subscribe();

        assert_eq!(catalog.seed_categories(&["Tops", "Shoes"]).unwrap(), 0);
        catalog.insert_category("Tops").unwrap();
        assert_eq!(catalog.delete_item("nope").unwrap(), 0);
        assert_eq!(catalog.delete_category("Shoes").unwrap(), 0);
        assert!(rx.try_recv().is_err());

        catalog.delete_category("Tops").unwrap();
        assert_eq!(rx.try_recv().unwrap(), Table::Categories);
    }
}
