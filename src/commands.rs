//! Subcommands of the `my-closet` binary

use clap::{Args, Subcommand};
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use url::Url;

use my_closet::{ClosetError, ClothingItem, ImageRef, Outfit, Repository};

type CommandResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the catalog and seed default categories
    Init,
    /// Clothing item operations
    #[command(subcommand)]
    Item(ItemCommand),
    /// Category operations
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Outfit (lookbook) operations
    #[command(subcommand)]
    Outfit(OutfitCommand),
    /// Stored photo maintenance
    #[command(subcommand)]
    Assets(AssetsCommand),
}

#[derive(Debug, Subcommand)]
pub enum ItemCommand {
    /// Add an item; the photo is copied into the closet
    Add {
        /// Photo path or URI (file://...)
        #[arg(long)]
        image: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Change an item's photo, category or name
    Update {
        id: String,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove an item and its photo
    Remove { id: String },
    /// Show one item
    Show { id: String },
    /// List items, optionally filtered by category ("All" lists everything)
    List {
        #[arg(long, default_value = "All")]
        category: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// List category names
    List,
    /// Item counts per category, "All" first
    Counts,
    Add { name: String },
    /// Remove a category; its items keep the name
    Remove { name: String },
    /// Rename a category and every item in it
    Rename { old: String, new: String },
}

#[derive(Debug, Args)]
pub struct OutfitFields {
    #[arg(long)]
    name: Option<String>,
    /// Member item id (repeatable)
    #[arg(long = "item")]
    items: Vec<String>,
    /// Model photo path or URI
    #[arg(long)]
    photo: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum OutfitCommand {
    /// Create an outfit from existing items
    Add(OutfitFields),
    /// Change an outfit; given items replace the current members
    Update {
        id: String,
        #[command(flatten)]
        fields: OutfitFields,
        /// Drop every member
        #[arg(long, conflicts_with = "items")]
        clear_items: bool,
        /// Remove the model photo
        #[arg(long, conflicts_with = "photo")]
        clear_photo: bool,
    },
    /// Remove an outfit and its model photo; items stay
    Remove { id: String },
    Show { id: String },
    List,
}

#[derive(Debug, Subcommand)]
pub enum AssetsCommand {
    /// Report rows whose photo file is missing
    Verify,
    /// Delete photos no row references
    Sweep,
}

/// How results are printed
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T) -> String) -> CommandResult {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", human(value));
        }
        Ok(())
    }
}

pub fn execute(repo: &Repository, command: Command, out: &Output) -> CommandResult {
    match command {
        Command::Init => {
            let categories = repo.categories()?;
            out.emit(&categories, |c| format!("Closet ready with {} categories.", c.len()))
        }
        Command::Item(cmd) => execute_item(repo, cmd, out),
        Command::Category(cmd) => execute_category(repo, cmd, out),
        Command::Outfit(cmd) => execute_outfit(repo, cmd, out),
        Command::Assets(cmd) => execute_assets(repo, cmd, out),
    }
}

fn execute_item(repo: &Repository, cmd: ItemCommand, out: &Output) -> CommandResult {
    match cmd {
        ItemCommand::Add { image, category, name } => {
            let mut item = ClothingItem::new(image_uri(&image)?, category);
            if let Some(name) = name {
                item = item.with_name(name);
            }
            let item = repo.add_clothing_item(item)?;
            out.emit(&item, |i| format!("Added {}", describe_item(i)))
        }
        ItemCommand::Update { id, image, category, name } => {
            let mut item = repo
                .clothing_item(&id)?
                .ok_or_else(|| not_found("clothing item", &id))?;
            if let Some(image) = image {
                item.image_uri = image_uri(&image)?;
            }
            if let Some(category) = category {
                item.category = category;
            }
            if let Some(name) = name {
                item = item.with_name(name);
            }
            let item = repo.update_clothing_item(item)?;
            out.emit(&item, |i| format!("Updated {}", describe_item(i)))
        }
        ItemCommand::Remove { id } => {
            let item = repo.remove_clothing_item(&id)?;
            out.emit(&item, |i| format!("Removed {}", describe_item(i)))
        }
        ItemCommand::Show { id } => {
            let item = repo
                .clothing_item(&id)?
                .ok_or_else(|| not_found("clothing item", &id))?;
            out.emit(&item, describe_item)
        }
        ItemCommand::List { category } => {
            let items = repo.items_by_category(&category)?;
            out.emit(&items, |items| lines(items.iter().map(describe_item)))
        }
    }
}

fn execute_category(repo: &Repository, cmd: CategoryCommand, out: &Output) -> CommandResult {
    match cmd {
        CategoryCommand::List => {
            let categories = repo.categories()?;
            out.emit(&categories, |c| c.join("\n"))
        }
        CategoryCommand::Counts => {
            let overview = repo.category_overview()?;
            out.emit(&overview, |o| lines(o.iter().map(|entry| entry.label())))
        }
        CategoryCommand::Add { name } => {
            let name = repo.add_category(&name)?;
            out.emit(&name, |n| format!("Added category {n}"))
        }
        CategoryCommand::Remove { name } => {
            let removed = repo.remove_category(&name)?;
            out.emit(&removed, |removed| {
                if *removed {
                    format!("Removed category {name}")
                } else {
                    format!("No category named {name}")
                }
            })
        }
        CategoryCommand::Rename { old, new } => {
            let moved = repo.update_category(&old, &new)?;
            out.emit(&moved, |moved| format!("Renamed {old} to {}, {moved} items moved", new.trim()))
        }
    }
}

fn execute_outfit(repo: &Repository, cmd: OutfitCommand, out: &Output) -> CommandResult {
    match cmd {
        OutfitCommand::Add(fields) => {
            let items = lookup_items(repo, &fields.items)?;
            let mut outfit = Outfit::new(fields.name.unwrap_or_default(), items);
            if let Some(photo) = fields.photo {
                outfit = outfit.with_model_image(image_uri(&photo)?);
            }
            let outfit = repo.add_outfit(outfit)?;
            out.emit(&outfit, |o| format!("Added {}", describe_outfit(o)))
        }
        OutfitCommand::Update { id, fields, clear_items, clear_photo } => {
            let mut outfit = repo.outfit(&id)?.ok_or_else(|| not_found("outfit", &id))?;
            if let Some(name) = fields.name {
                outfit.name = name;
            }
            if clear_items {
                outfit.items.clear();
            } else if !fields.items.is_empty() {
                outfit.items = lookup_items(repo, &fields.items)?;
            }
            if clear_photo {
                outfit.model_image_uri = None;
            } else if let Some(photo) = fields.photo {
                outfit.model_image_uri = Some(image_uri(&photo)?);
            }
            let outfit = repo.update_outfit(outfit)?;
            out.emit(&outfit, |o| format!("Updated {}", describe_outfit(o)))
        }
        OutfitCommand::Remove { id } => {
            let outfit = repo.remove_outfit(&id)?;
            out.emit(&outfit, |o| format!("Removed {}", describe_outfit(o)))
        }
        OutfitCommand::Show { id } => {
            let outfit = repo.outfit(&id)?.ok_or_else(|| not_found("outfit", &id))?;
            out.emit(&outfit, |o| {
                let members = o.items.iter().map(|i| format!("  - {}", describe_item(i)));
                lines(std::iter::once(describe_outfit(o)).chain(members))
            })
        }
        OutfitCommand::List => {
            let outfits = repo.outfits()?;
            out.emit(&outfits, |outfits| lines(outfits.iter().map(describe_outfit)))
        }
    }
}

fn execute_assets(repo: &Repository, cmd: AssetsCommand, out: &Output) -> CommandResult {
    match cmd {
        AssetsCommand::Verify => {
            let missing = repo.missing_assets()?;
            out.emit(&missing, |missing| {
                if missing.is_empty() {
                    "All photos present.".to_string()
                } else {
                    lines(missing.iter().map(|m| format!("{:?} {}: {}", m.owner, m.id, m.path)))
                }
            })
        }
        AssetsCommand::Sweep => {
            let removed: Vec<String> = repo
                .sweep_orphaned_assets()?
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            out.emit(&removed, |removed| format!("Removed {} orphaned photos.", removed.len()))
        }
    }
}

/// Plain paths become `file://` URIs so the photo gets copied
fn image_uri(arg: &str) -> Result<String, Box<dyn Error>> {
    if ImageRef::classify(arg).is_external() {
        return Ok(arg.to_string());
    }
    let path = Path::new(arg).canonicalize()?;
    let url = Url::from_file_path(&path).map_err(|()| {
        ClosetError::InvalidInput(format!("{} cannot be expressed as a file URI", path.display()))
    })?;
    Ok(url.into())
}

fn lookup_items(repo: &Repository, ids: &[String]) -> Result<Vec<ClothingItem>, Box<dyn Error>> {
    ids.iter()
        .map(|id| -> Result<ClothingItem, Box<dyn Error>> {
            Ok(repo
                .clothing_item(id)?
                .ok_or_else(|| not_found("clothing item", id))?)
        })
        .collect()
}

fn not_found(entity: &'static str, id: &str) -> ClosetError {
    ClosetError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn describe_item(item: &ClothingItem) -> String {
    match &item.name {
        Some(name) => format!("{} [{}] {} ({})", item.id, item.category, name, item.image_uri),
        None => format!("{} [{}] ({})", item.id, item.category, item.image_uri),
    }
}

fn describe_outfit(outfit: &Outfit) -> String {
    let photo = outfit.model_image_uri.as_deref().unwrap_or("no photo");
    format!("{} {} - {} items ({})", outfit.id, outfit.name, outfit.items.len(), photo)
}

fn lines(entries: impl Iterator<Item = String>) -> String {
    entries.collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Command,
    }

    #[test]
    fn test_parses_outfit_add_with_items() {
        let cli = TestCli::try_parse_from([
            "my-closet", "outfit", "add", "--name", "Office", "--item", "a", "--item", "b",
        ])
        .unwrap();
        match cli.command {
            Command::Outfit(OutfitCommand::Add(fields)) => {
                assert_eq!(fields.name.as_deref(), Some("Office"));
                assert_eq!(fields.items, vec!["a", "b"]);
                assert_eq!(fields.photo, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_clear_photo_conflicts_with_photo() {
        let result = TestCli::try_parse_from([
            "my-closet", "outfit", "update", "id", "--photo", "x.jpg", "--clear-photo",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_item_list_defaults_to_all() {
        let cli = TestCli::try_parse_from(["my-closet", "item", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Item(ItemCommand::List { category }) if category == "All"
        ));
    }

    #[test]
    fn test_image_uri_keeps_uris_and_converts_paths() {
        assert_eq!(image_uri("content://media/1").unwrap(), "content://media/1");

        let dir = tempfile::TempDir::new().unwrap();
        let photo = dir.path().join("shirt.png");
        std::fs::write(&photo, b"png").unwrap();
        let uri = image_uri(&photo.to_string_lossy()).unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("shirt.png"));

        assert!(image_uri("/definitely/not/here.png").is_err());

        let odd = dir.path().join("50% off.png");
        std::fs::write(&odd, b"png").unwrap();
        let uri = image_uri(&odd.to_string_lossy()).unwrap();
        assert!(uri.ends_with("50%25%20off.png"));
    }
}
