/// State management module
///
/// This module handles all persistent state, including:
/// - Database connections and queries (catalog.rs)
/// - Shared data structures (data.rs)
/// - Live query subscriptions (live.rs)
/// - The repository tying the catalog to stored photos (repository.rs)

pub mod catalog;
pub mod data;
pub mod live;
pub mod repository;
