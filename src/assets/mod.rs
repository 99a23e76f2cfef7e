/// Image asset module
///
/// This module handles:
/// - Resolving external photo references into bytes
/// - Copying picked photos into app-private storage as JPEGs
/// - Deleting and listing stored photos

pub mod resolver;
pub mod store;

pub use resolver::{ContentResolver, FileUriResolver, MemoryResolver};
pub use store::AssetStore;
