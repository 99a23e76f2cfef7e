/// Error types for the closet catalog
///
/// Asset-level failures never leave the asset store as errors; they are
/// logged there and surface here only as `AssetCopy` once the repository
/// decides a failed copy aborts the operation.
use thiserror::Error;

/// Errors returned by catalog and repository operations
#[derive(Debug, Error)]
pub enum ClosetError {
    /// The SQLite engine rejected a statement (constraint, I/O, corruption)
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem error outside of the asset copy path
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A picked photo could not be decoded or re-encoded
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// An external image reference could not be copied into internal storage
    #[error("could not import image from {uri}")]
    AssetCopy { uri: String },

    /// A write targeted a row that does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Caller supplied a value the catalog refuses to store
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be resolved
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClosetError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ClosetError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ClosetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = ClosetError::not_found("clothing item", "abc");
        assert_eq!(err.to_string(), "clothing item abc not found");
    }

    #[test]
    fn test_sqlite_error_converts() {
        let err: ClosetError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, ClosetError::Database(_)));
    }
}
