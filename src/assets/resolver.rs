//! Content resolution for picked photos
//!
//! A resolver turns an opaque external reference (`content://...`,
//! `file://...`) into a readable byte stream. The asset store never
//! interprets references itself.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::sync::RwLock;
use url::Url;

/// Turns an external photo reference into a byte stream
pub trait ContentResolver: Send + Sync {
    fn open(&self, uri: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Resolves `file://` URIs against the local filesystem
///
/// Paths are percent-decoded; the host must be empty or `localhost`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileUriResolver;

impl ContentResolver for FileUriResolver {
    fn open(&self, uri: &str) -> io::Result<Box<dyn Read + Send>> {
        let url = Url::parse(uri)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{uri}: {e}")))?;
        if url.scheme() != "file" {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("no resolver for {uri}"),
            ));
        }
        let path = url.to_file_path().map_err(|()| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{uri} does not name a local file"),
            )
        })?;
        Ok(Box::new(File::open(path)?))
    }
}

/// Serves photos registered in memory, keyed by their URI
///
/// Useful for hosts that already hold the picked bytes and for tests.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uri.into(), bytes);
    }

    pub fn remove(&self, uri: &str) -> Option<Vec<u8>> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(uri)
    }
}

impl ContentResolver for MemoryResolver {
    fn open(&self, uri: &str) -> io::Result<Box<dyn Read + Send>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(uri) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("nothing registered for {uri}"),
            )),
        }
    }
}
