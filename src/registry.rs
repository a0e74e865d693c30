use crate::decoded_image::DecodedImage;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Opaque reference to binary image data supplied by the host.
///
/// Handles are cheap to clone; the underlying bytes are shared.
#[derive(Clone)]
pub struct FileHandle {
    name: Option<String>,
    data: Arc<[u8]>,
}

impl FileHandle {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            name: None,
            data: Arc::from(data),
        }
    }

    /// Read a file from disk into a handle, keeping the file name for
    /// diagnostics.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        Ok(Self {
            name: path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_owned),
            data: Arc::from(data),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Generated key associating a [`FileHandle`] with a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    fn new(seq: u64) -> Self {
        Self(format!("dicomfile:{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct RegistryEntry {
    handle: FileHandle,
    image: Option<Arc<DecodedImage>>,
}

/// Session-scoped registry mapping generated identifiers to file handles
/// and their cached decode results.
///
/// Entries are never evicted implicitly; callers control the lifecycle
/// through [`ImageRegistry::remove`] and [`ImageRegistry::clear`].
#[derive(Default)]
pub struct ImageRegistry {
    next_seq: AtomicU64,
    entries: Mutex<HashMap<ImageId, RegistryEntry>>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle and mint a fresh identifier for it.
    pub fn add(&self, handle: FileHandle) -> ImageId {
        let id = ImageId::new(self.next_seq.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(id.clone(), RegistryEntry {
            handle,
            image: None,
        });
        id
    }

    pub fn handle(&self, id: &ImageId) -> Option<FileHandle> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(id).map(|entry| entry.handle.clone())
    }

    /// Cache the decode result for an existing entry. A miss on `id` is
    /// ignored; the entry may have been removed concurrently.
    pub fn store_image(&self, id: &ImageId, image: Arc<DecodedImage>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(id) {
            entry.image = Some(image);
        }
    }

    pub fn cached_image(&self, id: &ImageId) -> Option<Arc<DecodedImage>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(id).and_then(|entry| entry.image.clone())
    }

    pub fn remove(&self, id: &ImageId) -> Option<FileHandle> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(id).map(|entry| entry.handle)
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
