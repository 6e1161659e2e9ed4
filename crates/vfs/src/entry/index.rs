//! The directory index mapping canonical paths to entries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::VfsError;

use super::dir::DirEntry;
use super::file::FileEntry;
use super::types::{Entry, EntryId, EntryKind, ROOT_ENTRY};

/// Immutable map from canonical absolute path to entry.
///
/// Constructed once by the tree builder before mounting; callbacks hold
/// only shared views. Membership in the index is the definition of
/// existence: lookups never allocate new entries.
#[derive(Debug)]
pub struct TreeIndex {
    /// Next entry ID to allocate.
    next_id: AtomicU64,
    /// All entries by ID.
    entries: RwLock<HashMap<EntryId, Arc<dyn Entry>>>,
    /// Canonical path to entry ID.
    path_index: RwLock<HashMap<String, EntryId>>,
    /// Total declared files (synthetic entries excluded).
    total_files: u64,
    /// Total declared bytes (synthetic entries excluded).
    total_bytes: u64,
}

impl TreeIndex {
    /// Create a new index holding only the root directory at "/".
    pub fn new() -> Self {
        let index = Self {
            next_id: AtomicU64::new(ROOT_ENTRY + 1),
            entries: RwLock::new(HashMap::new()),
            path_index: RwLock::new(HashMap::new()),
            total_files: 0,
            total_bytes: 0,
        };

        let root: Arc<DirEntry> = Arc::new(DirEntry::new(
            ROOT_ENTRY,
            ROOT_ENTRY,
            "/".to_string(),
            "/".to_string(),
            0,
        ));

        {
            let mut entries: std::sync::RwLockWriteGuard<'_, HashMap<EntryId, Arc<dyn Entry>>> =
                index.entries.write().unwrap();
            entries.insert(ROOT_ENTRY, root);
        }
        {
            let mut path_index: std::sync::RwLockWriteGuard<'_, HashMap<String, EntryId>> =
                index.path_index.write().unwrap();
            path_index.insert("/".to_string(), ROOT_ENTRY);
        }

        index
    }

    /// Allocate a new entry ID.
    fn allocate_id(&self) -> EntryId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Get an entry by ID.
    pub fn get(&self, id: EntryId) -> Option<Arc<dyn Entry>> {
        let entries: std::sync::RwLockReadGuard<'_, HashMap<EntryId, Arc<dyn Entry>>> =
            self.entries.read().unwrap();
        entries.get(&id).cloned()
    }

    /// Get an entry by canonical absolute path.
    ///
    /// A `None` answer is definitive: the path does not exist.
    pub fn get_by_path(&self, path: &str) -> Option<Arc<dyn Entry>> {
        let path_index: std::sync::RwLockReadGuard<'_, HashMap<String, EntryId>> =
            self.path_index.read().unwrap();
        let id: EntryId = *path_index.get(path)?;
        drop(path_index);
        self.get(id)
    }

    /// Get the root directory.
    pub fn root(&self) -> Arc<dyn Entry> {
        self.get(ROOT_ENTRY).expect("root entry must exist")
    }

    /// Get children of a directory as (name, entry_id) pairs in document
    /// order.
    pub fn get_dir_children(&self, id: EntryId) -> Option<Vec<(String, EntryId)>> {
        let entry: Arc<dyn Entry> = self.get(id)?;
        let dir: &DirEntry = entry.as_any().downcast_ref::<DirEntry>()?;
        Some(dir.children())
    }

    /// Add a directory under an existing parent.
    ///
    /// # Arguments
    /// * `parent_id` - Parent directory entry ID
    /// * `name` - Normalized directory name
    /// * `advisory_size` - Advisory size from the source document
    ///
    /// # Returns
    /// The new entry ID, or `DuplicateEntry` if the parent already has a
    /// child with this name.
    pub fn add_directory(
        &self,
        parent_id: EntryId,
        name: &str,
        advisory_size: u64,
    ) -> Result<EntryId, VfsError> {
        self.insert_child(parent_id, name, |id, parent_id, path| {
            Arc::new(DirEntry::new(
                id,
                parent_id,
                name.to_string(),
                path,
                advisory_size,
            ))
        })
    }

    /// Add a file under an existing parent.
    ///
    /// # Arguments
    /// * `parent_id` - Parent directory entry ID
    /// * `name` - Normalized file name
    /// * `size` - Declared size in bytes
    ///
    /// # Returns
    /// The new entry ID, or `DuplicateEntry` if the parent already has a
    /// child with this name.
    pub fn add_file(&self, parent_id: EntryId, name: &str, size: u64) -> Result<EntryId, VfsError> {
        self.insert_child(parent_id, name, |id, parent_id, path| {
            Arc::new(FileEntry::new(id, parent_id, name.to_string(), path, size))
        })
    }

    /// Shared insertion path for files and directories.
    fn insert_child(
        &self,
        parent_id: EntryId,
        name: &str,
        make: impl FnOnce(EntryId, EntryId, String) -> Arc<dyn Entry>,
    ) -> Result<EntryId, VfsError> {
        let parent: Arc<dyn Entry> = self
            .get(parent_id)
            .ok_or_else(|| VfsError::PathNotFound(format!("entry #{}", parent_id)))?;
        let parent_dir: &DirEntry = parent
            .as_any()
            .downcast_ref::<DirEntry>()
            .ok_or_else(|| VfsError::NotADirectory(parent.path().to_string()))?;

        let path: String = join_path(parent.path(), name);
        let id: EntryId = self.allocate_id();
        let entry: Arc<dyn Entry> = make(id, parent_id, path.clone());

        if !parent_dir.add_child(name.to_string(), id) {
            return Err(VfsError::DuplicateEntry(path));
        }

        {
            let mut entries: std::sync::RwLockWriteGuard<'_, HashMap<EntryId, Arc<dyn Entry>>> =
                self.entries.write().unwrap();
            entries.insert(id, entry);
        }
        {
            let mut path_index: std::sync::RwLockWriteGuard<'_, HashMap<String, EntryId>> =
                self.path_index.write().unwrap();
            path_index.insert(path, id);
        }

        Ok(id)
    }

    /// Check whether an entry is a directory.
    pub fn is_directory(&self, id: EntryId) -> bool {
        self.get(id)
            .map(|e: Arc<dyn Entry>| e.kind() == EntryKind::Directory)
            .unwrap_or(false)
    }

    /// Get the total number of entries, synthetic ones included.
    pub fn entry_count(&self) -> usize {
        let entries: std::sync::RwLockReadGuard<'_, HashMap<EntryId, Arc<dyn Entry>>> =
            self.entries.read().unwrap();
        entries.len()
    }

    /// Total declared files (from the document; synthetic entries excluded).
    pub fn total_files(&self) -> u64 {
        self.total_files
    }

    /// Total declared bytes (from the document; synthetic entries excluded).
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Record the document totals. Called once by the builder.
    pub(crate) fn set_totals(&mut self, files: u64, bytes: u64) {
        self.total_files = files;
        self.total_bytes = bytes;
    }
}

impl Default for TreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Join a canonical parent path and a child name.
fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}
