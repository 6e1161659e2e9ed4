//! Directory entry implementation.

use std::any::Any;
use std::collections::HashMap;
use std::sync::RwLock;

use super::types::{Entry, EntryId, EntryKind};

/// Directory permissions, read-only by construction (r-xr-xr-x).
pub const DIR_PERMS: u16 = 0o555;

/// Child table: lookup map plus document order for readdir.
#[derive(Debug, Default)]
struct Children {
    order: Vec<(String, EntryId)>,
    by_name: HashMap<String, EntryId>,
}

/// Entry representing a directory.
#[derive(Debug)]
pub struct DirEntry {
    /// Entry ID.
    id: EntryId,
    /// Parent directory entry ID.
    parent_id: EntryId,
    /// Directory name.
    name: String,
    /// Canonical absolute path.
    path: String,
    /// Advisory size from the source document; not reported to the kernel.
    advisory_size: u64,
    /// Child entries in document order.
    children: RwLock<Children>,
}

impl DirEntry {
    /// Create a new directory entry.
    ///
    /// # Arguments
    /// * `id` - Entry ID
    /// * `parent_id` - Parent directory entry ID
    /// * `name` - Directory name
    /// * `path` - Canonical absolute path
    /// * `advisory_size` - Advisory size from the source document
    pub fn new(
        id: EntryId,
        parent_id: EntryId,
        name: String,
        path: String,
        advisory_size: u64,
    ) -> Self {
        Self {
            id,
            parent_id,
            name,
            path,
            advisory_size,
            children: RwLock::new(Children::default()),
        }
    }

    /// Add a child entry, preserving insertion order.
    ///
    /// # Arguments
    /// * `name` - Child entry name
    /// * `id` - Child entry ID
    ///
    /// # Returns
    /// `false` if a child with this name already exists.
    pub fn add_child(&self, name: String, id: EntryId) -> bool {
        let mut children: std::sync::RwLockWriteGuard<'_, Children> =
            self.children.write().unwrap();
        if children.by_name.contains_key(&name) {
            return false;
        }
        children.by_name.insert(name.clone(), id);
        children.order.push((name, id));
        true
    }

    /// Get a child entry ID by name.
    pub fn get_child(&self, name: &str) -> Option<EntryId> {
        let children: std::sync::RwLockReadGuard<'_, Children> = self.children.read().unwrap();
        children.by_name.get(name).copied()
    }

    /// Get all children as (name, entry_id) pairs in insertion order.
    pub fn children(&self) -> Vec<(String, EntryId)> {
        let children: std::sync::RwLockReadGuard<'_, Children> = self.children.read().unwrap();
        children.order.clone()
    }

    /// Get the number of children.
    pub fn child_count(&self) -> usize {
        let children: std::sync::RwLockReadGuard<'_, Children> = self.children.read().unwrap();
        children.order.len()
    }

    /// Get the advisory size carried from the source document.
    pub fn advisory_size(&self) -> u64 {
        self.advisory_size
    }
}

impl Entry for DirEntry {
    fn id(&self) -> EntryId {
        self.id
    }

    fn parent_id(&self) -> EntryId {
        self.parent_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Directory
    }

    fn size(&self) -> u64 {
        0
    }

    fn permissions(&self) -> u16 {
        DIR_PERMS
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
