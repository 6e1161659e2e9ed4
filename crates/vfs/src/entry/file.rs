//! File entry implementation.

use std::any::Any;

use super::types::{Entry, EntryId, EntryKind};

/// File permissions, read-only by construction (r--r--r--).
pub const FILE_PERMS: u16 = 0o444;

/// Entry representing a regular file with a declared logical size.
///
/// No content is stored; reads are synthesized on demand.
#[derive(Debug)]
pub struct FileEntry {
    /// Entry ID.
    id: EntryId,
    /// Parent directory entry ID.
    parent_id: EntryId,
    /// File name.
    name: String,
    /// Canonical absolute path.
    path: String,
    /// Declared size in bytes.
    size: u64,
}

impl FileEntry {
    /// Create a new file entry.
    ///
    /// # Arguments
    /// * `id` - Entry ID
    /// * `parent_id` - Parent directory entry ID
    /// * `name` - File name
    /// * `path` - Canonical absolute path
    /// * `size` - Declared size in bytes
    pub fn new(id: EntryId, parent_id: EntryId, name: String, path: String, size: u64) -> Self {
        Self {
            id,
            parent_id,
            name,
            path,
            size,
        }
    }
}

impl Entry for FileEntry {
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
        EntryKind::File
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn permissions(&self) -> u16 {
        FILE_PERMS
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
