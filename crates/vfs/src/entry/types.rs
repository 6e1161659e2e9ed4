//! Core entry types and traits.

use std::any::Any;

/// Unique identifier for an entry, used as the FUSE inode number.
pub type EntryId = u64;

/// Root directory entry ID (always 1 per FUSE convention).
pub const ROOT_ENTRY: EntryId = 1;

/// Kind of tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Common trait for all entry types.
pub trait Entry: Send + Sync + std::fmt::Debug {
    /// Get the entry ID.
    fn id(&self) -> EntryId;

    /// Get the parent entry ID.
    fn parent_id(&self) -> EntryId;

    /// Get the entry name (a single normalized path component).
    fn name(&self) -> &str;

    /// Get the canonical absolute path ("/" for the root).
    fn path(&self) -> &str;

    /// Get the entry kind.
    fn kind(&self) -> EntryKind;

    /// Get the logical size in bytes.
    fn size(&self) -> u64;

    /// Get the permissions (POSIX mode bits).
    fn permissions(&self) -> u16;

    /// Downcast to Any for type-safe downcasting.
    fn as_any(&self) -> &dyn Any;
}
