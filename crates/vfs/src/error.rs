//! Error types for the VFS crate.

use std::fmt;

/// Errors that can occur during VFS construction or operations.
#[derive(Debug)]
pub enum VfsError {
    /// Path not present in the directory index.
    PathNotFound(String),

    /// Directory operation on a non-directory.
    NotADirectory(String),

    /// File operation on a non-file.
    NotAFile(String),

    /// Two siblings share a name after normalization.
    DuplicateEntry(String),

    /// Mutating operation on the read-only filesystem.
    ReadOnly,

    /// Configuration value rejected before mounting.
    InvalidConfig(String),

    /// The FUSE bridge refused to attach.
    MountFailed(String),
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::PathNotFound(path) => write!(f, "path not found: {}", path),
            VfsError::NotADirectory(path) => write!(f, "not a directory: {}", path),
            VfsError::NotAFile(path) => write!(f, "not a file: {}", path),
            VfsError::DuplicateEntry(path) => {
                write!(f, "duplicate entry after normalization: {}", path)
            }
            VfsError::ReadOnly => write!(f, "read-only filesystem"),
            VfsError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            VfsError::MountFailed(msg) => write!(f, "mount failed: {}", msg),
        }
    }
}

impl std::error::Error for VfsError {}

impl VfsError {
    /// POSIX errno for this error at the FUSE callback boundary.
    pub fn errno(&self) -> i32 {
        match self {
            VfsError::PathNotFound(_) => libc::ENOENT,
            VfsError::NotADirectory(_) => libc::ENOTDIR,
            VfsError::NotAFile(_) => libc::EISDIR,
            VfsError::ReadOnly => libc::EROFS,
            VfsError::DuplicateEntry(_)
            | VfsError::InvalidConfig(_)
            | VfsError::MountFailed(_) => libc::EIO,
        }
    }
}
