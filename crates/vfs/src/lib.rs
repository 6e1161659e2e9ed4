//! Read-only FUSE filesystem synthesized from a tree document.
//!
//! This crate mounts a [`jsonfs_model::TreeDocument`] as a virtual
//! filesystem. Files can be opened, stat'd, listed, and read, but no
//! backing storage exists: content is synthesized on demand, either as a
//! constant fill byte or from a pre-generated pool of deterministic
//! pseudo-random blocks.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: FUSE interface (fuser::Filesystem impl)
//! Layer 2: Path operations (lookup, attributes, readdir, read windows)
//! Layer 1: Primitives (TreeIndex, BlockCache, ContentSynthesizer, OpGate)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use jsonfs_model::TreeDocument;
//! use jsonfs_vfs::{JsonFs, VfsOptions};
//!
//! let doc = TreeDocument::decode(&json_str)?;
//! let fs = JsonFs::new(&doc, VfsOptions::default())?;
//! jsonfs_vfs::mount(fs, "/mnt/fake".as_ref())?;
//! ```

pub mod blocks;
pub mod builder;
pub mod entry;
pub mod error;
pub mod fuse;
pub mod limiter;
pub mod options;
pub mod sanitize;
pub mod stats;
pub mod synth;

pub use blocks::BlockCache;
pub use builder::{build_tree, MACOS_CACHE_CONTROL_FILES};
pub use entry::{DirEntry, Entry, EntryId, EntryKind, FileEntry, TreeIndex, ROOT_ENTRY};
pub use error::VfsError;
pub use fuse::{mount, spawn_mount, JsonFs};
pub use limiter::{IopsLimiter, OpGate, RateLimiter};
pub use options::{ContentMode, VfsOptions};
pub use sanitize::{NormalizationForm, PathSanitizer};
pub use stats::{OpCounters, StatsReporter};
pub use synth::ContentSynthesizer;
