//! Tree document model for the jsonfs virtual filesystem.
//!
//! This crate decodes and validates the JSON tree documents produced by
//! directory enumeration tools. A document is a JSON array whose first
//! element is the root directory; every node carries a `type`, a `name`,
//! a `size`, and (for directories) a `contents` list of child nodes.
//!
//! The crate also provides the byte-size helpers shared by the CLI and
//! the filesystem layer (`parse_size`, `humanize_bytes`).

pub mod document;
pub mod error;
pub mod node;
pub mod size;

pub use document::TreeDocument;
pub use error::DocumentError;
pub use node::{NodeKind, TreeNode};
pub use size::{humanize_bytes, parse_size, InvalidSize};
