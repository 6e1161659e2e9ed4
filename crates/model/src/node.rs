//! Tree node types.

use serde::{Deserialize, Serialize};

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// One node of a validated tree document.
///
/// Names are stored verbatim as they appeared in the document; Unicode
/// normalization happens downstream, in the filesystem layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Node kind.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Entry name (a single path component; "/" for the root).
    pub name: String,
    /// Logical size in bytes. Advisory for directories.
    #[serde(default)]
    pub size: u64,
    /// Child nodes (directories only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<TreeNode>,
}

impl TreeNode {
    /// Create a file node.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            kind: NodeKind::File,
            name: name.into(),
            size,
            contents: Vec::new(),
        }
    }

    /// Create a directory node.
    pub fn directory(name: impl Into<String>, contents: Vec<TreeNode>) -> Self {
        Self {
            kind: NodeKind::Directory,
            name: name.into(),
            size: 0,
            contents,
        }
    }

    /// Count the files in this subtree.
    pub fn file_count(&self) -> u64 {
        match self.kind {
            NodeKind::File => 1,
            NodeKind::Directory => self.contents.iter().map(TreeNode::file_count).sum(),
        }
    }

    /// Total declared bytes of the files in this subtree.
    ///
    /// Directory sizes are advisory and do not contribute.
    pub fn total_size(&self) -> u64 {
        match self.kind {
            NodeKind::File => self.size,
            NodeKind::Directory => self.contents.iter().map(TreeNode::total_size).sum(),
        }
    }
}
