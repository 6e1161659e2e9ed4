//! Builder turning a validated tree document into the directory index.

use jsonfs_model::{NodeKind, TreeDocument, TreeNode};

use crate::entry::{EntryId, TreeIndex, ROOT_ENTRY};
use crate::error::VfsError;
use crate::sanitize::PathSanitizer;

/// Zero-size root entries that stop Spotlight from indexing the volume.
pub const MACOS_CACHE_CONTROL_FILES: [&str; 3] = [
    ".metadata_never_index",
    ".metadata_never_index_unless_rootfs",
    ".metadata_direct_scope_only",
];

/// Build the directory index from a validated document.
///
/// Walks the tree in one pass, composing each node's canonical path from
/// its ancestors' normalized names. Duplicate siblings after
/// normalization are fatal. The document totals are tallied before the
/// synthetic cache-suppression entries are appended, so they reflect the
/// declared tree only.
///
/// # Arguments
/// * `doc` - Validated tree document
/// * `sanitizer` - Sanitizer carrying the configured normalization form
/// * `macos_cache_files` - Append the cache-suppression entries to the root
pub fn build_tree(
    doc: &TreeDocument,
    sanitizer: &PathSanitizer,
    macos_cache_files: bool,
) -> Result<TreeIndex, VfsError> {
    let mut index: TreeIndex = TreeIndex::new();

    for child in &doc.root.contents {
        insert_node(&index, ROOT_ENTRY, child, sanitizer)?;
    }

    index.set_totals(doc.file_count(), doc.total_size());

    if macos_cache_files {
        for name in MACOS_CACHE_CONTROL_FILES {
            // A declared entry with the same name keeps priority.
            if index.get_by_path(&format!("/{}", name)).is_none() {
                index.add_file(ROOT_ENTRY, name, 0)?;
            }
        }
        tracing::debug!("added macOS cache control entries to the root");
    }

    Ok(index)
}

/// Insert one node and, for directories, its subtree.
fn insert_node(
    index: &TreeIndex,
    parent_id: EntryId,
    node: &TreeNode,
    sanitizer: &PathSanitizer,
) -> Result<(), VfsError> {
    let name: String = sanitizer.normalize_component(&node.name);
    match node.kind {
        NodeKind::File => {
            index.add_file(parent_id, &name, node.size)?;
        }
        NodeKind::Directory => {
            let id: EntryId = index.add_directory(parent_id, &name, node.size)?;
            for child in &node.contents {
                insert_node(index, id, child, sanitizer)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, EntryKind};
    use crate::sanitize::NormalizationForm;
    use std::sync::Arc;

    fn decode(json: &str) -> TreeDocument {
        TreeDocument::decode(json).unwrap()
    }

    fn build(json: &str, form: NormalizationForm, macos: bool) -> Result<TreeIndex, VfsError> {
        let sanitizer: PathSanitizer = PathSanitizer::new(form);
        build_tree(&decode(json), &sanitizer, macos)
    }

    const SIMPLE: &str = r#"[{"type": "directory", "name": "/", "contents": [
        {"type": "file", "name": "test.txt", "size": 100},
        {"type": "directory", "name": "subdir", "contents": [
            {"type": "file", "name": "nested.txt", "size": 50}
        ]}
    ]}]"#;

    #[test]
    fn test_build_simple_tree() {
        let index: TreeIndex = build(SIMPLE, NormalizationForm::Nfd, false).unwrap();

        let file: Arc<dyn Entry> = index.get_by_path("/test.txt").unwrap();
        assert_eq!(file.kind(), EntryKind::File);
        assert_eq!(file.size(), 100);

        let nested: Arc<dyn Entry> = index.get_by_path("/subdir/nested.txt").unwrap();
        assert_eq!(nested.size(), 50);

        assert_eq!(index.total_files(), 2);
        assert_eq!(index.total_bytes(), 150);
    }

    #[test]
    fn test_macos_entries_added() {
        let index: TreeIndex = build(SIMPLE, NormalizationForm::Nfd, true).unwrap();
        for name in MACOS_CACHE_CONTROL_FILES {
            let entry: Arc<dyn Entry> =
                index.get_by_path(&format!("/{}", name)).unwrap();
            assert_eq!(entry.kind(), EntryKind::File);
            assert_eq!(entry.size(), 0);
        }
        // Synthetic entries stay out of the declared totals.
        assert_eq!(index.total_files(), 2);
    }

    #[test]
    fn test_macos_entries_suppressed() {
        let index: TreeIndex = build(SIMPLE, NormalizationForm::Nfd, false).unwrap();
        for name in MACOS_CACHE_CONTROL_FILES {
            assert!(index.get_by_path(&format!("/{}", name)).is_none());
        }
    }

    #[test]
    fn test_duplicate_siblings_fatal() {
        let json = r#"[{"type": "directory", "name": "/", "contents": [
            {"type": "file", "name": "same", "size": 1},
            {"type": "file", "name": "same", "size": 2}
        ]}]"#;
        assert!(matches!(
            build(json, NormalizationForm::Nfd, false).unwrap_err(),
            VfsError::DuplicateEntry(path) if path == "/same"
        ));
    }

    #[test]
    fn test_duplicates_after_normalization_fatal() {
        // Same name in NFC and NFD spellings collides once normalized.
        let json = "[{\"type\": \"directory\", \"name\": \"/\", \"contents\": [
            {\"type\": \"file\", \"name\": \"caf\\u00e9\", \"size\": 1},
            {\"type\": \"file\", \"name\": \"cafe\\u0301\", \"size\": 2}
        ]}]";
        assert!(matches!(
            build(json, NormalizationForm::Nfd, false).unwrap_err(),
            VfsError::DuplicateEntry(_)
        ));
        // With normalization off the two spellings are distinct names.
        assert!(build(json, NormalizationForm::None, false).is_ok());
    }

    #[test]
    fn test_index_keys_are_normalized() {
        let json = "[{\"type\": \"directory\", \"name\": \"/\", \"contents\": [
            {\"type\": \"file\", \"name\": \"caf\\u00e9.txt\", \"size\": 1}
        ]}]";
        let index: TreeIndex = build(json, NormalizationForm::Nfd, false).unwrap();
        assert!(index.get_by_path("/cafe\u{301}.txt").is_some());
        assert!(index.get_by_path("/caf\u{e9}.txt").is_none());
    }

    #[test]
    fn test_declared_name_beats_synthetic_entry() {
        let json = r#"[{"type": "directory", "name": "/", "contents": [
            {"type": "file", "name": ".metadata_never_index", "size": 9}
        ]}]"#;
        let index: TreeIndex = build(json, NormalizationForm::Nfd, true).unwrap();
        let entry: Arc<dyn Entry> = index.get_by_path("/.metadata_never_index").unwrap();
        assert_eq!(entry.size(), 9);
    }
}
