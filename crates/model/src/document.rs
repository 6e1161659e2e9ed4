//! Tree document decoding and validation.

use serde_json::Value;

use crate::error::DocumentError;
use crate::node::{NodeKind, TreeNode};

/// Largest size a node may declare. Sizes must survive signed 64-bit
/// metadata fields, so bit 63 stays clear.
pub const MAX_NODE_SIZE: u64 = i64::MAX as u64;

/// A validated tree document.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeDocument {
    /// The root directory.
    pub root: TreeNode,
}

impl TreeDocument {
    /// Decode a tree document from a JSON string.
    ///
    /// The top level must be a non-empty array whose first element is the
    /// root directory. Validation errors name the offending node's path.
    ///
    /// # Arguments
    /// * `json` - Document text
    pub fn decode(json: &str) -> Result<Self, DocumentError> {
        let data: Value = serde_json::from_str(json)?;
        Self::from_value(&data)
    }

    /// Decode a tree document from an already-parsed JSON value.
    pub fn from_value(data: &Value) -> Result<Self, DocumentError> {
        let seq: &Vec<Value> = data.as_array().ok_or(DocumentError::NotASequence)?;
        let first: &Value = seq.first().ok_or(DocumentError::Empty)?;

        let root: TreeNode = decode_node(first, "/", true)?;
        if root.kind != NodeKind::Directory {
            return Err(DocumentError::RootNotDirectory);
        }
        Ok(Self { root })
    }

    /// Total number of files declared in the document.
    pub fn file_count(&self) -> u64 {
        self.root.file_count()
    }

    /// Total declared bytes across all files.
    pub fn total_size(&self) -> u64 {
        self.root.total_size()
    }
}

/// Decode and validate one node.
///
/// `path` is the parent's absolute path ("/" for the root node itself),
/// used to compose error locations. Unknown fields are ignored.
fn decode_node(value: &Value, path: &str, is_root: bool) -> Result<TreeNode, DocumentError> {
    let obj = value.as_object().ok_or_else(|| DocumentError::NotAnObject {
        path: path.to_string(),
    })?;

    let kind_str: &str = obj
        .get("type")
        .ok_or_else(|| DocumentError::MissingField {
            path: path.to_string(),
            field: "type",
        })?
        .as_str()
        .ok_or_else(|| DocumentError::InvalidField {
            path: path.to_string(),
            field: "type",
            expected: "must be a string",
        })?;

    let kind: NodeKind = match kind_str {
        "file" => NodeKind::File,
        "directory" => NodeKind::Directory,
        other => {
            return Err(DocumentError::UnknownKind {
                path: path.to_string(),
                kind: other.to_string(),
            })
        }
    };

    // The root may omit its name; enumeration tools emit it as "/".
    let name: String = match obj.get("name") {
        Some(v) => v
            .as_str()
            .ok_or_else(|| DocumentError::InvalidField {
                path: path.to_string(),
                field: "name",
                expected: "must be a string",
            })?
            .to_string(),
        None if is_root => "/".to_string(),
        None => {
            return Err(DocumentError::MissingField {
                path: path.to_string(),
                field: "name",
            })
        }
    };
    if !is_root && (name.contains('/') || name.contains('\0')) {
        return Err(DocumentError::InvalidName {
            path: join_path(path, &name),
        });
    }

    let node_path: String = if is_root { path.to_string() } else { join_path(path, &name) };

    let size: u64 = match obj.get("size") {
        Some(v) => {
            let n: u64 = v.as_u64().ok_or_else(|| DocumentError::InvalidField {
                path: node_path.clone(),
                field: "size",
                expected: "must be a non-negative integer",
            })?;
            if n > MAX_NODE_SIZE {
                return Err(DocumentError::InvalidField {
                    path: node_path.clone(),
                    field: "size",
                    expected: "must fit in 63 bits",
                });
            }
            n
        }
        // Directories carry size only as an advisory value.
        None if kind == NodeKind::Directory => 0,
        None => {
            return Err(DocumentError::MissingField {
                path: node_path.clone(),
                field: "size",
            })
        }
    };

    let contents: Vec<TreeNode> = match kind {
        NodeKind::File => Vec::new(),
        NodeKind::Directory => match obj.get("contents") {
            None => Vec::new(),
            Some(v) => {
                let children = v.as_array().ok_or_else(|| DocumentError::InvalidField {
                    path: node_path.clone(),
                    field: "contents",
                    expected: "must be an array",
                })?;
                children
                    .iter()
                    .map(|child| decode_node(child, &node_path, false))
                    .collect::<Result<Vec<TreeNode>, DocumentError>>()?
            }
        },
    };

    Ok(TreeNode {
        kind,
        name,
        size,
        contents,
    })
}

/// Join a parent path and a child name.
fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_simple_document() {
        let json = r#"[
            {"type": "directory", "name": "/", "contents": [
                {"type": "file", "name": "a.txt", "size": 5},
                {"type": "directory", "name": "sub", "contents": [
                    {"type": "file", "name": "b.bin", "size": 100}
                ]}
            ]}
        ]"#;

        let doc: TreeDocument = TreeDocument::decode(json).unwrap();
        assert_eq!(doc.root.name, "/");
        assert_eq!(doc.root.contents.len(), 2);
        assert_eq!(doc.file_count(), 2);
        assert_eq!(doc.total_size(), 105);
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let err = TreeDocument::decode(r#"{"type": "directory"}"#).unwrap_err();
        assert!(matches!(err, DocumentError::NotASequence));
    }

    #[test]
    fn test_decode_rejects_empty_array() {
        let err = TreeDocument::decode("[]").unwrap_err();
        assert!(matches!(err, DocumentError::Empty));
    }

    #[test]
    fn test_decode_rejects_file_root() {
        let err =
            TreeDocument::decode(r#"[{"type": "file", "name": "x", "size": 1}]"#).unwrap_err();
        assert!(matches!(err, DocumentError::RootNotDirectory));
    }

    #[test]
    fn test_root_defaults() {
        // Enumeration output sometimes omits the root name and contents.
        let doc = TreeDocument::decode(r#"[{"type": "directory"}]"#).unwrap();
        assert_eq!(doc.root.name, "/");
        assert!(doc.root.contents.is_empty());
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let json = r#"[{"type": "directory", "name": "/", "contents": [
            {"type": "socket", "name": "s", "size": 0}
        ]}]"#;
        match TreeDocument::decode(json).unwrap_err() {
            DocumentError::UnknownKind { path, kind } => {
                assert_eq!(path, "/");
                assert_eq!(kind, "socket");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_rejects_missing_file_size() {
        let json = r#"[{"type": "directory", "name": "/", "contents": [
            {"type": "file", "name": "nosize"}
        ]}]"#;
        match TreeDocument::decode(json).unwrap_err() {
            DocumentError::MissingField { path, field } => {
                assert_eq!(path, "/nosize");
                assert_eq!(field, "size");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_rejects_negative_size() {
        let json = r#"[{"type": "directory", "name": "/", "contents": [
            {"type": "file", "name": "f", "size": -5}
        ]}]"#;
        match TreeDocument::decode(json).unwrap_err() {
            DocumentError::InvalidField { path, field, .. } => {
                assert_eq!(path, "/f");
                assert_eq!(field, "size");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_rejects_size_above_63_bits() {
        let json = format!(
            r#"[{{"type": "directory", "name": "/", "contents": [
                {{"type": "file", "name": "f", "size": {}}}
            ]}}]"#,
            (i64::MAX as u64) + 1
        );
        assert!(TreeDocument::decode(&json).is_err());
    }

    #[test]
    fn test_decode_rejects_slash_in_name() {
        let json = r#"[{"type": "directory", "name": "/", "contents": [
            {"type": "file", "name": "a/b", "size": 1}
        ]}]"#;
        assert!(matches!(
            TreeDocument::decode(json).unwrap_err(),
            DocumentError::InvalidName { .. }
        ));
    }

    #[test]
    fn test_decode_rejects_nul_in_name() {
        let json = "[{\"type\": \"directory\", \"name\": \"/\", \"contents\": [
            {\"type\": \"file\", \"name\": \"a\\u0000b\", \"size\": 1}
        ]}]";
        assert!(matches!(
            TreeDocument::decode(json).unwrap_err(),
            DocumentError::InvalidName { .. }
        ));
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let json = r#"[{"type": "directory", "name": "/", "mode": "0755", "contents": [
            {"type": "file", "name": "f", "size": 1, "target": ""}
        ]}]"#;
        let doc = TreeDocument::decode(json).unwrap();
        assert_eq!(doc.file_count(), 1);
    }

    #[test]
    fn test_error_path_names_nested_node() {
        let json = r#"[{"type": "directory", "name": "/", "contents": [
            {"type": "directory", "name": "outer", "contents": [
                {"type": "file", "name": "inner", "size": "big"}
            ]}
        ]}]"#;
        match TreeDocument::decode(json).unwrap_err() {
            DocumentError::InvalidField { path, .. } => assert_eq!(path, "/outer/inner"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hostile_names_are_preserved() {
        let json = r#"[{"type": "directory", "name": "/", "contents": [
            {"type": "file", "name": " leading space", "size": 1},
            {"type": "file", "name": "-", "size": 1},
            {"type": "file", "name": "üñïçødé 😀", "size": 1}
        ]}]"#;
        let doc = TreeDocument::decode(json).unwrap();
        let names: Vec<&str> = doc.root.contents.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec![" leading space", "-", "üñïçødé 😀"]);
    }
}
