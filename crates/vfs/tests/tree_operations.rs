//! Lookup, attribute, and listing behavior of a mounted tree.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::FileType;
use jsonfs_model::TreeDocument;
use jsonfs_vfs::{
    ContentMode, Entry, JsonFs, NormalizationForm, VfsError, VfsOptions,
    MACOS_CACHE_CONTROL_FILES,
};

const SIMPLE_DOC: &str = r#"[
    {"type": "directory", "name": "/", "contents": [
        {"type": "directory", "name": "test", "size": 0, "contents": [
            {"type": "file", "name": "a", "size": 5}
        ]},
        {"type": "file", "name": "big.bin", "size": 5000000000}
    ]}
]"#;

fn mount_doc(json: &str, options: VfsOptions) -> JsonFs {
    let doc: TreeDocument = TreeDocument::decode(json).unwrap();
    JsonFs::new(&doc, options).unwrap()
}

fn plain_options() -> VfsOptions {
    VfsOptions {
        macos_cache_files: false,
        ..VfsOptions::default()
    }
}

#[test]
fn test_getattr_directory_and_missing_path() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, plain_options());

    let attr = fs.attr_for_path("/test").unwrap();
    assert_eq!(attr.kind, FileType::Directory);
    assert_eq!(attr.perm, 0o555);
    assert_eq!(attr.nlink, 2);

    let err: VfsError = fs.attr_for_path("/nope").unwrap_err();
    assert_eq!(err.errno(), libc::ENOENT);
}

#[test]
fn test_getattr_file() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, plain_options());

    let attr = fs.attr_for_path("/test/a").unwrap();
    assert_eq!(attr.kind, FileType::RegularFile);
    assert_eq!(attr.perm, 0o444);
    assert_eq!(attr.nlink, 1);
    assert_eq!(attr.size, 5);
}

#[test]
fn test_sizes_past_32_bits_survive() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, plain_options());
    let attr = fs.attr_for_path("/big.bin").unwrap();
    assert_eq!(attr.size, 5_000_000_000);
}

#[test]
fn test_uniform_ownership_and_mtime() {
    let mtime: SystemTime = UNIX_EPOCH + Duration::from_secs(1_500_000_000);
    let options: VfsOptions = VfsOptions {
        uid: 1234,
        gid: 5678,
        mtime,
        ..plain_options()
    };
    let fs: JsonFs = mount_doc(SIMPLE_DOC, options);

    for path in ["/test", "/test/a", "/big.bin"] {
        let attr = fs.attr_for_path(path).unwrap();
        assert_eq!(attr.uid, 1234);
        assert_eq!(attr.gid, 5678);
        assert_eq!(attr.mtime, mtime);
    }
}

#[test]
fn test_existence_matches_loader_insertions() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, plain_options());

    for path in ["/", "/test", "/test/a", "/big.bin"] {
        assert!(fs.attr_for_path(path).is_ok(), "expected {path} to exist");
    }
    for path in ["/test/b", "/TEST", "/big.bin/x", "/a"] {
        assert!(fs.attr_for_path(path).is_err(), "expected {path} to be absent");
    }
}

#[test]
fn test_lookup_tolerates_messy_paths() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, plain_options());

    assert!(fs.attr_for_path("//test").is_ok());
    assert!(fs.attr_for_path("/test/").is_ok());
    assert!(fs.attr_for_path("/./test/../test/a").is_ok());
    assert!(fs.attr_for_path("/test\0/a").is_ok());
}

#[test]
fn test_readdir_order_and_dot_entries() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, plain_options());

    assert_eq!(fs.dir_entries("/test").unwrap(), vec![".", "..", "a"]);
    assert_eq!(
        fs.dir_entries("/").unwrap(),
        vec![".", "..", "test", "big.bin"]
    );
}

#[test]
fn test_readdir_on_file_is_not_a_directory() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, plain_options());
    let err: VfsError = fs.dir_entries("/test/a").unwrap_err();
    assert_eq!(err.errno(), libc::ENOTDIR);
}

#[test]
fn test_normalized_lookup_under_nfd() {
    let doc: &str = "[{\"type\": \"directory\", \"name\": \"/\", \"contents\": [
        {\"type\": \"file\", \"name\": \"caf\\u00e9.txt\", \"size\": 3}
    ]}]";
    let fs: JsonFs = mount_doc(doc, plain_options());

    // Both spellings resolve because queries are normalized too.
    assert!(fs.attr_for_path("/caf\u{e9}.txt").is_ok());
    assert!(fs.attr_for_path("/cafe\u{301}.txt").is_ok());
}

#[test]
fn test_unnormalized_lookup_is_exact() {
    let doc: &str = "[{\"type\": \"directory\", \"name\": \"/\", \"contents\": [
        {\"type\": \"file\", \"name\": \"caf\\u00e9.txt\", \"size\": 3}
    ]}]";
    let options: VfsOptions = VfsOptions {
        normalization: NormalizationForm::None,
        ..plain_options()
    };
    let fs: JsonFs = mount_doc(doc, options);

    assert!(fs.attr_for_path("/caf\u{e9}.txt").is_ok());
    assert!(fs.attr_for_path("/cafe\u{301}.txt").is_err());
}

#[test]
fn test_hostile_names_resolve() {
    let doc: &str = r#"[{"type": "directory", "name": "/", "contents": [
        {"type": "file", "name": " leading space", "size": 1},
        {"type": "file", "name": "emoji 😀.txt", "size": 1},
        {"type": "file", "name": "-", "size": 1}
    ]}]"#;
    let fs: JsonFs = mount_doc(doc, plain_options());

    assert!(fs.attr_for_path("/ leading space").is_ok());
    assert!(fs.attr_for_path("/emoji 😀.txt").is_ok());
    assert!(fs.attr_for_path("/-").is_ok());
}

#[test]
fn test_macos_cache_entries_by_default() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, VfsOptions::default());
    for name in MACOS_CACHE_CONTROL_FILES {
        let attr = fs.attr_for_path(&format!("/{}", name)).unwrap();
        assert_eq!(attr.size, 0);
        assert_eq!(attr.kind, FileType::RegularFile);
    }
}

#[test]
fn test_macos_cache_entries_suppressed() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, plain_options());
    for name in MACOS_CACHE_CONTROL_FILES {
        assert!(fs.attr_for_path(&format!("/{}", name)).is_err());
    }
}

#[test]
fn test_duplicate_siblings_abort_construction() {
    let doc: TreeDocument = TreeDocument::decode(
        r#"[{"type": "directory", "name": "/", "contents": [
            {"type": "file", "name": "x", "size": 1},
            {"type": "directory", "name": "x", "contents": []}
        ]}]"#,
    )
    .unwrap();
    assert!(matches!(
        JsonFs::new(&doc, plain_options()).unwrap_err(),
        VfsError::DuplicateEntry(_)
    ));
}

#[test]
fn test_counters_track_operations() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, plain_options());
    let counters = fs.counters();
    assert_eq!(counters.ops(), 0);

    fs.attr_for_path("/test").unwrap();
    fs.dir_entries("/test").unwrap();
    fs.read_path("/test/a", 5, 0).unwrap();

    assert_eq!(counters.ops(), 3);
    assert_eq!(counters.bytes_read(), 5);
}

#[test]
fn test_lookup_path_returns_shared_entries() {
    let fs: JsonFs = mount_doc(SIMPLE_DOC, plain_options());
    let a: Arc<dyn Entry> = fs.lookup_path("/test/a").unwrap();
    let b: Arc<dyn Entry> = fs.lookup_path("/test/a").unwrap();
    assert_eq!(a.id(), b.id());
    assert_eq!(a.path(), "/test/a");
}

#[test]
fn test_invalid_options_rejected_before_mount() {
    let doc: TreeDocument = TreeDocument::decode(SIMPLE_DOC).unwrap();
    let options: VfsOptions = VfsOptions {
        rate_limit: -1.0,
        ..plain_options()
    };
    assert!(matches!(
        JsonFs::new(&doc, options).unwrap_err(),
        VfsError::InvalidConfig(_)
    ));
}

#[test]
fn test_semi_random_options_flow_through() {
    let options: VfsOptions = VfsOptions {
        content: ContentMode::SemiRandom,
        block_count: 10,
        block_size: 1024,
        ..plain_options()
    };
    let fs: JsonFs = mount_doc(SIMPLE_DOC, options);
    assert_eq!(fs.read_path("/test/a", 100, 0).unwrap().len(), 5);
}
