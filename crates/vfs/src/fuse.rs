//! FUSE filesystem implementation.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyXattr, Request, TimeOrNow,
};
use jsonfs_model::{humanize_bytes, NodeKind, TreeDocument, TreeNode};

use crate::blocks::BlockCache;
use crate::builder::build_tree;
use crate::entry::{Entry, EntryId, EntryKind, TreeIndex};
use crate::error::VfsError;
use crate::limiter::OpGate;
use crate::options::{ContentMode, VfsOptions};
use crate::sanitize::PathSanitizer;
use crate::stats::OpCounters;
use crate::synth::ContentSynthesizer;

/// Conventional size reported for directories.
const DIR_REPORT_SIZE: u64 = 4096;

/// Fixed statfs block size.
const STATFS_BSIZE: u32 = 512;

/// Host-indexer probe names that commonly miss; logged at debug only.
const HOST_PROBE_NAMES: [&str; 6] = [
    ".DS_Store",
    ".hidden",
    ".Spotlight-V100",
    ".Trashes",
    ".fseventsd",
    ".VolumeIcon.icns",
];

/// Read-only FUSE filesystem synthesized from a tree document.
///
/// All durable state is built here, before the kernel sees the first
/// callback; nothing is added, removed, or resized after mount.
#[derive(Debug)]
pub struct JsonFs {
    /// Immutable directory index.
    index: TreeIndex,
    /// Path sanitizer carrying the normalization form.
    sanitizer: PathSanitizer,
    /// Content synthesizer (fill or semi-random).
    synth: ContentSynthesizer,
    /// Rate / IOPS admission gate.
    gate: OpGate,
    /// Operation counters shared with the stats reporter.
    counters: Arc<OpCounters>,
    /// Mount options.
    options: VfsOptions,
}

impl JsonFs {
    /// Create a filesystem from a validated document.
    ///
    /// # Arguments
    /// * `doc` - Validated tree document
    /// * `options` - Mount configuration
    pub fn new(doc: &TreeDocument, options: VfsOptions) -> Result<Self, VfsError> {
        options.validate()?;

        let sanitizer: PathSanitizer = PathSanitizer::new(options.normalization);
        let index: TreeIndex = build_tree(doc, &sanitizer, options.macos_cache_files)?;

        let synth: ContentSynthesizer = match options.content {
            ContentMode::Fill(byte) => ContentSynthesizer::fill(byte),
            ContentMode::SemiRandom => {
                tracing::info!(
                    "generating {} blocks of {}",
                    options.block_count,
                    humanize_bytes(options.block_size)
                );
                ContentSynthesizer::semi_random(Arc::new(BlockCache::generate(
                    options.seed,
                    options.block_count,
                    options.block_size as usize,
                )))
            }
        };

        tracing::info!(
            "loaded tree: {} files, {}",
            index.total_files(),
            humanize_bytes(index.total_bytes())
        );
        tracing::info!(
            "content mode: {:?}, rate limit: {}s, IOP limit: {}",
            options.content,
            options.rate_limit,
            options.iop_limit
        );
        log_structure(&doc.root, 0, 2);

        let gate: OpGate = OpGate::from_options(&options);

        Ok(Self {
            index,
            sanitizer,
            synth,
            gate,
            counters: Arc::new(OpCounters::new()),
            options,
        })
    }

    /// Shared counters, for wiring up the stats reporter.
    pub fn counters(&self) -> Arc<OpCounters> {
        self.counters.clone()
    }

    /// The directory index.
    pub fn index(&self) -> &TreeIndex {
        &self.index
    }

    /// Look up an entry by raw path, sanitizing it first.
    pub fn lookup_path(&self, raw: &str) -> Result<Arc<dyn Entry>, VfsError> {
        let canonical: String = self.sanitizer.sanitize(raw);
        self.index
            .get_by_path(&canonical)
            .ok_or(VfsError::PathNotFound(canonical))
    }

    /// Resolve an entry by FUSE inode number.
    fn entry_by_id(&self, ino: u64) -> Result<Arc<dyn Entry>, VfsError> {
        self.index
            .get(ino)
            .ok_or_else(|| VfsError::PathNotFound(format!("inode {}", ino)))
    }

    /// Stat a path. Counts as one admitted operation.
    pub fn attr_for_path(&self, raw: &str) -> Result<FileAttr, VfsError> {
        self.getattr_entry(self.lookup_path(raw))
    }

    /// List a directory. Counts as one admitted operation.
    ///
    /// # Returns
    /// ".", "..", then the children in document order.
    pub fn dir_entries(&self, raw: &str) -> Result<Vec<String>, VfsError> {
        let entries: Vec<(EntryId, EntryKind, String)> =
            self.readdir_entry(self.lookup_path(raw))?;
        Ok(entries.into_iter().map(|(_, _, name)| name).collect())
    }

    /// Read a window from a file. Counts as one admitted operation.
    ///
    /// # Arguments
    /// * `raw` - File path
    /// * `length` - Requested length
    /// * `offset` - Window start
    pub fn read_path(&self, raw: &str, length: u64, offset: u64) -> Result<Arc<[u8]>, VfsError> {
        self.read_entry(self.lookup_path(raw), offset, length)
    }

    /// getattr core shared by the trait callback and the path API.
    fn getattr_entry(
        &self,
        entry: Result<Arc<dyn Entry>, VfsError>,
    ) -> Result<FileAttr, VfsError> {
        self.gate.admit();
        self.counters.record_op();
        let entry: Arc<dyn Entry> = entry?;
        Ok(self.attr_of(entry.as_ref()))
    }

    /// readdir core shared by the trait callback and the path API.
    ///
    /// # Returns
    /// (entry_id, kind, name) triples: ".", "..", then the children in
    /// document order.
    fn readdir_entry(
        &self,
        entry: Result<Arc<dyn Entry>, VfsError>,
    ) -> Result<Vec<(EntryId, EntryKind, String)>, VfsError> {
        self.gate.admit();
        self.counters.record_op();
        let entry: Arc<dyn Entry> = entry?;
        if entry.kind() != EntryKind::Directory {
            return Err(VfsError::NotADirectory(entry.path().to_string()));
        }

        let mut entries: Vec<(EntryId, EntryKind, String)> = vec![
            (entry.id(), EntryKind::Directory, ".".to_string()),
            (entry.parent_id(), EntryKind::Directory, "..".to_string()),
        ];
        if let Some(children) = self.index.get_dir_children(entry.id()) {
            for (name, child_id) in children {
                if let Some(child) = self.index.get(child_id) {
                    entries.push((child_id, child.kind(), name));
                }
            }
        }
        Ok(entries)
    }

    /// read core shared by the trait callback and the path API.
    fn read_entry(
        &self,
        entry: Result<Arc<dyn Entry>, VfsError>,
        offset: u64,
        length: u64,
    ) -> Result<Arc<[u8]>, VfsError> {
        self.gate.admit();
        self.counters.record_op();
        let entry: Arc<dyn Entry> = entry?;
        if entry.kind() != EntryKind::File {
            return Err(VfsError::NotAFile(entry.path().to_string()));
        }

        let data: Arc<[u8]> = self.synth.read(entry.path(), entry.size(), offset, length);
        self.counters.add_bytes(data.len() as u64);
        Ok(data)
    }

    /// Convert an entry to FUSE file attributes.
    fn attr_of(&self, entry: &dyn Entry) -> FileAttr {
        let (kind, size, nlink): (FileType, u64, u32) = match entry.kind() {
            EntryKind::Directory => (FileType::Directory, DIR_REPORT_SIZE, 2),
            EntryKind::File => (FileType::RegularFile, entry.size(), 1),
        };
        let mtime: SystemTime = self.options.mtime;

        FileAttr {
            ino: entry.id(),
            size,
            blocks: size.div_ceil(512),
            atime: mtime,
            mtime,
            ctime: mtime,
            crtime: UNIX_EPOCH,
            kind,
            perm: entry.permissions(),
            nlink,
            uid: self.options.uid,
            gid: self.options.gid,
            rdev: 0,
            blksize: STATFS_BSIZE,
            flags: 0,
        }
    }

    /// TTL for kernel attribute caching.
    fn ttl(&self) -> Duration {
        Duration::from_secs(1)
    }

    /// Log a lookup miss, demoting known host-indexer probes.
    fn note_missing(&self, parent_path: &str, name: &str) {
        if name.starts_with("._") {
            if !self.options.ignore_appledouble {
                tracing::warn!(
                    "AppleDouble companion not in tree: {}/{}",
                    parent_path.trim_end_matches('/'),
                    name
                );
            }
        } else if HOST_PROBE_NAMES.contains(&name) {
            tracing::debug!("host indexer probe: {}", name);
        } else {
            tracing::debug!("path not found: {}/{}", parent_path.trim_end_matches('/'), name);
        }
    }
}

/// Depth-limited debug dump of the loaded structure.
fn log_structure(node: &TreeNode, depth: usize, max_depth: usize) {
    if depth > max_depth {
        return;
    }
    let indent: String = "  ".repeat(depth);
    match node.kind {
        NodeKind::File => {
            tracing::debug!("{}{} (file, {})", indent, node.name, humanize_bytes(node.size));
        }
        NodeKind::Directory => {
            tracing::debug!("{}{} (directory)", indent, node.name);
            for child in node.contents.iter().take(5) {
                log_structure(child, depth + 1, max_depth);
            }
            if node.contents.len() > 5 {
                tracing::debug!("{}  ... ({} more items)", indent, node.contents.len() - 5);
            }
        }
    }
}

impl Filesystem for JsonFs {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name_str: String = match name.to_str() {
            Some(n) => self.sanitizer.normalize_component(n),
            // Non-UTF-8 names cannot match any declared (JSON) name.
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let parent_entry: Arc<dyn Entry> = match self.index.get(parent) {
            Some(e) => e,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };
        if parent_entry.kind() != EntryKind::Directory {
            reply.error(libc::ENOTDIR);
            return;
        }

        let path: String = if parent_entry.path() == "/" {
            format!("/{}", name_str)
        } else {
            format!("{}/{}", parent_entry.path(), name_str)
        };

        match self.index.get_by_path(&path) {
            Some(child) => reply.entry(&self.ttl(), &self.attr_of(child.as_ref()), 0),
            None => {
                self.note_missing(parent_entry.path(), &name_str);
                reply.error(libc::ENOENT);
            }
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        match self.getattr_entry(self.entry_by_id(ino)) {
            Ok(attr) => reply.attr(&self.ttl(), &attr),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let entries: Vec<(EntryId, EntryKind, String)> =
            match self.readdir_entry(self.entry_by_id(ino)) {
                Ok(entries) => entries,
                Err(e) => {
                    reply.error(e.errno());
                    return;
                }
            };

        for (i, (entry_ino, kind, name)) in entries.iter().enumerate().skip(offset as usize) {
            let file_type: FileType = match kind {
                EntryKind::File => FileType::RegularFile,
                EntryKind::Directory => FileType::Directory,
            };
            if reply.add(*entry_ino, (i + 1) as i64, file_type, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        if flags & libc::O_WRONLY != 0 || flags & libc::O_RDWR != 0 {
            reply.error(libc::EROFS);
            return;
        }
        match self.index.get(ino) {
            Some(_) => reply.opened(0, 0),
            None => reply.error(libc::ENOENT),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        match self.read_entry(self.entry_by_id(ino), offset as u64, size as u64) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.index.get(ino) {
            Some(entry) if entry.kind() == EntryKind::Directory => reply.opened(0, 0),
            Some(_) => reply.error(libc::ENOTDIR),
            None => reply.error(libc::ENOENT),
        }
    }

    fn releasedir(&mut self, _req: &Request, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn access(&mut self, _req: &Request, ino: u64, _mask: i32, reply: ReplyEmpty) {
        match self.index.get(ino) {
            Some(_) => reply.ok(),
            None => reply.error(libc::ENOENT),
        }
    }

    fn readlink(&mut self, _req: &Request, _ino: u64, reply: ReplyData) {
        reply.error(libc::EROFS);
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request,
        _ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        _size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        reply.error(libc::EROFS);
    }

    fn mknod(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn unlink(&mut self, _req: &Request, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rmdir(&mut self, _req: &Request, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn symlink(
        &mut self,
        _req: &Request,
        _parent: u64,
        _link_name: &OsStr,
        _target: &Path,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn rename(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(libc::EROFS);
    }

    fn link(
        &mut self,
        _req: &Request,
        _ino: u64,
        _newparent: u64,
        _newname: &OsStr,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn create(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: fuser::ReplyCreate,
    ) {
        reply.error(libc::EROFS);
    }

    fn write(
        &mut self,
        _req: &Request,
        _ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyWrite,
    ) {
        reply.error(libc::EROFS);
    }

    fn getxattr(
        &mut self,
        _req: &Request,
        _ino: u64,
        _name: &OsStr,
        _size: u32,
        reply: ReplyXattr,
    ) {
        reply.error(libc::ENODATA);
    }

    fn listxattr(&mut self, _req: &Request, _ino: u64, size: u32, reply: ReplyXattr) {
        if size == 0 {
            reply.size(0);
        } else {
            reply.data(&[]);
        }
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        let total_blocks: u64 = self.index.total_bytes().div_ceil(STATFS_BSIZE as u64);
        reply.statfs(
            total_blocks,
            0,
            0,
            self.index.total_files().max(1),
            0,
            STATFS_BSIZE,
            255,
            STATFS_BSIZE,
        );
    }
}

/// Mount the filesystem in the foreground; returns at unmount.
///
/// # Arguments
/// * `fs` - The filesystem to mount
/// * `mountpoint` - Path to mount at
pub fn mount(fs: JsonFs, mountpoint: &Path) -> Result<(), VfsError> {
    fuser::mount2(fs, mountpoint, &mount_options())
        .map_err(|e: std::io::Error| VfsError::MountFailed(e.to_string()))
}

/// Mount the filesystem in the background.
///
/// # Returns
/// A session handle; dropping it unmounts.
pub fn spawn_mount(fs: JsonFs, mountpoint: &Path) -> Result<fuser::BackgroundSession, VfsError> {
    fuser::spawn_mount2(fs, mountpoint, &mount_options())
        .map_err(|e: std::io::Error| VfsError::MountFailed(e.to_string()))
}

fn mount_options() -> Vec<MountOption> {
    vec![
        MountOption::RO,
        MountOption::FSName("jsonfs".to_string()),
        MountOption::AutoUnmount,
    ]
}
