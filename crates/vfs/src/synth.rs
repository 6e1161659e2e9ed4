//! On-demand content synthesis for read windows.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::blocks::BlockCache;

/// Capacity of the fill-buffer cache (distinct lengths).
pub const FILL_BUFFER_CACHE_CAPACITY: usize = 1000;

/// Largest buffer the fill mode materializes at once. Longer outputs are
/// assembled by repeating slices of a buffer this size.
pub const MAX_FILL_BUFFER: usize = 1 << 20;

/// Content synthesis strategy for a mount.
#[derive(Debug)]
enum Mode {
    /// Constant fill byte; buffers cached by (byte, length).
    Fill {
        byte: u8,
        buffers: Mutex<LruCache<(u8, usize), Arc<[u8]>>>,
    },
    /// Deterministic pseudo-random bytes drawn from the block pool.
    SemiRandom { blocks: Arc<BlockCache> },
}

/// Produces the bytes for a (path, offset, length) read window.
///
/// Reads are deterministic: the same window on the same path always
/// yields the same bytes within a mount, and across mounts for the same
/// (seed, block count, block size) in semi-random mode. The synthesizer
/// never allocates more than the requested length.
#[derive(Debug)]
pub struct ContentSynthesizer {
    mode: Mode,
}

impl ContentSynthesizer {
    /// Create a fill-mode synthesizer.
    ///
    /// # Arguments
    /// * `byte` - The constant fill byte
    pub fn fill(byte: u8) -> Self {
        let cap: NonZeroUsize =
            NonZeroUsize::new(FILL_BUFFER_CACHE_CAPACITY).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            mode: Mode::Fill {
                byte,
                buffers: Mutex::new(LruCache::new(cap)),
            },
        }
    }

    /// Create a semi-random synthesizer backed by a block pool.
    pub fn semi_random(blocks: Arc<BlockCache>) -> Self {
        Self {
            mode: Mode::SemiRandom { blocks },
        }
    }

    /// Synthesize one read window.
    ///
    /// Returns exactly `min(length, file_size - offset)` bytes, or an
    /// empty buffer when the offset is at or past the end of the file.
    ///
    /// # Arguments
    /// * `path` - Canonical file path (seeds block selection)
    /// * `file_size` - Declared file size in bytes
    /// * `offset` - Window start
    /// * `length` - Requested length
    pub fn read(&self, path: &str, file_size: u64, offset: u64, length: u64) -> Arc<[u8]> {
        if offset >= file_size {
            return Arc::from(Vec::new());
        }
        let window: usize = length.min(file_size - offset) as usize;
        if window == 0 {
            return Arc::from(Vec::new());
        }

        match &self.mode {
            Mode::Fill { byte, buffers } => Self::fill_window(*byte, buffers, window),
            Mode::SemiRandom { blocks } => Self::random_window(blocks, path, offset, window),
        }
    }

    /// Produce `window` copies of the fill byte, reusing cached buffers.
    fn fill_window(
        byte: u8,
        buffers: &Mutex<LruCache<(u8, usize), Arc<[u8]>>>,
        window: usize,
    ) -> Arc<[u8]> {
        if window <= MAX_FILL_BUFFER {
            return Self::cached_fill(byte, buffers, window);
        }

        let base: Arc<[u8]> = Self::cached_fill(byte, buffers, MAX_FILL_BUFFER);
        let mut out: Vec<u8> = Vec::with_capacity(window);
        let mut remaining: usize = window;
        while remaining > 0 {
            let take: usize = remaining.min(base.len());
            out.extend_from_slice(&base[..take]);
            remaining -= take;
        }
        Arc::from(out)
    }

    fn cached_fill(
        byte: u8,
        buffers: &Mutex<LruCache<(u8, usize), Arc<[u8]>>>,
        len: usize,
    ) -> Arc<[u8]> {
        let mut cache = buffers.lock().unwrap();
        if let Some(hit) = cache.get(&(byte, len)) {
            return hit.clone();
        }
        let buffer: Arc<[u8]> = Arc::from(vec![byte; len]);
        cache.put((byte, len), buffer.clone());
        buffer
    }

    /// Pool index for block number `block_no` of the file at `path`.
    ///
    /// The MD5 digest of `path || "\0" || decimal(block_no)` is folded to
    /// 64 bits by XOR-ing its big-endian halves, then reduced modulo the
    /// pool size. Block choice is therefore independent across files and
    /// stable across runs.
    fn block_index(blocks: &BlockCache, path: &str, block_no: u64) -> usize {
        let mut input: Vec<u8> = Vec::with_capacity(path.len() + 21);
        input.extend_from_slice(path.as_bytes());
        input.push(0);
        input.extend_from_slice(block_no.to_string().as_bytes());

        let digest: [u8; 16] = md5::compute(&input).0;
        let hi: u64 = u64::from_be_bytes(digest[0..8].try_into().unwrap());
        let lo: u64 = u64::from_be_bytes(digest[8..16].try_into().unwrap());
        ((hi ^ lo) % blocks.block_count() as u64) as usize
    }

    /// Assemble a window from the block pool: tail of the first block,
    /// whole middle blocks, head of the last.
    fn random_window(blocks: &Arc<BlockCache>, path: &str, offset: u64, window: usize) -> Arc<[u8]> {
        let block_size: u64 = blocks.block_size() as u64;
        let end: u64 = offset + window as u64;
        let start_block: u64 = offset / block_size;
        let end_block: u64 = end.saturating_sub(1) / block_size;

        let mut out: Vec<u8> = Vec::with_capacity(window);
        for block_no in start_block..=end_block {
            let data: &[u8] = blocks.block(Self::block_index(blocks, path, block_no));
            let block_start: u64 = block_no * block_size;

            let from: usize = if block_no == start_block {
                (offset - block_start) as usize
            } else {
                0
            };
            let to: usize = if block_no == end_block {
                (end - block_start) as usize
            } else {
                data.len()
            };
            out.extend_from_slice(&data[from..to]);
        }

        debug_assert_eq!(out.len(), window);
        Arc::from(out)
    }
}
