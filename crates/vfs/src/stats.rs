//! Operation counters and the periodic stats reporter.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use jsonfs_model::humanize_bytes;

/// Monotonic counters updated by the callback surface.
///
/// Updates use relaxed ordering; the reporter reads with acquire. The
/// counters never reset, the reporter keeps its own sample base.
#[derive(Debug, Default)]
pub struct OpCounters {
    ops: AtomicU64,
    bytes_read: AtomicU64,
}

impl OpCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one admitted operation.
    pub fn record_op(&self) {
        self.ops.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes returned by a read.
    pub fn add_bytes(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::Relaxed);
    }

    /// Total operations so far.
    pub fn ops(&self) -> u64 {
        self.ops.load(Ordering::Acquire)
    }

    /// Total bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Acquire)
    }
}

/// Background reporter logging per-second IOPS and throughput.
pub struct StatsReporter;

impl StatsReporter {
    /// Spawn the reporter thread.
    ///
    /// Wakes once per second, logs the deltas over the previous interval,
    /// and exits when `running` clears.
    ///
    /// # Arguments
    /// * `counters` - Shared operation counters
    /// * `running` - Cleared at unmount to stop the thread
    pub fn spawn(counters: Arc<OpCounters>, running: Arc<AtomicBool>) -> thread::JoinHandle<()> {
        thread::Builder::new()
            .name("jsonfs-stats".to_string())
            .spawn(move || {
                let mut last_ops: u64 = counters.ops();
                let mut last_bytes: u64 = counters.bytes_read();
                while running.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_secs(1));
                    let ops: u64 = counters.ops();
                    let bytes: u64 = counters.bytes_read();
                    tracing::info!(
                        "IOPS: {}, data transferred: {}/s",
                        ops - last_ops,
                        humanize_bytes(bytes - last_bytes)
                    );
                    last_ops = ops;
                    last_bytes = bytes;
                }
            })
            .expect("failed to spawn stats reporter thread")
    }
}
