//! Rate and IOPS limiting shared across callback threads.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crate::options::VfsOptions;

/// Length of an IOPS accounting window.
const WINDOW: Duration = Duration::from_secs(1);

/// Enforces a minimum spacing between admitted operations.
///
/// One timestamp guarded by a mutex; each admission reserves the next
/// free slot under the lock and sleeps outside it. K sequential
/// admissions from one thread therefore take at least (K-1) * rate.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    /// Create a limiter with the given inter-operation spacing in seconds.
    pub fn new(rate_seconds: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(rate_seconds),
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Block until this caller's reserved slot arrives.
    pub fn admit(&self) {
        let now: Instant = Instant::now();
        let start: Instant = {
            let mut slot: std::sync::MutexGuard<'_, Instant> = self.next_slot.lock().unwrap();
            let start: Instant = if *slot > now { *slot } else { now };
            *slot = start + self.interval;
            start
        };
        if start > now {
            thread::sleep(start - now);
        }
    }
}

/// Caps admitted operations per one-second window.
///
/// The window state is guarded by a mutex; a caller that overflows the
/// current window sleeps (outside the lock) until the window boundary and
/// retries. Window reset is atomic relative to the counter increment.
#[derive(Debug)]
pub struct IopsLimiter {
    limit: u32,
    window: Mutex<IopsWindow>,
}

#[derive(Debug)]
struct IopsWindow {
    start: Instant,
    count: u32,
}

impl IopsLimiter {
    /// Create a limiter admitting at most `limit` operations per second.
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            window: Mutex::new(IopsWindow {
                start: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Block until the current window has budget for one more operation.
    pub fn admit(&self) {
        loop {
            let now: Instant = Instant::now();
            let wait: Option<Duration> = {
                let mut window: std::sync::MutexGuard<'_, IopsWindow> =
                    self.window.lock().unwrap();
                if now.duration_since(window.start) >= WINDOW {
                    window.start = now;
                    window.count = 1;
                    None
                } else if window.count < self.limit {
                    window.count += 1;
                    None
                } else {
                    Some(window.start + WINDOW - now)
                }
            };
            match wait {
                None => return,
                Some(duration) => thread::sleep(duration),
            }
        }
    }
}

/// Admission gate composed of the optional rate and IOPS limiters.
///
/// When both are active, the rate wait happens first, then IOPS
/// admission. getattr, readdir, and read all pass through the gate.
#[derive(Debug)]
pub struct OpGate {
    rate: Option<RateLimiter>,
    iops: Option<IopsLimiter>,
}

impl OpGate {
    /// Build the gate from mount options; zero disables a limiter.
    pub fn from_options(options: &VfsOptions) -> Self {
        Self {
            rate: (options.rate_limit > 0.0).then(|| RateLimiter::new(options.rate_limit)),
            iops: (options.iop_limit > 0).then(|| IopsLimiter::new(options.iop_limit)),
        }
    }

    /// Gate with no limits; every admission returns immediately.
    pub fn unlimited() -> Self {
        Self {
            rate: None,
            iops: None,
        }
    }

    /// Admit one operation, waiting as the active limiters require.
    pub fn admit(&self) {
        if let Some(rate) = &self.rate {
            rate.admit();
        }
        if let Some(iops) = &self.iops {
            iops.admit();
        }
    }
}
