//! Timers for the encode, recode and decode stages.
//!
//! `StageTimer` sums wall time per stage so benchmarks can report throughput
//! and mean cost per call. Timestamps come from the raw monotonic clock on
//! Linux and from `Instant` elsewhere.

use std::sync::atomic::{AtomicU64, Ordering};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Monotonic timestamp in nanoseconds. Only differences are meaningful.
#[cfg(target_os = "linux")]
#[inline]
pub fn now_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC_RAW, &mut ts) };
    debug_assert_eq!(rc, 0);
    ts.tv_sec as u64 * NANOS_PER_SEC + ts.tv_nsec as u64
}

#[cfg(not(target_os = "linux"))]
#[inline]
pub fn now_ns() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Total duration and call count of one stage. `Relaxed` throughout.
pub struct StageTimer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl StageTimer {
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn record(&self, duration_ns: u64) {
        self.total_ns.fetch_add(duration_ns, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Time `f` and record its duration.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = now_ns();
        let out = f();
        self.record(now_ns().saturating_sub(start));
        out
    }

    pub fn total_ns(&self) -> u64 {
        self.total_ns.load(Ordering::Relaxed)
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn avg_ns(&self) -> u64 {
        let count = self.count();
        if count == 0 {
            return 0;
        }
        self.total_ns() / count
    }
}

impl Default for StageTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-stage timers for one coding pipeline.
#[derive(Default)]
pub struct StageMetrics {
    pub encode: StageTimer,
    pub recode: StageTimer,
    pub decode: StageTimer,
}

impl StageMetrics {
    pub const fn new() -> Self {
        Self {
            encode: StageTimer::new(),
            recode: StageTimer::new(),
            decode: StageTimer::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ns_monotonic() {
        let a = now_ns();
        let b = now_ns();
        assert!(b >= a);
    }

    #[test]
    fn test_avg_ns() {
        let t = StageTimer::new();
        assert_eq!(t.avg_ns(), 0);
        t.record(100);
        t.record(300);
        assert_eq!(t.count(), 2);
        assert_eq!(t.total_ns(), 400);
        assert_eq!(t.avg_ns(), 200);
    }

    #[test]
    fn test_time_returns_value() {
        let m = StageMetrics::new();
        let v = m.decode.time(|| 7);
        assert_eq!(v, 7);
        assert_eq!(m.decode.count(), 1);
        assert_eq!(m.encode.count(), 0);
    }
}
