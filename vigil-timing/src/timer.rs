use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Trait for the session clock
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    /// Current wall-clock time in milliseconds. Monotonic: successive calls
    /// never go backwards.
    fn now(&self) -> Self::Timestamp;
    fn elapsed_since(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);
}

/// Wall-clock timer: Unix-epoch milliseconds, advanced monotonically from a
/// single `Instant` captured at construction so system clock adjustments
/// mid-test cannot reorder timestamps.
#[derive(Debug, Clone)]
pub struct MonotonicTimer {
    start: Instant,
    epoch_base_ms: u64,
}

impl Timer for MonotonicTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.epoch_base_ms + self.start.elapsed().as_millis() as u64
    }

    fn elapsed_since(&self, ts: u64) -> Duration {
        Duration::from_millis(self.now().saturating_sub(ts))
    }

    fn sleep(&self, d: Duration) {
        Self::precise_sleep(d);
    }
}

impl MonotonicTimer {
    pub fn new() -> Self {
        let epoch_base_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            start: Instant::now(),
            epoch_base_ms,
        }
    }

    fn precise_sleep(duration: Duration) {
        #[cfg(target_os = "linux")]
        Self::linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated clock: `sleep` advances the time instead of blocking. Clones
/// share one underlying clock, so a simulated input source holding a clone
/// stays on the session's timeline.
#[derive(Debug, Clone)]
pub struct VirtualTimer {
    now_ms: Arc<AtomicU64>,
}

impl Timer for VirtualTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn elapsed_since(&self, ts: u64) -> Duration {
        Duration::from_millis(self.now().saturating_sub(ts))
    }

    fn sleep(&self, d: Duration) {
        self.advance(d.as_millis() as u64);
    }
}

impl VirtualTimer {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for VirtualTimer {
    fn default() -> Self {
        Self::new(0)
    }
}
