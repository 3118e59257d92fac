use std::time::Duration;

use rand::Rng;
use vigil_core::InputSource;
use vigil_timing::Timer;

use crate::config::TestConfig;

/// How a scheduled stimulus wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StimulusWait {
    /// The interval elapsed and the stimulus fired at `onset_ms`.
    Fired { onset_ms: u64 },
    /// A premature tap at `tap_ms` cancelled the pending stimulus; no onset
    /// exists for this attempt and the next one draws a fresh interval.
    Preempted { tap_ms: u64 },
}

/// Draws inter-stimulus intervals and runs the cancel-aware onset wait.
pub struct IsiScheduler<R: Rng> {
    min_isi_ms: u64,
    max_isi_ms: u64,
    rng: R,
}

impl<R: Rng> IsiScheduler<R> {
    pub fn new(config: &TestConfig, rng: R) -> Self {
        Self {
            min_isi_ms: config.min_isi_ms,
            max_isi_ms: config.max_isi_ms,
            rng,
        }
    }

    /// Uniform draw from the configured interval, inclusive on both ends.
    pub fn next_isi(&mut self) -> u64 {
        self.rng.random_range(self.min_isi_ms..=self.max_isi_ms)
    }

    /// Waits out `isi_ms` on the input source. The wait is scoped to this
    /// call: it either fires or is cancelled by a tap, never left pending.
    pub fn schedule<T>(&mut self, timer: &T, input: &mut dyn InputSource, isi_ms: u64) -> StimulusWait
    where
        T: Timer<Timestamp = u64>,
    {
        match input.await_during_isi(Duration::from_millis(isi_ms)) {
            Some(tap_ms) => StimulusWait::Preempted { tap_ms },
            None => StimulusWait::Fired {
                onset_ms: timer.now(),
            },
        }
    }
}
