use std::time::Duration;

use rand::Rng;
use vigil_core::{InputSource, Outcome, ResultsSink, StimulusPresenter, TrialRecord, Vigilance};
use vigil_timing::Timer;

/// How drowsy the simulated participant is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Alert,
    Weary,
    Exhausted,
}

impl Profile {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "alert" => Some(Profile::Alert),
            "weary" => Some(Profile::Weary),
            "exhausted" => Some(Profile::Exhausted),
            _ => None,
        }
    }

    fn false_start_prob(self) -> f64 {
        match self {
            Profile::Alert => 0.01,
            Profile::Weary => 0.05,
            Profile::Exhausted => 0.09,
        }
    }

    fn no_response_prob(self) -> f64 {
        match self {
            Profile::Alert => 0.005,
            Profile::Weary => 0.06,
            Profile::Exhausted => 0.18,
        }
    }

    fn rt_range_ms(self) -> (u64, u64) {
        match self {
            Profile::Alert => (210, 290),
            Profile::Weary => (260, 420),
            Profile::Exhausted => (330, 650),
        }
    }
}

/// Scripted participant: taps with profile-dependent latencies on the
/// session's own timeline (a clone of the session timer).
pub struct SimulatedParticipant<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    timer: T,
    rng: R,
    profile: Profile,
}

impl<T, R> SimulatedParticipant<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(timer: T, rng: R, profile: Profile) -> Self {
        Self {
            timer,
            rng,
            profile,
        }
    }
}

impl<T, R> InputSource for SimulatedParticipant<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    fn await_during_isi(&mut self, timeout: Duration) -> Option<u64> {
        let timeout_ms = timeout.as_millis() as u64;
        if self.rng.random_bool(self.profile.false_start_prob()) && timeout_ms > 1 {
            let after_ms = self.rng.random_range(1..timeout_ms);
            self.timer.sleep(Duration::from_millis(after_ms));
            return Some(self.timer.now());
        }
        self.timer.sleep(timeout);
        None
    }

    fn await_response(&mut self, onset_ms: u64, timeout: Duration) -> Option<u64> {
        let timeout_ms = timeout.as_millis() as u64;
        if self.rng.random_bool(self.profile.no_response_prob()) {
            self.timer.sleep(timeout);
            return None;
        }
        let (lo, hi) = self.profile.rt_range_ms();
        let rt_ms = self.rng.random_range(lo..=hi);
        if rt_ms >= timeout_ms {
            self.timer.sleep(timeout);
            return None;
        }
        self.timer.sleep(Duration::from_millis(rt_ms));
        Some(onset_ms + rt_ms)
    }
}

/// Prints the stimulus and feedback; stands in for the rendering layer.
pub struct ConsolePresenter<T: Timer> {
    timer: T,
}

impl<T: Timer> ConsolePresenter<T> {
    pub fn new(timer: T) -> Self {
        Self { timer }
    }
}

impl<T: Timer> StimulusPresenter for ConsolePresenter<T> {
    fn present_stimulus(&mut self, onset_ms: u64) {
        println!("stimulus up at {onset_ms} ms");
    }

    fn clear_stimulus(&mut self) {}

    fn show_feedback(&mut self, outcome: &Outcome, duration: Duration) {
        match outcome {
            Outcome::Valid { rt_ms } => println!("  RT {rt_ms} ms"),
            Outcome::Lapse { rt_ms: Some(rt_ms) } => println!("  lapse ({rt_ms} ms)"),
            Outcome::Lapse { rt_ms: None } => println!("  lapse (no response)"),
            Outcome::FalseStart { .. } => println!("  false start"),
        }
        self.timer.sleep(duration);
    }
}

/// Streams each record as one JSON line, then a closing summary.
#[derive(Default)]
pub struct JsonLineSink {
    emitted: usize,
}

impl ResultsSink for JsonLineSink {
    fn record(&mut self, record: &TrialRecord) {
        if let Ok(line) = serde_json::to_string(record) {
            println!("{line}");
        }
        self.emitted += 1;
    }

    fn complete(&mut self, records: &[TrialRecord], classification: Vigilance) {
        println!(
            "submitted {} records, terminal classification {:?}",
            records.len(),
            classification
        );
    }
}
