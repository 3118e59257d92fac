use std::time::Duration;

use crate::outcome::{Outcome, Vigilance};
use crate::record::TrialRecord;

/// Displays the countdown stimulus to the participant.
pub trait StimulusPresenter {
    /// Show the stimulus that fired at `onset_ms`.
    fn present_stimulus(&mut self, onset_ms: u64);
    /// Remove the stimulus once the trial's response window closes.
    fn clear_stimulus(&mut self);
    /// Show per-trial feedback; how long it stays up is the presenter's
    /// business, the engine only hands over the configured duration.
    fn show_feedback(&mut self, outcome: &Outcome, duration: Duration);
}

/// Reports participant taps relative to stimulus onset.
///
/// Both methods block until a tap or the timeout, whichever comes first —
/// these are the session's only two suspension points. Returned timestamps
/// are on the same timeline as the session timer.
pub trait InputSource {
    /// Wait out the inter-stimulus interval. `Some(ts)` is a premature tap
    /// that cancels the pending stimulus.
    fn await_during_isi(&mut self, timeout: Duration) -> Option<u64>;
    /// Wait for the response to a stimulus shown at `onset_ms`.
    fn await_response(&mut self, onset_ms: u64, timeout: Duration) -> Option<u64>;
}

/// Receives the per-trial record stream and the finalized result.
pub trait ResultsSink {
    fn record(&mut self, record: &TrialRecord);
    /// Called exactly once, with the ordered records and the terminal
    /// classification.
    fn complete(&mut self, records: &[TrialRecord], classification: Vigilance);
}
