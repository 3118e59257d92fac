use serde::{Deserialize, Serialize};

use crate::outcome::Vigilance;

/// Recorded result per trial. Field names are the wire contract toward the
/// results sink; a record is immutable once emitted, and the posterior
/// fields are snapshots taken at emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_index: usize,
    pub rt_ms: Option<u64>,
    pub isi_ms: u64,
    /// Absent when a premature tap cancelled the stimulus for this attempt.
    pub stimulus_onset_timestamp: Option<u64>,
    pub response_timestamp: Option<u64>,
    pub is_lapse: bool,
    pub is_false_start: bool,
    pub cumulative_lpfs: u32,
    pub elapsed_test_time_ms: u64,
    pub time_bin: usize,
    pub posterior_high: f64,
    pub posterior_medium: f64,
    pub posterior_low: f64,
    /// Null except on the last record of the test; the final record's value
    /// is the authoritative outcome.
    pub classification: Option<Vigilance>,
}

impl TrialRecord {
    pub fn is_valid_response(&self) -> bool {
        !self.is_lapse && !self.is_false_start
    }
}
