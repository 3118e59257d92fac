use serde::{Deserialize, Serialize};

/// Terminal vigilance classification, assigned exactly once per test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vigilance {
    High,
    Medium,
    Low,
}

/// Classified result of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Response landed between the false-start and lapse thresholds.
    Valid { rt_ms: u64 },
    /// No response before the per-trial ceiling, or a response at or past
    /// the lapse threshold (`rt_ms` is `None` only in the no-response case).
    Lapse { rt_ms: Option<u64> },
    /// Tap before stimulus onset (`rt_ms` is `None`: no onset exists), or a
    /// response faster than the false-start threshold.
    FalseStart { rt_ms: Option<u64> },
}

impl Outcome {
    pub fn class(&self) -> OutcomeClass {
        match self {
            Outcome::Valid { .. } => OutcomeClass::Valid,
            Outcome::Lapse { .. } => OutcomeClass::Lapse,
            Outcome::FalseStart { .. } => OutcomeClass::FalseStart,
        }
    }

    /// Lapses and false starts form the combined LpFS evidence category.
    pub fn is_lpfs(&self) -> bool {
        !matches!(self, Outcome::Valid { .. })
    }

    pub fn rt_ms(&self) -> Option<u64> {
        match *self {
            Outcome::Valid { rt_ms } => Some(rt_ms),
            Outcome::Lapse { rt_ms } | Outcome::FalseStart { rt_ms } => rt_ms,
        }
    }
}

/// Outcome class used to index the likelihood table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    Valid,
    Lapse,
    FalseStart,
}
