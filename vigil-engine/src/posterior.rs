use thiserror::Error;
use vigil_core::{OutcomeClass, Vigilance};

use crate::likelihood::LikelihoodTable;

const HIGH: usize = 0;
const MEDIUM: usize = 1;
const LOW: usize = 2;

/// LpFS counts above this permanently eliminate HIGH.
const ELIMINATION_LPFS: u32 = 6;
/// LpFS counts above this force an immediate LOW decision.
const IMMEDIATE_LOW_LPFS: u32 = 16;

#[derive(Debug, Error)]
pub enum PriorError {
    #[error("prior probabilities must be non-negative and finite, got {0:?}")]
    Negative([f64; 3]),
    #[error("prior probabilities must sum to 1, got {0:?}")]
    NotNormalized([f64; 3]),
}

/// By-value view of the posterior state after one observation. Records copy
/// from this, so later engine mutation can never reach back into history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosteriorSnapshot {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
    pub cumulative_lpfs: u32,
    pub high_eliminated: bool,
    pub decision: Option<Vigilance>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EngineState {
    Active,
    Decided(Vigilance),
}

/// Sequential Bayesian classifier over {HIGH, MEDIUM, LOW}.
///
/// Sole owner of the posterior state: one `observe` per completed trial,
/// no-op once DECIDED. Transition order per observation: LpFS counting,
/// likelihood update, HIGH elimination, immediate-LOW, threshold stop.
pub struct PosteriorEngine {
    probs: [f64; 3],
    cumulative_lpfs: u32,
    high_eliminated: bool,
    state: EngineState,
    table: LikelihoodTable,
    decision_threshold: f64,
}

impl PosteriorEngine {
    /// Uniform prior across the three categories.
    pub fn new(table: LikelihoodTable, decision_threshold: f64) -> Self {
        Self {
            probs: [1.0 / 3.0; 3],
            cumulative_lpfs: 0,
            high_eliminated: false,
            state: EngineState::Active,
            table,
            decision_threshold,
        }
    }

    /// Like `new`, with a caller-supplied prior `[high, medium, low]`.
    pub fn with_prior(
        table: LikelihoodTable,
        decision_threshold: f64,
        prior: [f64; 3],
    ) -> Result<Self, PriorError> {
        if prior.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(PriorError::Negative(prior));
        }
        let sum: f64 = prior.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(PriorError::NotNormalized(prior));
        }
        let mut engine = Self::new(table, decision_threshold);
        engine.probs = prior;
        Ok(engine)
    }

    /// Feeds one classified trial into the posterior. Returns the state
    /// after the update; once DECIDED this freezes and the call becomes a
    /// pure read.
    pub fn observe(&mut self, bin: usize, class: OutcomeClass) -> PosteriorSnapshot {
        if matches!(self.state, EngineState::Decided(_)) {
            return self.snapshot();
        }

        if class != OutcomeClass::Valid {
            self.cumulative_lpfs += 1;
        }

        let ratios = self.table.lookup(bin, class);
        if !self.high_eliminated {
            self.probs[HIGH] *= ratios.high;
        }
        self.probs[MEDIUM] *= ratios.medium;
        self.probs[LOW] *= ratios.low;
        self.renormalize();

        if !self.high_eliminated && self.cumulative_lpfs > ELIMINATION_LPFS {
            self.high_eliminated = true;
            self.probs[HIGH] = 0.0;
            self.renormalize();
        }

        if self.cumulative_lpfs > IMMEDIATE_LOW_LPFS {
            self.probs = [0.0, 0.0, 1.0];
            self.high_eliminated = true;
            self.state = EngineState::Decided(Vigilance::Low);
            return self.snapshot();
        }

        // Tie-break order HIGH, MEDIUM, LOW.
        let candidates = [
            (HIGH, Vigilance::High),
            (MEDIUM, Vigilance::Medium),
            (LOW, Vigilance::Low),
        ];
        for (idx, category) in candidates {
            if self.probs[idx] > self.decision_threshold {
                self.state = EngineState::Decided(category);
                break;
            }
        }

        self.snapshot()
    }

    fn renormalize(&mut self) {
        let sum: f64 = self.probs.iter().sum();
        if sum > 0.0 {
            for p in &mut self.probs {
                *p /= sum;
            }
        } else {
            // Reachable only from a degenerate all-HIGH prior at the moment
            // of elimination: spread evenly over the survivors.
            self.probs = [0.0, 0.5, 0.5];
        }
    }

    pub fn snapshot(&self) -> PosteriorSnapshot {
        PosteriorSnapshot {
            high: self.probs[HIGH],
            medium: self.probs[MEDIUM],
            low: self.probs[LOW],
            cumulative_lpfs: self.cumulative_lpfs,
            high_eliminated: self.high_eliminated,
            decision: self.decision(),
        }
    }

    pub fn decision(&self) -> Option<Vigilance> {
        match self.state {
            EngineState::Active => None,
            EngineState::Decided(v) => Some(v),
        }
    }

    pub fn cumulative_lpfs(&self) -> u32 {
        self.cumulative_lpfs
    }

    /// Time-cap verdict from the LpFS count alone, independent of the
    /// posterior probabilities.
    pub fn fallback_classification(&self) -> Vigilance {
        match self.cumulative_lpfs {
            0..=6 => Vigilance::High,
            7..=16 => Vigilance::Medium,
            _ => Vigilance::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn engine() -> PosteriorEngine {
        PosteriorEngine::new(LikelihoodTable::default(), 0.99619)
    }

    fn assert_normalized(snap: &PosteriorSnapshot) {
        assert!(snap.high >= 0.0 && snap.medium >= 0.0 && snap.low >= 0.0);
        assert!((snap.high + snap.medium + snap.low - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn posterior_stays_normalized_over_a_mixed_stream() {
        let mut engine = engine();
        let stream = [
            (0, OutcomeClass::Valid),
            (0, OutcomeClass::Lapse),
            (1, OutcomeClass::FalseStart),
            (2, OutcomeClass::Valid),
            (3, OutcomeClass::Lapse),
            (5, OutcomeClass::Valid),
        ];
        for (bin, class) in stream {
            let snap = engine.observe(bin, class);
            assert_normalized(&snap);
        }
    }

    #[test]
    fn valid_responses_do_not_count_toward_lpfs() {
        let mut engine = engine();
        for _ in 0..10 {
            engine.observe(0, OutcomeClass::Valid);
        }
        assert_eq!(engine.cumulative_lpfs(), 0);
    }

    #[test]
    fn seventh_lpfs_eliminates_high_permanently() {
        let mut engine = PosteriorEngine::new(LikelihoodTable::uniform(), 0.999_999_999);
        for i in 0..6 {
            let snap = engine.observe(0, OutcomeClass::Lapse);
            assert!(!snap.high_eliminated, "eliminated too early at lapse {i}");
            assert!(snap.high > 0.0);
        }
        let snap = engine.observe(0, OutcomeClass::Lapse);
        assert_eq!(snap.cumulative_lpfs, 7);
        assert!(snap.high_eliminated);
        assert_eq!(snap.high, 0.0);
        assert_normalized(&snap);

        // It never comes back, whatever the participant does next.
        for _ in 0..20 {
            let snap = engine.observe(2, OutcomeClass::Valid);
            assert_eq!(snap.high, 0.0);
            assert_normalized(&snap);
        }
    }

    #[test]
    fn false_starts_count_toward_elimination_too() {
        let mut engine = PosteriorEngine::new(LikelihoodTable::uniform(), 0.999_999_999);
        for _ in 0..4 {
            engine.observe(0, OutcomeClass::Lapse);
        }
        for _ in 0..3 {
            engine.observe(0, OutcomeClass::FalseStart);
        }
        assert_eq!(engine.cumulative_lpfs(), 7);
        assert!(engine.snapshot().high_eliminated);
    }

    #[test]
    fn seventeenth_lpfs_forces_immediate_low() {
        // Flat table and an unreachable threshold: only the counting rules
        // can decide.
        let mut engine = PosteriorEngine::new(LikelihoodTable::uniform(), 0.999_999_999);
        for _ in 0..16 {
            let snap = engine.observe(1, OutcomeClass::Lapse);
            assert_eq!(snap.decision, None);
        }
        let snap = engine.observe(1, OutcomeClass::Lapse);
        assert_eq!(snap.cumulative_lpfs, 17);
        assert_eq!(snap.decision, Some(Vigilance::Low));
        assert_eq!(snap.low, 1.0);
        assert_eq!(snap.high, 0.0);
        assert_eq!(snap.medium, 0.0);
    }

    #[test]
    fn sustained_fast_responses_decide_high() {
        let mut engine = engine();
        let mut decided_at = None;
        for trial in 0..64 {
            let snap = engine.observe(trial / 12, OutcomeClass::Valid);
            assert_normalized(&snap);
            if snap.decision.is_some() {
                decided_at = Some((trial, snap));
                break;
            }
        }
        let (trial, snap) = decided_at.expect("threshold never crossed");
        assert_eq!(snap.decision, Some(Vigilance::High));
        assert!(snap.high > 0.99619);
        assert!(snap.cumulative_lpfs <= 6);
        assert!(trial < 30, "took implausibly long: {trial}");
    }

    #[test]
    fn sustained_lapsing_decides_low_by_threshold() {
        let mut engine = engine();
        let mut decision = None;
        for trial in 0..30 {
            let snap = engine.observe(trial / 6, OutcomeClass::Lapse);
            if let Some(v) = snap.decision {
                decision = Some(v);
                break;
            }
        }
        assert_eq!(decision, Some(Vigilance::Low));
    }

    #[test]
    fn observe_is_idempotent_after_decided() {
        let mut engine = PosteriorEngine::new(LikelihoodTable::uniform(), 0.999_999_999);
        for _ in 0..17 {
            engine.observe(0, OutcomeClass::Lapse);
        }
        let frozen = engine.snapshot();
        assert_eq!(frozen.decision, Some(Vigilance::Low));

        for class in [OutcomeClass::Valid, OutcomeClass::Lapse, OutcomeClass::FalseStart] {
            let snap = engine.observe(5, class);
            assert_eq!(snap, frozen);
        }
        assert_eq!(engine.cumulative_lpfs(), 17);
    }

    #[test]
    fn threshold_tie_breaks_in_category_order() {
        // A flat table keeps a two-point prior frozen with both categories
        // past the threshold; HIGH must win the tie.
        let mut engine = PosteriorEngine::with_prior(
            LikelihoodTable::uniform(),
            0.49,
            [0.5, 0.5, 0.0],
        )
        .unwrap();
        let snap = engine.observe(0, OutcomeClass::Valid);
        assert_eq!(snap.decision, Some(Vigilance::High));
    }

    #[test]
    fn prior_validation() {
        let table = LikelihoodTable::uniform;
        assert!(PosteriorEngine::with_prior(table(), 0.9, [0.2, 0.3, 0.5]).is_ok());
        assert!(matches!(
            PosteriorEngine::with_prior(table(), 0.9, [-0.1, 0.6, 0.5]),
            Err(PriorError::Negative(_))
        ));
        assert!(matches!(
            PosteriorEngine::with_prior(table(), 0.9, [0.2, 0.2, 0.2]),
            Err(PriorError::NotNormalized(_))
        ));
    }

    #[test]
    fn fallback_table_matches_the_lpfs_bands() {
        let mut engine = PosteriorEngine::new(LikelihoodTable::uniform(), 0.999_999_999);
        assert_eq!(engine.fallback_classification(), Vigilance::High);

        for _ in 0..6 {
            engine.observe(0, OutcomeClass::Lapse);
        }
        assert_eq!(engine.fallback_classification(), Vigilance::High);

        engine.observe(0, OutcomeClass::Lapse); // 7
        assert_eq!(engine.fallback_classification(), Vigilance::Medium);

        for _ in 0..9 {
            engine.observe(0, OutcomeClass::Lapse); // 16
        }
        assert_eq!(engine.fallback_classification(), Vigilance::Medium);

        engine.observe(0, OutcomeClass::Lapse); // 17
        assert_eq!(engine.fallback_classification(), Vigilance::Low);
    }
}
