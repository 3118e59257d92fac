use vigil_core::Outcome;

use crate::config::TestConfig;

/// Classifies a response captured while the stimulus was up. Pure: the
/// waiting itself (and the premature-tap case, which never reaches here)
/// belongs to the session loop.
///
/// A tap report whose timestamp precedes the onset is malformed and degrades
/// to "no response" rather than failing the trial.
pub fn classify_response(config: &TestConfig, onset_ms: u64, tap_ms: Option<u64>) -> Outcome {
    match tap_ms.and_then(|tap| tap.checked_sub(onset_ms)) {
        None => Outcome::Lapse { rt_ms: None },
        Some(rt_ms) if rt_ms < config.false_start_threshold_ms => {
            Outcome::FalseStart { rt_ms: Some(rt_ms) }
        }
        Some(rt_ms) if rt_ms >= config.lapse_threshold_ms => Outcome::Lapse { rt_ms: Some(rt_ms) },
        Some(rt_ms) => Outcome::Valid { rt_ms },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TestConfig {
        TestConfig::default() // false start < 100 ms, lapse >= 355 ms
    }

    #[test]
    fn fast_tap_is_a_false_start() {
        let outcome = classify_response(&config(), 10_000, Some(10_099));
        assert_eq!(outcome, Outcome::FalseStart { rt_ms: Some(99) });
    }

    #[test]
    fn threshold_boundaries() {
        // Exactly at the false-start threshold counts as valid.
        assert_eq!(
            classify_response(&config(), 10_000, Some(10_100)),
            Outcome::Valid { rt_ms: 100 }
        );
        assert_eq!(
            classify_response(&config(), 10_000, Some(10_354)),
            Outcome::Valid { rt_ms: 354 }
        );
        // Exactly at the lapse threshold counts as a lapse.
        assert_eq!(
            classify_response(&config(), 10_000, Some(10_355)),
            Outcome::Lapse { rt_ms: Some(355) }
        );
    }

    #[test]
    fn no_tap_is_a_lapse_without_reaction_time() {
        assert_eq!(
            classify_response(&config(), 10_000, None),
            Outcome::Lapse { rt_ms: None }
        );
    }

    #[test]
    fn malformed_tap_before_onset_degrades_to_no_response() {
        assert_eq!(
            classify_response(&config(), 10_000, Some(9_500)),
            Outcome::Lapse { rt_ms: None }
        );
    }
}
