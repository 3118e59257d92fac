use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration key `{key}` has unusable value {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("min_isi_ms ({min}) exceeds max_isi_ms ({max})")]
    IsiRangeInverted { min: u64, max: u64 },
    #[error("false_start_threshold_ms ({false_start}) must be below lapse_threshold_ms ({lapse})")]
    ThresholdOrderViolated { false_start: u64, lapse: u64 },
    #[error("decision_threshold must lie strictly inside (0, 1), got {0}")]
    ThresholdOutOfRange(f64),
    #[error("`{0}` must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Immutable per-run test parameters. All durations are milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TestConfig {
    pub max_duration_ms: u64,
    pub min_isi_ms: u64,
    pub max_isi_ms: u64,
    pub lapse_threshold_ms: u64,
    pub false_start_threshold_ms: u64,
    pub decision_threshold: f64,
    /// Display-only; handed to the presenter, never consumed by the engine.
    pub feedback_duration_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        // Published 3-minute adaptive test parameters.
        Self {
            max_duration_ms: 180_000,
            min_isi_ms: 1_000,
            max_isi_ms: 4_000,
            lapse_threshold_ms: 355,
            false_start_threshold_ms: 100,
            decision_threshold: 0.99619,
            feedback_duration_ms: 500,
        }
    }
}

impl TestConfig {
    /// Builds a config from a flat string-keyed mapping, starting from the
    /// defaults. Unrecognized keys are ignored; recognized keys with
    /// negative, non-numeric, or out-of-range values are rejected.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = map.get("max_duration_seconds") {
            config.max_duration_ms = take_u64("max_duration_seconds", v)?
                .checked_mul(1_000)
                .ok_or_else(|| invalid("max_duration_seconds", v))?;
        }
        if let Some(v) = map.get("min_isi_ms") {
            config.min_isi_ms = take_u64("min_isi_ms", v)?;
        }
        if let Some(v) = map.get("max_isi_ms") {
            config.max_isi_ms = take_u64("max_isi_ms", v)?;
        }
        if let Some(v) = map.get("lapse_threshold_ms") {
            config.lapse_threshold_ms = take_u64("lapse_threshold_ms", v)?;
        }
        if let Some(v) = map.get("false_start_threshold_ms") {
            config.false_start_threshold_ms = take_u64("false_start_threshold_ms", v)?;
        }
        if let Some(v) = map.get("decision_threshold") {
            config.decision_threshold = v
                .as_f64()
                .ok_or_else(|| invalid("decision_threshold", v))?;
        }
        if let Some(v) = map.get("feedback_duration_ms") {
            config.feedback_duration_ms = take_u64("feedback_duration_ms", v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Fatal before the first trial: no partial test may begin with invalid
    /// parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_duration_ms == 0 {
            return Err(ConfigError::ZeroDuration("max_duration_ms"));
        }
        if self.min_isi_ms == 0 {
            return Err(ConfigError::ZeroDuration("min_isi_ms"));
        }
        if self.lapse_threshold_ms == 0 {
            return Err(ConfigError::ZeroDuration("lapse_threshold_ms"));
        }
        if self.min_isi_ms > self.max_isi_ms {
            return Err(ConfigError::IsiRangeInverted {
                min: self.min_isi_ms,
                max: self.max_isi_ms,
            });
        }
        if self.false_start_threshold_ms >= self.lapse_threshold_ms {
            return Err(ConfigError::ThresholdOrderViolated {
                false_start: self.false_start_threshold_ms,
                lapse: self.lapse_threshold_ms,
            });
        }
        if !self.decision_threshold.is_finite()
            || self.decision_threshold <= 0.0
            || self.decision_threshold >= 1.0
        {
            return Err(ConfigError::ThresholdOutOfRange(self.decision_threshold));
        }
        Ok(())
    }

    /// How long a trial waits for a tap after stimulus onset. The source
    /// leaves this open; `max_isi_ms + lapse_threshold_ms` is long enough to
    /// record a reaction time for lapse-range responses while keeping every
    /// trial bounded.
    pub fn response_ceiling_ms(&self) -> u64 {
        self.max_isi_ms + self.lapse_threshold_ms
    }
}

fn take_u64(key: &'static str, v: &Value) -> Result<u64, ConfigError> {
    v.as_u64().ok_or_else(|| invalid(key, v))
}

fn invalid(key: &'static str, v: &Value) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(TestConfig::default().validate().is_ok());
    }

    #[test]
    fn from_map_converts_seconds_and_ignores_unknown_keys() {
        let config = TestConfig::from_map(&map(json!({
            "max_duration_seconds": 120,
            "min_isi_ms": 800,
            "decision_threshold": 0.95,
            "participant_id": "p-042",
            "locale": "en-GB"
        })))
        .unwrap();

        assert_eq!(config.max_duration_ms, 120_000);
        assert_eq!(config.min_isi_ms, 800);
        assert_eq!(config.decision_threshold, 0.95);
        // Untouched keys keep their defaults.
        assert_eq!(config.lapse_threshold_ms, 355);
    }

    #[test]
    fn negative_duration_is_rejected_not_clamped() {
        let err = TestConfig::from_map(&map(json!({ "min_isi_ms": -200 }))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "min_isi_ms", .. }));
    }

    #[test]
    fn inverted_isi_range_is_rejected() {
        let err = TestConfig::from_map(&map(json!({
            "min_isi_ms": 5000,
            "max_isi_ms": 1000
        })))
        .unwrap_err();
        assert!(matches!(err, ConfigError::IsiRangeInverted { .. }));
    }

    #[test]
    fn decision_threshold_must_be_a_probability() {
        for bad in [0.0, 1.0, 1.5, -0.2] {
            let err = TestConfig::from_map(&map(json!({ "decision_threshold": bad })))
                .unwrap_err();
            assert!(matches!(err, ConfigError::ThresholdOutOfRange(_)), "{bad}");
        }
    }

    #[test]
    fn false_start_threshold_must_precede_lapse_threshold() {
        let err = TestConfig::from_map(&map(json!({
            "false_start_threshold_ms": 400,
            "lapse_threshold_ms": 355
        })))
        .unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdOrderViolated { .. }));
    }

    #[test]
    fn response_ceiling_covers_lapse_range_responses() {
        let config = TestConfig::default();
        assert_eq!(config.response_ceiling_ms(), 4_355);
        assert!(config.response_ceiling_ms() > config.lapse_threshold_ms);
    }
}
