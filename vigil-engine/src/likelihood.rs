use serde::{Deserialize, Serialize};
use thiserror::Error;
use vigil_core::OutcomeClass;

use crate::bins::BIN_COUNT;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("likelihood table is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("likelihood ratio for bin {bin}, class {class:?} must be finite and positive, got {value}")]
    NonPositiveRatio {
        bin: usize,
        class: OutcomeClass,
        value: f64,
    },
}

/// Multiplicative likelihood ratio per vigilance category for one
/// (bin, outcome class) cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ratios {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

/// Outcome-conditioned likelihood ratios, one `Ratios` per 30 s bin per
/// outcome class. This is injected scientific input, not program structure:
/// the engine only multiplies through whatever it is given, so a recalibrated
/// table swaps in without touching the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodTable {
    pub valid: [Ratios; BIN_COUNT],
    pub lapse: [Ratios; BIN_COUNT],
    pub false_start: [Ratios; BIN_COUNT],
}

impl LikelihoodTable {
    pub fn lookup(&self, bin: usize, class: OutcomeClass) -> Ratios {
        let row = match class {
            OutcomeClass::Valid => &self.valid,
            OutcomeClass::Lapse => &self.lapse,
            OutcomeClass::FalseStart => &self.false_start,
        };
        row[bin.min(BIN_COUNT - 1)]
    }

    /// Parses and validates a table from JSON.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Every ratio must be finite and strictly positive so the posterior can
    /// never collapse to an all-zero state.
    pub fn validate(&self) -> Result<(), TableError> {
        let rows = [
            (OutcomeClass::Valid, &self.valid),
            (OutcomeClass::Lapse, &self.lapse),
            (OutcomeClass::FalseStart, &self.false_start),
        ];
        for (class, row) in rows {
            for (bin, ratios) in row.iter().enumerate() {
                for value in [ratios.high, ratios.medium, ratios.low] {
                    if !value.is_finite() || value <= 0.0 {
                        return Err(TableError::NonPositiveRatio { bin, class, value });
                    }
                }
            }
        }
        Ok(())
    }

    /// A flat table that leaves every posterior untouched. Useful for
    /// exercising the counting rules in isolation.
    pub fn uniform() -> Self {
        let one = Ratios {
            high: 1.0,
            medium: 1.0,
            low: 1.0,
        };
        Self {
            valid: [one; BIN_COUNT],
            lapse: [one; BIN_COUNT],
            false_start: [one; BIN_COUNT],
        }
    }
}

macro_rules! ratios {
    ($h:expr, $m:expr, $l:expr) => {
        Ratios {
            high: $h,
            medium: $m,
            low: $l,
        }
    };
}

impl Default for LikelihoodTable {
    /// Calibration following the published model's structure: staying fast
    /// is evidence for HIGH and more strongly so late in the test, lapses
    /// weigh increasingly toward LOW, false starts weigh moderately toward
    /// LOW throughout.
    fn default() -> Self {
        Self {
            valid: [
                ratios!(1.32, 1.00, 0.70),
                ratios!(1.36, 1.00, 0.67),
                ratios!(1.40, 1.00, 0.64),
                ratios!(1.44, 1.00, 0.61),
                ratios!(1.48, 1.00, 0.58),
                ratios!(1.52, 1.00, 0.55),
            ],
            lapse: [
                ratios!(0.22, 0.85, 2.60),
                ratios!(0.20, 0.88, 2.80),
                ratios!(0.18, 0.90, 3.00),
                ratios!(0.16, 0.92, 3.20),
                ratios!(0.15, 0.94, 3.40),
                ratios!(0.14, 0.95, 3.60),
            ],
            false_start: [
                ratios!(0.48, 1.02, 1.90),
                ratios!(0.46, 1.02, 2.00),
                ratios!(0.44, 1.02, 2.10),
                ratios!(0.42, 1.02, 2.20),
                ratios!(0.40, 1.02, 2.30),
                ratios!(0.38, 1.02, 2.40),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        assert!(LikelihoodTable::default().validate().is_ok());
    }

    #[test]
    fn lookup_clamps_out_of_range_bins() {
        let table = LikelihoodTable::default();
        assert_eq!(
            table.lookup(99, OutcomeClass::Lapse),
            table.lookup(5, OutcomeClass::Lapse)
        );
    }

    #[test]
    fn json_round_trip_preserves_the_table() {
        let table = LikelihoodTable::default();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(LikelihoodTable::from_json(&json).unwrap(), table);
    }

    #[test]
    fn zero_and_negative_ratios_are_rejected() {
        let mut table = LikelihoodTable::default();
        table.lapse[3].low = 0.0;
        assert!(matches!(
            table.validate(),
            Err(TableError::NonPositiveRatio {
                bin: 3,
                class: OutcomeClass::Lapse,
                ..
            })
        ));

        table.lapse[3].low = -1.5;
        assert!(table.validate().is_err());
    }

    #[test]
    fn nan_ratio_is_rejected() {
        let mut table = LikelihoodTable::default();
        table.valid[0].high = f64::NAN;
        assert!(table.validate().is_err());
    }
}
