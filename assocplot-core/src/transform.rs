//! Raw significance values to display scores

use serde::{Deserialize, Serialize};

use crate::error::{AssocError, AssocResult};

/// `-log10(f64::MIN_POSITIVE)`, the score of the smallest normal p-value
pub const DEFAULT_SCORE_CEILING: f64 = 307.652_655_568_588_8;

pub fn neg_log10(raw_value: f64) -> f64 {
    -raw_value.log10()
}

/// What to do with a raw value that has no finite score (zero, negative, NaN or infinite)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum NonPositivePolicy {
    /// Replace the score with a fixed ceiling
    Clamp { ceiling: f64 },
    /// Discard the interval
    Drop,
    /// Fail the chromosome
    Reject,
}

impl NonPositivePolicy {
    /// Clamp policy; the ceiling must be a finite score
    pub fn clamp(ceiling: f64) -> AssocResult<Self> {
        if !ceiling.is_finite() {
            return Err(AssocError::InvalidCeiling { ceiling });
        }
        Ok(NonPositivePolicy::Clamp { ceiling })
    }
}

impl Default for NonPositivePolicy {
    fn default() -> Self {
        NonPositivePolicy::Clamp {
            ceiling: DEFAULT_SCORE_CEILING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreTransform {
    pub policy: NonPositivePolicy,
}

impl ScoreTransform {
    pub fn new(policy: NonPositivePolicy) -> Self {
        Self { policy }
    }

    /// Score for `raw_value`; `Ok(None)` means the interval is dropped
    pub fn score(&self, raw_value: f64) -> AssocResult<Option<f64>> {
        if raw_value > 0.0 && raw_value.is_finite() {
            return Ok(Some(neg_log10(raw_value)));
        }
        match self.policy {
            NonPositivePolicy::Clamp { ceiling } if ceiling.is_finite() => Ok(Some(ceiling)),
            NonPositivePolicy::Clamp { ceiling } => Err(AssocError::InvalidCeiling { ceiling }),
            NonPositivePolicy::Drop => Ok(None),
            NonPositivePolicy::Reject => Err(AssocError::Transform { raw_value }),
        }
    }
}
