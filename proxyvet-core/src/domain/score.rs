use serde::{Deserialize, Serialize};

use crate::error::{CheckerError, Result};

/// Bounds of the verified pool's score axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBounds {
    pub min: i64,
    pub max: i64,
    /// Band width used by the rebalancer (`INC_SCORE`).
    pub step: i64,
}

impl Default for ScoreBounds {
    fn default() -> Self {
        Self {
            min: 0,
            max: 100,
            step: 10,
        }
    }
}

/// Inclusive score range walked by one rebalancer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBand {
    pub lo: i64,
    pub hi: i64,
}

impl ScoreBounds {
    pub fn new(min: i64, max: i64, step: i64) -> Result<Self> {
        let bounds = Self { min, max, step };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min >= self.max {
            return Err(CheckerError::InvalidSettings(format!(
                "score min ({}) must be below max ({})",
                self.min, self.max
            )));
        }
        if self.step <= 0 {
            return Err(CheckerError::InvalidSettings(format!(
                "score step must be positive, got {}",
                self.step
            )));
        }
        Ok(())
    }

    pub fn clamp(&self, score: i64) -> i64 {
        score.clamp(self.min, self.max)
    }

    /// Contiguous bands covering `(min, max]` in increasing order.
    pub fn bands(&self) -> impl Iterator<Item = ScoreBand> + '_ {
        let step = self.step.max(1);
        let max = self.max;
        std::iter::successors(Some(self.min.saturating_add(1)), move |lo| {
            lo.checked_add(step)
        })
        .take_while(move |lo| *lo <= max)
        .map(move |lo| ScoreBand {
            lo,
            hi: lo.saturating_add(step - 1).min(max),
        })
    }
}
