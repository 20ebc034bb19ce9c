//! BKT parameters and the time-aware slip/guess adjustment.
//!
//! Base parameters are deployment configuration. Every adjustment returns a
//! fresh [`BktParams`]; nothing here mutates what the caller passed in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    FAST_CORRECT_GUESS_DELTA, FAST_FACTOR, FAST_WRONG_SLIP_DELTA, SLIP_GUESS_CAP,
    SLOW_CORRECT_GUESS_DELTA, SLOW_CORRECT_SLIP_DELTA, SLOW_FACTOR,
};
use crate::difficulty::Difficulty;

/// Standard four-parameter BKT model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BktParams {
    /// Initial mastery for any new node.
    pub p_init: f64,
    /// Probability of learning on each opportunity.
    pub p_transit: f64,
    /// Probability a knowing student answers wrong.
    pub p_slip: f64,
    /// Probability a non-knowing student answers right.
    pub p_guess: f64,
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            p_init: 0.10,
            p_transit: 0.15,
            p_slip: 0.10,
            p_guess: 0.20,
        }
    }
}

/// A parameter outside the open interval (0, 1).
#[derive(Debug, Clone, PartialEq)]
pub struct ParamError {
    pub name: &'static str,
    pub value: f64,
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BKT parameter {} = {} must be a probability strictly between 0 and 1",
            self.name, self.value
        )
    }
}

impl std::error::Error for ParamError {}

impl BktParams {
    /// Check every parameter is a finite probability in (0, 1).
    ///
    /// Meant for configuration boundaries. The tracer itself never calls this
    /// and stays total for any input.
    pub fn validate(&self) -> Result<(), ParamError> {
        for (name, value) in [
            ("p_init", self.p_init),
            ("p_transit", self.p_transit),
            ("p_slip", self.p_slip),
            ("p_guess", self.p_guess),
        ] {
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(ParamError { name, value });
            }
        }
        Ok(())
    }

    /// Slip and guess raised by `delta`, used when evidence about a sub-skill
    /// is applied to its parent topic.
    pub fn diluted(&self, delta: f64) -> Self {
        Self {
            p_slip: self.p_slip + delta,
            p_guess: self.p_guess + delta,
            ..*self
        }
    }

    /// Adjust slip/guess for how long the answer took relative to the
    /// expected time at `difficulty`, then cap both at 0.5.
    ///
    /// | outcome | time               | effect                     |
    /// |---------|--------------------|----------------------------|
    /// | correct | > 2.5 × expected   | guess +0.15, slip +0.05    |
    /// | correct | < 0.2 × expected   | guess +0.30                |
    /// | wrong   | < 0.2 × expected   | slip +0.30                 |
    /// | wrong   | otherwise          | none                       |
    pub fn time_adjusted(
        &self,
        is_correct: bool,
        time_spent_seconds: f64,
        difficulty: Difficulty,
    ) -> Self {
        let expected = difficulty.expected_seconds();
        let t = sanitize_seconds(time_spent_seconds);
        let mut slip = self.p_slip;
        let mut guess = self.p_guess;

        if is_correct {
            if t > SLOW_FACTOR * expected {
                guess += SLOW_CORRECT_GUESS_DELTA;
                slip += SLOW_CORRECT_SLIP_DELTA;
            } else if t < FAST_FACTOR * expected {
                guess += FAST_CORRECT_GUESS_DELTA;
            }
        } else if t < FAST_FACTOR * expected {
            slip += FAST_WRONG_SLIP_DELTA;
        }

        Self {
            p_slip: slip.min(SLIP_GUESS_CAP),
            p_guess: guess.min(SLIP_GUESS_CAP),
            ..*self
        }
    }
}

/// Negative, NaN or infinite times collapse to 0 so the adjustment is total.
pub(crate) fn sanitize_seconds(t: f64) -> f64 {
    if t.is_finite() && t > 0.0 { t } else { 0.0 }
}
