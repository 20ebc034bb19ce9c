use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Problem difficulty tier.
///
/// Drives the expected response time used by the time-aware slip/guess
/// adjustment, and is the output of [`difficulty_for_mastery`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Basic,
    Intermediate,
    Advanced,
    Olympiad,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Basic,
        Difficulty::Intermediate,
        Difficulty::Advanced,
        Difficulty::Olympiad,
    ];

    /// Seconds a student who knows the material typically needs.
    pub fn expected_seconds(self) -> f64 {
        match self {
            Difficulty::Basic => 45.0,
            Difficulty::Intermediate => 90.0,
            Difficulty::Advanced => 180.0,
            Difficulty::Olympiad => 400.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Basic => "basic",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Olympiad => "olympiad",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a difficulty name is not one of the four tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDifficulty(pub String);

impl fmt::Display for UnknownDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown difficulty '{}' (expected basic, intermediate, advanced or olympiad)",
            self.0
        )
    }
}

impl std::error::Error for UnknownDifficulty {}

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Difficulty::Basic),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            "olympiad" => Ok(Difficulty::Olympiad),
            _ => Err(UnknownDifficulty(s.to_string())),
        }
    }
}

/// Pick the next problem tier for a given mastery estimate.
///
/// ≥0.90 → Olympiad, ≥0.70 → Advanced, ≥0.40 → Intermediate, else Basic.
/// NaN falls through to Basic.
pub fn difficulty_for_mastery(p: f64) -> Difficulty {
    if p >= 0.90 {
        Difficulty::Olympiad
    } else if p >= 0.70 {
        Difficulty::Advanced
    } else if p >= 0.40 {
        Difficulty::Intermediate
    } else {
        Difficulty::Basic
    }
}
