use serde::{Deserialize, Serialize};

use crate::difficulty::Difficulty;

/// One attempt at a problem, produced upstream by the problem-solving UI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub topic_id: String,
    pub sub_skill_id: String,
    pub is_correct: bool,
    pub time_spent_seconds: f64,
    pub difficulty: Difficulty,
}

impl Interaction {
    pub fn new(
        topic_id: &str,
        sub_skill_id: &str,
        is_correct: bool,
        time_spent_seconds: f64,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            topic_id: topic_id.to_string(),
            sub_skill_id: sub_skill_id.to_string(),
            is_correct,
            time_spent_seconds,
            difficulty,
        }
    }
}
