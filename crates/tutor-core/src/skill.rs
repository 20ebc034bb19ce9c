use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::params::sanitize_seconds;

/// Flat collection of every skill node, keyed by id.
///
/// Sub-skills and their parent topics live side by side so both can be
/// resolved in O(1) from an interaction.
pub type SkillMap = HashMap<String, SkillNode>;

/// One learnable unit: either a parent topic or a leaf sub-skill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub is_parent: bool,
    /// Set on leaves only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// P(learned), kept inside [0.01, 0.99].
    pub mastery_probability: f64,
    #[serde(default)]
    pub total_attempts: u32,
    #[serde(default)]
    pub correct_streak: u32,
    /// Running mean of time spent across all attempts, in seconds.
    #[serde(default)]
    pub average_response_time: f64,
    /// Set on parents only. Structural; the tracer never touches it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_skill_ids: Vec<String>,
}

impl SkillNode {
    pub fn topic(id: &str, name: &str, sub_skill_ids: Vec<String>, p_init: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            is_parent: true,
            parent_id: None,
            mastery_probability: p_init,
            total_attempts: 0,
            correct_streak: 0,
            average_response_time: 0.0,
            sub_skill_ids,
        }
    }

    pub fn sub_skill(id: &str, name: &str, parent_id: &str, p_init: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            is_parent: false,
            parent_id: Some(parent_id.to_string()),
            mastery_probability: p_init,
            total_attempts: 0,
            correct_streak: 0,
            average_response_time: 0.0,
            sub_skill_ids: Vec::new(),
        }
    }

    /// Bump counters for one attempt and fold `time_spent_seconds` into the
    /// running mean.
    pub fn record_attempt(&mut self, is_correct: bool, time_spent_seconds: f64) {
        let t = sanitize_seconds(time_spent_seconds);
        let n = self.total_attempts as f64;
        self.average_response_time += (t - self.average_response_time) / (n + 1.0);
        self.total_attempts = self.total_attempts.saturating_add(1);
        if is_correct {
            self.correct_streak = self.correct_streak.saturating_add(1);
        } else {
            self.correct_streak = 0;
        }
    }
}
