//! JSON snapshot of a learner's state.
//!
//! camelCase field names, skills as a flat array (sorted by id), cards with
//! their scheduling fields inlined. Import normalizes out-of-range numbers
//! back into the model's bounds instead of rejecting the file.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::card::Flashcard;
use crate::constants::MIN_EASE_FACTOR;
use crate::skill::{SkillMap, SkillNode};
use crate::time::now_iso8601;
use crate::tracer::clamp_mastery;

pub const CURRENT_VERSION: &str = "1";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub learner: String,
    #[serde(default)]
    pub skills: Vec<SkillNode>,
    #[serde(default)]
    pub cards: Vec<Flashcard>,
}

impl Snapshot {
    pub fn skill_map(&self) -> SkillMap {
        self.skills
            .iter()
            .map(|n| (n.id.clone(), n.clone()))
            .collect()
    }
}

#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    UnsupportedVersion(String),
    DuplicateSkill(String),
    DuplicateCard(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Json(e) => write!(f, "invalid snapshot JSON: {e}"),
            SnapshotError::UnsupportedVersion(v) => {
                write!(f, "unsupported snapshot version '{v}' (expected {CURRENT_VERSION})")
            }
            SnapshotError::DuplicateSkill(id) => write!(f, "skill '{id}' appears twice"),
            SnapshotError::DuplicateCard(id) => write!(f, "card '{id}' appears twice"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Json(e)
    }
}

/// Serialize a learner's skills and cards. Card order is preserved.
pub fn export_json(
    learner: &str,
    skills: &SkillMap,
    cards: &[Flashcard],
) -> Result<String, serde_json::Error> {
    let mut nodes: Vec<SkillNode> = skills.values().cloned().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let snapshot = Snapshot {
        version: CURRENT_VERSION.to_string(),
        timestamp: now_iso8601(),
        learner: learner.to_string(),
        skills: nodes,
        cards: cards.to_vec(),
    };
    serde_json::to_string_pretty(&snapshot)
}

/// Parse and normalize a snapshot.
pub fn import_json(json: &str) -> Result<Snapshot, SnapshotError> {
    let mut snapshot: Snapshot = serde_json::from_str(json)?;
    if snapshot.version != CURRENT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(snapshot.version));
    }

    let mut seen = HashSet::new();
    for node in &mut snapshot.skills {
        if !seen.insert(node.id.clone()) {
            return Err(SnapshotError::DuplicateSkill(node.id.clone()));
        }
        let clamped = clamp_mastery(node.mastery_probability);
        if clamped != node.mastery_probability {
            tracing::warn!(
                skill = %node.id,
                from = node.mastery_probability,
                to = clamped,
                "mastery out of bounds, clamped"
            );
            node.mastery_probability = clamped;
        }
        if !node.average_response_time.is_finite() || node.average_response_time < 0.0 {
            node.average_response_time = 0.0;
        }
    }

    let mut seen = HashSet::new();
    for card in &mut snapshot.cards {
        if !seen.insert(card.id.clone()) {
            return Err(SnapshotError::DuplicateCard(card.id.clone()));
        }
        if card.review.ease_factor.is_nan() || card.review.ease_factor < MIN_EASE_FACTOR {
            tracing::warn!(card = %card.id, ease = card.review.ease_factor, "ease below floor, clamped");
            card.review.ease_factor = MIN_EASE_FACTOR;
        }
    }

    Ok(snapshot)
}
