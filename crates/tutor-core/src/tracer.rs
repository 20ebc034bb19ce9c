//! Hierarchical Bayesian Knowledge Tracing.
//!
//! One interaction updates the named sub-skill with the time-adjusted BKT
//! parameters, then updates its parent topic with the same evidence seen
//! through noisier (diluted) slip/guess. The skills map is never mutated in
//! place: callers get a new map back and thread it into the next call.

use crate::constants::{MASTERY_CEIL, MASTERY_FLOOR, PARENT_DILUTION};
use crate::difficulty::Difficulty;
use crate::interaction::Interaction;
use crate::params::BktParams;
use crate::skill::SkillMap;

/// What happened to a single node during an update.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceStep {
    pub node_id: String,
    pub before: f64,
    pub after: f64,
    /// Slip/guess actually used for this node after dilution and the time
    /// adjustment.
    pub effective: BktParams,
}

impl TraceStep {
    pub fn delta(&self) -> f64 {
        self.after - self.before
    }
}

/// Per-node outcome of [`update_with_report`]. `None` means the id was not
/// in the map and that node was skipped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraceReport {
    pub sub_skill: Option<TraceStep>,
    pub topic: Option<TraceStep>,
}

/// BKT posterior P(L | evidence).
///
/// A zero denominator yields 0. With slip and guess inside (0, 1) this never
/// happens, but the function stays total for degenerate inputs.
pub fn posterior(p_learned: f64, is_correct: bool, p_slip: f64, p_guess: f64) -> f64 {
    let (num, den) = if is_correct {
        let num = p_learned * (1.0 - p_slip);
        (num, num + (1.0 - p_learned) * p_guess)
    } else {
        let num = p_learned * p_slip;
        (num, num + (1.0 - p_learned) * (1.0 - p_guess))
    };
    if den == 0.0 { 0.0 } else { num / den }
}

/// Learning transition applied after the evidence step.
pub fn learn(p_given_evidence: f64, p_transit: f64) -> f64 {
    p_given_evidence + (1.0 - p_given_evidence) * p_transit
}

/// Keep a mastery estimate away from 0 and 1. NaN maps to the floor.
pub fn clamp_mastery(p: f64) -> f64 {
    if p.is_nan() {
        MASTERY_FLOOR
    } else {
        p.clamp(MASTERY_FLOOR, MASTERY_CEIL)
    }
}

/// One full BKT step for a single node: time adjustment, posterior,
/// transition, clamp. Returns the next mastery and the parameters used.
pub fn next_mastery(
    p_learned: f64,
    is_correct: bool,
    time_spent_seconds: f64,
    difficulty: Difficulty,
    params: &BktParams,
) -> (f64, BktParams) {
    let effective = params.time_adjusted(is_correct, time_spent_seconds, difficulty);
    let post = posterior(p_learned, is_correct, effective.p_slip, effective.p_guess);
    let next = clamp_mastery(learn(post, effective.p_transit));
    (next, effective)
}

/// Apply one interaction and return the updated skills map.
///
/// Touches at most two entries: `interaction.sub_skill_id` and
/// `interaction.topic_id`. An id missing from the map is skipped silently;
/// the other node still updates.
pub fn update(skills: &SkillMap, interaction: &Interaction, params: &BktParams) -> SkillMap {
    update_with_report(skills, interaction, params).0
}

/// [`update`], also returning what changed on each node.
pub fn update_with_report(
    skills: &SkillMap,
    interaction: &Interaction,
    params: &BktParams,
) -> (SkillMap, TraceReport) {
    let mut next = skills.clone();
    let mut report = TraceReport::default();

    report.sub_skill = apply_to_node(&mut next, &interaction.sub_skill_id, interaction, params);

    let parent_params = params.diluted(PARENT_DILUTION);
    report.topic = apply_to_node(&mut next, &interaction.topic_id, interaction, &parent_params);

    (next, report)
}

fn apply_to_node(
    skills: &mut SkillMap,
    id: &str,
    interaction: &Interaction,
    params: &BktParams,
) -> Option<TraceStep> {
    let Some(node) = skills.get_mut(id) else {
        tracing::trace!(node = id, "skill not found, skipping");
        return None;
    };

    let before = node.mastery_probability;
    let (after, effective) = next_mastery(
        before,
        interaction.is_correct,
        interaction.time_spent_seconds,
        interaction.difficulty,
        params,
    );

    node.mastery_probability = after;
    node.record_attempt(interaction.is_correct, interaction.time_spent_seconds);

    tracing::debug!(
        node = id,
        before,
        after,
        slip = effective.p_slip,
        guess = effective.p_guess,
        "mastery updated"
    );

    Some(TraceStep {
        node_id: id.to_string(),
        before,
        after,
        effective,
    })
}
