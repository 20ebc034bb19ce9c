//! Session replay: fold a batch of interactions through the tracer.
//!
//! Interactions are applied strictly left to right, each one against the map
//! produced by the previous step. The input map is left untouched.
//!
//! [`SimulatedLearner`] generates interactions from a hidden BKT learner so a
//! parameter set can be exercised without a real student.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;

use crate::difficulty::{Difficulty, difficulty_for_mastery};
use crate::interaction::Interaction;
use crate::params::BktParams;
use crate::skill::SkillMap;
use crate::tracer::{TraceReport, update_with_report};

/// Outcome of replaying a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub skills: SkillMap,
    /// One entry per interaction, in order.
    pub steps: Vec<TraceReport>,
    pub correct: usize,
    pub total: usize,
    /// Final minus initial mastery for every node the session touched.
    pub deltas: BTreeMap<String, f64>,
}

impl SessionReport {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Apply `interactions` in order starting from `skills`.
pub fn replay(skills: &SkillMap, interactions: &[Interaction], params: &BktParams) -> SessionReport {
    let mut fold = Fold::new(skills, interactions.len());
    for interaction in interactions {
        fold.apply(interaction, params);
    }
    fold.finish(skills)
}

/// Running state of a session as interactions are applied one by one.
struct Fold {
    current: SkillMap,
    steps: Vec<TraceReport>,
    correct: usize,
}

impl Fold {
    fn new(skills: &SkillMap, capacity: usize) -> Self {
        Self {
            current: skills.clone(),
            steps: Vec::with_capacity(capacity),
            correct: 0,
        }
    }

    fn apply(&mut self, interaction: &Interaction, params: &BktParams) {
        let (next, report) = update_with_report(&self.current, interaction, params);
        if interaction.is_correct {
            self.correct += 1;
        }
        self.current = next;
        self.steps.push(report);
    }

    fn finish(self, initial: &SkillMap) -> SessionReport {
        let deltas = touched_deltas(initial, &self.current, &self.steps);
        tracing::debug!(
            interactions = self.steps.len(),
            touched = deltas.len(),
            "session folded"
        );
        SessionReport {
            total: self.steps.len(),
            skills: self.current,
            steps: self.steps,
            correct: self.correct,
            deltas,
        }
    }
}

fn touched_deltas(initial: &SkillMap, last: &SkillMap, steps: &[TraceReport]) -> BTreeMap<String, f64> {
    let mut deltas = BTreeMap::new();
    for step in steps {
        for trace in [&step.sub_skill, &step.topic].into_iter().flatten() {
            if deltas.contains_key(&trace.node_id) {
                continue;
            }
            if let (Some(before), Some(after)) = (initial.get(&trace.node_id), last.get(&trace.node_id)) {
                deltas.insert(
                    trace.node_id.clone(),
                    after.mastery_probability - before.mastery_probability,
                );
            }
        }
    }
    deltas
}

/// A synthetic student driven by the BKT generative model.
///
/// Each sub-skill is either learned or not. Learned skills answer correctly
/// with probability `1 - p_slip`, unlearned ones with `p_guess`. Every
/// opportunity may flip an unlearned skill to learned with `p_transit`.
pub struct SimulatedLearner<R: Rng> {
    truth: BktParams,
    learned: HashMap<String, bool>,
    rng: R,
}

impl<R: Rng> SimulatedLearner<R> {
    pub fn new(truth: BktParams, rng: R) -> Self {
        Self {
            truth,
            learned: HashMap::new(),
            rng,
        }
    }

    /// Whether the hidden state for `sub_skill_id` is learned. Unseen skills
    /// report `false`.
    pub fn knows(&self, sub_skill_id: &str) -> bool {
        self.learned.get(sub_skill_id).copied().unwrap_or(false)
    }

    /// Attempt one problem on a random sub-skill of `skills`, at the
    /// difficulty the current estimate suggests. `None` when the map has no
    /// sub-skill with a parent.
    pub fn attempt(&mut self, skills: &SkillMap) -> Option<Interaction> {
        let mut leaves: Vec<(&str, &str, f64)> = skills
            .values()
            .filter(|n| !n.is_parent)
            .filter_map(|n| {
                n.parent_id
                    .as_deref()
                    .map(|parent| (n.id.as_str(), parent, n.mastery_probability))
            })
            .collect();
        if leaves.is_empty() {
            return None;
        }
        // HashMap order is unstable; sort so a seeded rng is reproducible.
        leaves.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let (skill_id, topic_id, estimate) = leaves[self.rng.random_range(0..leaves.len())];
        let difficulty = difficulty_for_mastery(estimate);

        let p_init = self.truth.p_init;
        let rng = &mut self.rng;
        let knows = *self
            .learned
            .entry(skill_id.to_string())
            .or_insert_with(|| rng.random_bool(p_init));

        let is_correct = if knows {
            !self.rng.random_bool(self.truth.p_slip)
        } else {
            self.rng.random_bool(self.truth.p_guess)
        };
        let time_spent_seconds = self.response_time(knows, difficulty);

        if !knows && self.rng.random_bool(self.truth.p_transit) {
            self.learned.insert(skill_id.to_string(), true);
        }

        Some(Interaction::new(
            topic_id,
            skill_id,
            is_correct,
            time_spent_seconds,
            difficulty,
        ))
    }

    /// Knowing students answer in 0.5-1.5× the expected time, others in
    /// 0.8-2.8×.
    fn response_time(&mut self, knows: bool, difficulty: Difficulty) -> f64 {
        let (lo, hi) = if knows { (0.5, 1.5) } else { (0.8, 2.8) };
        difficulty.expected_seconds() * self.rng.random_range(lo..hi)
    }
}

/// Run `steps` simulated attempts, each against the latest estimates.
pub fn simulate<R: Rng>(
    skills: &SkillMap,
    params: &BktParams,
    learner: &mut SimulatedLearner<R>,
    steps: usize,
) -> (Vec<Interaction>, SessionReport) {
    let mut fold = Fold::new(skills, steps);
    let mut interactions = Vec::with_capacity(steps);

    for _ in 0..steps {
        let Some(interaction) = learner.attempt(&fold.current) else {
            break;
        };
        fold.apply(&interaction, params);
        interactions.push(interaction);
    }

    (interactions, fold.finish(skills))
}
