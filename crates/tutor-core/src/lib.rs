//! Student knowledge model for an adaptive combinatorics tutor.
//!
//! Two independent engines over small state records:
//!
//! - a hierarchical Bayesian Knowledge Tracing (BKT) tracer that updates
//!   per-skill mastery from timed right/wrong attempts and propagates diluted
//!   evidence from a sub-skill to its parent topic;
//! - an SM-2 review scheduler for flashcards with a due-set query.
//!
//! No I/O: pure functions over plain data.
//! Callers own the skills map and card list and thread them through calls.

pub mod card;
pub mod constants;
pub mod curriculum;
pub mod difficulty;
pub mod interaction;
pub mod params;
pub mod review;
pub mod serde_compat;
pub mod session;
pub mod skill;
pub mod time;
pub mod tracer;

pub use card::Flashcard;
pub use constants::{
    INITIAL_EASE_FACTOR, MASTERY_CEIL, MASTERY_FLOOR, MIN_EASE_FACTOR, MS_PER_DAY,
    PARENT_DILUTION,
};
pub use curriculum::{Curriculum, CurriculumError, SubSkillDef, TopicDef, orphaned_sub_skills};
pub use difficulty::{Difficulty, UnknownDifficulty, difficulty_for_mastery};
pub use interaction::Interaction;
pub use params::{BktParams, ParamError};
pub use review::{Grade, GradeError, ReviewCard, due_cards, next_state, preview_intervals};
pub use serde_compat::{CURRENT_VERSION, Snapshot, SnapshotError, export_json, import_json};
pub use session::{SessionReport, SimulatedLearner, replay, simulate};
pub use skill::{SkillMap, SkillNode};
pub use time::{days_until, now_iso8601, now_unix_millis, unix_millis_to_iso8601};
pub use tracer::{TraceReport, TraceStep, update, update_with_report};
