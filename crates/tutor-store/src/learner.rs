use std::path::{Path, PathBuf};
use std::{env, fs};

use tutor_core::{
    BktParams, Curriculum, Flashcard, Grade, Interaction, SkillMap, Snapshot, TraceReport,
    due_cards, orphaned_sub_skills, update_with_report,
};

use crate::config::{CONFIG_FILE, TutorConfig};
use crate::error::{Result, StoreError};
use crate::store::Store;

pub const DEFAULT_LEARNER: &str = "default";

/// Default base directory for all tutor storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".tutor")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Sanitize a learner name for use as a filename.
fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn resolve_learner_id(name: Option<&str>) -> String {
    name.map(sanitize_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_LEARNER.to_string())
}

/// One learner's database plus the shared tracer configuration.
///
/// Layout:
/// ```text
/// ~/.tutor/
/// ├── tutor.toml
/// └── learners/
///     ├── default.db
///     └── <name>.db
/// ```
pub struct LearnerStore {
    store: Store,
    config: TutorConfig,
    learner_id: String,
}

impl LearnerStore {
    /// Open the learner's store, creating directories as needed.
    /// `learner`: explicit learner name (falls back to `default`).
    /// `base_dir`: override the base directory (for testing).
    pub fn open(learner: Option<&str>, base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        let learners_dir = base.join("learners");

        fs::create_dir_all(&learners_dir).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", learners_dir.display()))
        })?;

        let config = TutorConfig::load(&base.join(CONFIG_FILE))?;
        let learner_id = resolve_learner_id(learner);
        let store = Store::open(&learners_dir.join(format!("{learner_id}.db")))?;
        store.set_metadata("learner", &learner_id)?;

        tracing::debug!(learner = %learner_id, base = %base.display(), "learner store opened");
        Ok(Self {
            store,
            config,
            learner_id,
        })
    }

    /// Open with an in-memory store and default config (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            store: Store::open_in_memory()?,
            config: TutorConfig::default(),
            learner_id: "test".to_string(),
        })
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn params(&self) -> &BktParams {
        &self.config.bkt
    }

    pub fn load_skills(&self) -> Result<SkillMap> {
        self.store.load_skills()
    }

    /// Seed the skill tree from a curriculum at the configured `p_init`.
    ///
    /// Refuses to overwrite existing skills unless `force` is set; forcing
    /// also clears nothing else (cards and history stay).
    pub fn seed(&self, curriculum: &Curriculum, force: bool) -> Result<SkillMap> {
        let existing = self.store.skill_count()?;
        if existing > 0 && !force {
            return Err(StoreError::InvalidData(format!(
                "learner '{}' already has {existing} skills",
                self.learner_id
            )));
        }

        let skills = curriculum
            .seed(self.config.bkt.p_init)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        self.store.save_skills(&skills)?;
        tracing::info!(learner = %self.learner_id, skills = skills.len(), "skills seeded");
        Ok(skills)
    }

    /// Run one interaction through the tracer and persist the nodes it
    /// touched along with the interaction itself.
    pub fn record_interaction(&self, interaction: &Interaction, now_ms: i64) -> Result<TraceReport> {
        let skills = self.store.load_skills()?;
        let (next, report) = update_with_report(&skills, interaction, &self.config.bkt);

        let touched: Vec<_> = [&report.sub_skill, &report.topic]
            .into_iter()
            .flatten()
            .filter_map(|step| next.get(&step.node_id))
            .collect();
        if touched.is_empty() {
            tracing::warn!(
                topic = %interaction.topic_id,
                skill = %interaction.sub_skill_id,
                "interaction matched no known skill"
            );
        }

        self.store.commit_interaction(touched, interaction, now_ms)?;
        Ok(report)
    }

    /// Persist a replayed or simulated session.
    pub fn commit_session(
        &self,
        skills: &SkillMap,
        interactions: &[Interaction],
        now_ms: i64,
    ) -> Result<()> {
        self.store.commit_session(skills, interactions, now_ms)?;
        tracing::info!(
            learner = %self.learner_id,
            interactions = interactions.len(),
            "session committed"
        );
        Ok(())
    }

    /// Create a fresh card, due immediately, with a random id.
    pub fn add_card(&self, deck: &str, front: &str, back: &str, now_ms: i64) -> Result<Flashcard> {
        let id = uuid::Uuid::new_v4().to_string();
        let card = Flashcard::new(&id, deck, front, back, now_ms);
        self.store.insert_card(&card)?;
        Ok(card)
    }

    pub fn review_card(&self, id: &str, grade: Grade, now_ms: i64) -> Result<Flashcard> {
        let card = self
            .store
            .get_card(id)?
            .ok_or_else(|| StoreError::NotFound(format!("card {id}")))?;
        let graded = card.graded(grade, now_ms);
        self.store.record_review(&graded, grade, now_ms)?;
        tracing::debug!(
            card = id,
            grade = %grade,
            interval = graded.review.interval,
            ease = graded.review.ease_factor,
            "card reviewed"
        );
        Ok(graded)
    }

    /// Due cards in stored order, optionally limited to one deck.
    pub fn due_cards(&self, deck: Option<&str>, now_ms: i64) -> Result<Vec<Flashcard>> {
        let cards = self.store.load_cards(deck)?;
        Ok(due_cards(&cards, now_ms).into_iter().cloned().collect())
    }

    /// Sub-skills whose parent is missing from the stored map.
    pub fn orphaned_sub_skills(&self) -> Result<Vec<String>> {
        Ok(orphaned_sub_skills(&self.store.load_skills()?))
    }

    pub fn import_json_file(&self, path: &Path) -> Result<Snapshot> {
        self.store.import_json_file(path)
    }

    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        self.store.export_json_file(&self.learner_id, path)
    }
}
