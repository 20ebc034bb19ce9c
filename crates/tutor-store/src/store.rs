use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use tutor_core::{Difficulty, Flashcard, Grade, Interaction, ReviewCard, SkillMap, SkillNode};

use crate::error::{Result, StoreError};
use crate::schema;

/// One learner's database: skills, cards and the raw interaction history.
pub struct Store {
    conn: Connection,
}

type SkillRow = (String, String, bool, Option<String>, f64, u32, u32, f64, String);

const SKILL_COLUMNS: &str = "id, name, is_parent, parent_id, mastery, total_attempts, \
     correct_streak, avg_response_time, sub_skill_ids";

const CARD_COLUMNS: &str =
    "id, deck, front, back, interval_days, repetition, ease_factor, next_review_date";

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Skills ---

    /// Replace the whole skills table with `skills`.
    pub fn save_skills(&self, skills: &SkillMap) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM skills", [])?;
        upsert_skills_on(&tx, skills.values())?;
        tx.commit()?;
        Ok(())
    }

    /// Write only the given nodes, leaving the rest of the table alone.
    pub fn upsert_skills<'a>(&self, nodes: impl IntoIterator<Item = &'a SkillNode>) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        upsert_skills_on(&tx, nodes)?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_skills(&self) -> Result<SkillMap> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SKILL_COLUMNS} FROM skills"))?;

        let rows: Vec<SkillRow> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get::<_, i32>(2)? != 0,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|row| {
                let node = skill_from_row(row)?;
                Ok((node.id.clone(), node))
            })
            .collect()
    }

    pub fn skill_count(&self) -> Result<usize> {
        self.count("skills")
    }

    // --- Cards ---

    pub fn insert_card(&self, card: &Flashcard) -> Result<()> {
        insert_card_on(&self.conn, card)
    }

    /// Persist a card's new scheduling state and log the review that
    /// produced it, atomically.
    pub fn record_review(&self, card: &Flashcard, grade: Grade, reviewed_at: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE cards SET interval_days = ?1, repetition = ?2, ease_factor = ?3,
                 next_review_date = ?4 WHERE id = ?5",
            params![
                card.review.interval,
                card.review.repetition,
                card.review.ease_factor,
                card.review.next_review_date,
                card.id,
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("card {}", card.id)));
        }
        tx.execute(
            "INSERT INTO review_log (card_id, grade, reviewed_at) VALUES (?1, ?2, ?3)",
            params![card.id, grade.quality(), reviewed_at],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_card(&self, id: &str) -> Result<Option<Flashcard>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"),
                [id],
                card_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Cards in insertion order, optionally restricted to one deck.
    pub fn load_cards(&self, deck: Option<&str>) -> Result<Vec<Flashcard>> {
        let cards = match deck {
            Some(deck) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {CARD_COLUMNS} FROM cards WHERE deck = ?1 ORDER BY seq"
                ))?;
                stmt.query_map([deck], card_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {CARD_COLUMNS} FROM cards ORDER BY seq"))?;
                stmt.query_map([], card_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(cards)
    }

    /// Replace every card, keeping the order of `cards`.
    pub fn save_cards(&self, cards: &[Flashcard]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM cards", [])?;
        for card in cards {
            insert_card_on(&tx, card)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn card_count(&self) -> Result<usize> {
        self.count("cards")
    }

    pub fn review_count(&self) -> Result<usize> {
        self.count("review_log")
    }

    // --- Interaction log ---

    pub fn log_interaction(&self, interaction: &Interaction, recorded_at: i64) -> Result<()> {
        log_interaction_on(&self.conn, interaction, recorded_at)
    }

    /// Apply the result of one tracer update: write the touched nodes and
    /// append the interaction, in a single transaction.
    pub fn commit_interaction<'a>(
        &self,
        touched: impl IntoIterator<Item = &'a SkillNode>,
        interaction: &Interaction,
        recorded_at: i64,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        upsert_skills_on(&tx, touched)?;
        log_interaction_on(&tx, interaction, recorded_at)?;
        tx.commit()?;
        Ok(())
    }

    /// Persist the end state of a replayed session together with every
    /// interaction that produced it.
    pub fn commit_session(
        &self,
        skills: &SkillMap,
        interactions: &[Interaction],
        recorded_at: i64,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        upsert_skills_on(&tx, skills.values())?;
        for interaction in interactions {
            log_interaction_on(&tx, interaction, recorded_at)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Full history in the order it was recorded.
    pub fn load_interactions(&self) -> Result<Vec<Interaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT topic_id, sub_skill_id, is_correct, time_spent, difficulty
             FROM interactions ORDER BY id",
        )?;
        let rows: Vec<(String, String, bool, f64, String)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get::<_, i32>(2)? != 0,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(topic_id, sub_skill_id, is_correct, time_spent_seconds, difficulty)| {
                let difficulty = difficulty
                    .parse::<Difficulty>()
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                Ok(Interaction {
                    topic_id,
                    sub_skill_id,
                    is_correct,
                    time_spent_seconds,
                    difficulty,
                })
            })
            .collect()
    }

    pub fn interaction_count(&self) -> Result<usize> {
        self.count("interactions")
    }

    fn count(&self, table: &str) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

pub(crate) fn upsert_skills_on<'a>(
    conn: &Connection,
    nodes: impl IntoIterator<Item = &'a SkillNode>,
) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "INSERT OR REPLACE INTO skills ({SKILL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    ))?;
    for node in nodes {
        let sub_skill_ids = serde_json::to_string(&node.sub_skill_ids)
            .map_err(|e| StoreError::InvalidData(format!("sub-skill ids of {}: {e}", node.id)))?;
        stmt.execute(params![
            node.id,
            node.name,
            node.is_parent as i32,
            node.parent_id,
            node.mastery_probability,
            node.total_attempts,
            node.correct_streak,
            node.average_response_time,
            sub_skill_ids,
        ])?;
    }
    Ok(())
}

fn skill_from_row(row: SkillRow) -> Result<SkillNode> {
    let (
        id,
        name,
        is_parent,
        parent_id,
        mastery_probability,
        total_attempts,
        correct_streak,
        average_response_time,
        sub_skill_ids,
    ) = row;
    let sub_skill_ids: Vec<String> = serde_json::from_str(&sub_skill_ids)
        .map_err(|e| StoreError::InvalidData(format!("sub-skill ids of {id}: {e}")))?;
    Ok(SkillNode {
        id,
        name,
        is_parent,
        parent_id,
        mastery_probability,
        total_attempts,
        correct_streak,
        average_response_time,
        sub_skill_ids,
    })
}

pub(crate) fn insert_card_on(conn: &Connection, card: &Flashcard) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO cards ({CARD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            card.id,
            card.deck,
            card.front,
            card.back,
            card.review.interval,
            card.review.repetition,
            card.review.ease_factor,
            card.review.next_review_date,
        ],
    )?;
    Ok(())
}

fn card_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Flashcard> {
    Ok(Flashcard {
        id: row.get(0)?,
        deck: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        review: ReviewCard {
            interval: row.get(4)?,
            repetition: row.get(5)?,
            ease_factor: row.get(6)?,
            next_review_date: row.get(7)?,
        },
    })
}

fn log_interaction_on(conn: &Connection, interaction: &Interaction, recorded_at: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO interactions (topic_id, sub_skill_id, is_correct, time_spent, difficulty, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            interaction.topic_id,
            interaction.sub_skill_id,
            interaction.is_correct as i32,
            interaction.time_spent_seconds,
            interaction.difficulty.as_str(),
            recorded_at,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::{BktParams, Curriculum, SubSkillDef, TopicDef, update};

    const NOW: i64 = 1_771_632_000_000;

    fn make_skills() -> SkillMap {
        Curriculum {
            topics: vec![TopicDef {
                id: "counting".into(),
                name: "Counting".into(),
                sub_skills: vec![
                    SubSkillDef {
                        id: "perm".into(),
                        name: "Permutations".into(),
                    },
                    SubSkillDef {
                        id: "comb".into(),
                        name: "Combinations".into(),
                    },
                ],
            }],
        }
        .seed(0.1)
        .unwrap()
    }

    #[test]
    fn test_skills_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let skills = make_skills();
        store.save_skills(&skills).unwrap();

        let loaded = store.load_skills().unwrap();
        assert_eq!(loaded, skills);
        assert_eq!(loaded["counting"].sub_skill_ids, vec!["perm", "comb"]);
        assert_eq!(store.skill_count().unwrap(), 3);
    }

    #[test]
    fn test_save_skills_replaces_table() {
        let store = Store::open_in_memory().unwrap();
        store.save_skills(&make_skills()).unwrap();

        let mut smaller = make_skills();
        smaller.remove("comb");
        store.save_skills(&smaller).unwrap();
        assert_eq!(store.load_skills().unwrap().len(), 2);
    }

    #[test]
    fn test_commit_interaction_updates_touched_nodes() {
        let store = Store::open_in_memory().unwrap();
        let skills = make_skills();
        store.save_skills(&skills).unwrap();

        let interaction = Interaction::new("counting", "perm", true, 45.0, Difficulty::Basic);
        let next = update(&skills, &interaction, &BktParams::default());
        store
            .commit_interaction([&next["perm"], &next["counting"]], &interaction, NOW)
            .unwrap();

        let loaded = store.load_skills().unwrap();
        assert_eq!(loaded, next);
        assert_eq!(store.load_interactions().unwrap(), vec![interaction]);
    }

    #[test]
    fn test_commit_session_logs_every_interaction() {
        let store = Store::open_in_memory().unwrap();
        let skills = make_skills();
        store.save_skills(&skills).unwrap();

        let interactions = vec![
            Interaction::new("counting", "perm", true, 40.0, Difficulty::Basic),
            Interaction::new("counting", "comb", false, 120.0, Difficulty::Intermediate),
        ];
        let report = tutor_core::replay(&skills, &interactions, &BktParams::default());
        store.commit_session(&report.skills, &interactions, NOW).unwrap();

        assert_eq!(store.load_skills().unwrap(), report.skills);
        assert_eq!(store.load_interactions().unwrap(), interactions);
    }

    #[test]
    fn test_cards_keep_insertion_order() {
        let store = Store::open_in_memory().unwrap();
        for id in ["z", "a", "m"] {
            store
                .insert_card(&Flashcard::new(id, "deck", "q", "a", NOW))
                .unwrap();
        }
        let ids: Vec<String> = store
            .load_cards(None)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_load_cards_by_deck() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_card(&Flashcard::new("a", "counting", "q", "a", NOW))
            .unwrap();
        store
            .insert_card(&Flashcard::new("b", "probability", "q", "a", NOW))
            .unwrap();
        let cards = store.load_cards(Some("probability")).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "b");
    }

    #[test]
    fn test_duplicate_card_id_rejected() {
        let store = Store::open_in_memory().unwrap();
        let card = Flashcard::new("a", "d", "q", "a", NOW);
        store.insert_card(&card).unwrap();
        assert!(matches!(store.insert_card(&card), Err(StoreError::Sqlite(_))));
    }

    #[test]
    fn test_record_review_persists_state_and_log() {
        let store = Store::open_in_memory().unwrap();
        let card = Flashcard::new("a", "d", "q", "a", NOW);
        store.insert_card(&card).unwrap();

        let graded = card.graded(Grade::Good, NOW);
        store.record_review(&graded, Grade::Good, NOW).unwrap();

        assert_eq!(store.get_card("a").unwrap(), Some(graded));
        assert_eq!(store.review_count().unwrap(), 1);
    }

    #[test]
    fn test_record_review_unknown_card() {
        let store = Store::open_in_memory().unwrap();
        let ghost = Flashcard::new("ghost", "d", "q", "a", NOW);
        assert!(matches!(
            store.record_review(&ghost, Grade::Again, NOW),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.review_count().unwrap(), 0);
    }

    #[test]
    fn test_metadata() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_metadata("learner").unwrap(), None);
        store.set_metadata("learner", "ada").unwrap();
        assert_eq!(store.get_metadata("learner").unwrap().as_deref(), Some("ada"));
    }

    #[test]
    fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learner.db");
        {
            let store = Store::open(&path).unwrap();
            store.save_skills(&make_skills()).unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.load_skills().unwrap(), make_skills());
    }
}
