use std::fs;
use std::path::Path;

use tutor_core::{Snapshot, export_json, import_json};

use crate::error::{Result, StoreError};
use crate::store::{Store, insert_card_on, upsert_skills_on};

impl Store {
    /// Replace this store's state with a JSON snapshot file.
    pub fn import_json_file(&self, path: &Path) -> Result<Snapshot> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json)
    }

    pub fn import_json_str(&self, json: &str) -> Result<Snapshot> {
        let snapshot = import_json(json).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        self.save_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    /// Replace all learner state with `snapshot` in one transaction.
    ///
    /// The interaction and review logs are cleared too: they refer to the
    /// skills and cards being replaced.
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM skills; DELETE FROM cards; DELETE FROM interactions; DELETE FROM review_log;",
        )?;
        upsert_skills_on(&tx, &snapshot.skills)?;
        for card in &snapshot.cards {
            insert_card_on(&tx, card)?;
        }
        tx.commit()?;
        tracing::info!(
            skills = snapshot.skills.len(),
            cards = snapshot.cards.len(),
            "snapshot imported"
        );
        Ok(())
    }

    pub fn export_json_file(&self, learner: &str, path: &Path) -> Result<()> {
        let json = self.export_json_string(learner)?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn export_json_string(&self, learner: &str) -> Result<String> {
        let skills = self.load_skills()?;
        let cards = self.load_cards(None)?;
        export_json(learner, &skills, &cards)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }
}
