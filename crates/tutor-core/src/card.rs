use serde::{Deserialize, Serialize};

use crate::review::{Grade, ReviewCard, next_state};

/// A flashcard as the application stores it: identity and content around
/// the scheduling state. Content is authored elsewhere; the scheduler only
/// reads `review`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    #[serde(default)]
    pub deck: String,
    pub front: String,
    pub back: String,
    #[serde(flatten)]
    pub review: ReviewCard,
}

impl Flashcard {
    pub fn new(id: &str, deck: &str, front: &str, back: &str, now_ms: i64) -> Self {
        Self {
            id: id.to_string(),
            deck: deck.to_string(),
            front: front.to_string(),
            back: back.to_string(),
            review: ReviewCard::new(now_ms),
        }
    }

    /// The same card with its scheduling state replaced by one review.
    pub fn graded(&self, grade: Grade, now_ms: i64) -> Self {
        Self {
            review: next_state(&self.review, grade, now_ms),
            ..self.clone()
        }
    }
}

impl AsRef<ReviewCard> for Flashcard {
    fn as_ref(&self) -> &ReviewCard {
        &self.review
    }
}
