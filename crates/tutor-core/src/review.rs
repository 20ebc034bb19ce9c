//! SM-2 review scheduling.
//!
//! Grades map four buttons onto the SM-2 quality scale: Again=0, Hard=3,
//! Good=4, Easy=5. Qualities 1 and 2 are never produced; conversion from a
//! raw number rejects them.
//!
//! The clock is always an argument (`now_ms`, Unix milliseconds) so every
//! function here is deterministic. Callers pass `time::now_unix_millis()`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{INITIAL_EASE_FACTOR, MIN_EASE_FACTOR, MS_PER_DAY};

/// Recall quality reported after showing a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    /// Position on the 0-5 SM-2 quality scale.
    pub fn quality(self) -> u8 {
        match self {
            Grade::Again => 0,
            Grade::Hard => 3,
            Grade::Good => 4,
            Grade::Easy => 5,
        }
    }

    pub fn is_recalled(self) -> bool {
        self.quality() >= 3
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Again => "again",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grade value outside {0, 3, 4, 5} or an unknown grade name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeError(pub String);

impl fmt::Display for GradeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid grade '{}' (expected again/0, hard/3, good/4 or easy/5)",
            self.0
        )
    }
}

impl std::error::Error for GradeError {}

impl TryFrom<u8> for Grade {
    type Error = GradeError;

    fn try_from(q: u8) -> Result<Self, Self::Error> {
        match q {
            0 => Ok(Grade::Again),
            3 => Ok(Grade::Hard),
            4 => Ok(Grade::Good),
            5 => Ok(Grade::Easy),
            _ => Err(GradeError(q.to_string())),
        }
    }
}

impl FromStr for Grade {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "again" => Ok(Grade::Again),
            "hard" => Ok(Grade::Hard),
            "good" => Ok(Grade::Good),
            "easy" => Ok(Grade::Easy),
            other => other
                .parse::<u8>()
                .map_err(|_| GradeError(trimmed.to_string()))
                .and_then(Grade::try_from),
        }
    }
}

/// Spaced-repetition state for one flashcard.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    /// Days until the next review. 0 before the first review.
    pub interval: u32,
    /// Consecutive successful reviews.
    pub repetition: u32,
    pub ease_factor: f64,
    /// Unix milliseconds.
    pub next_review_date: i64,
}

impl ReviewCard {
    /// A fresh card, due immediately.
    pub fn new(now_ms: i64) -> Self {
        Self {
            interval: 0,
            repetition: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            next_review_date: now_ms,
        }
    }

    pub fn is_due(&self, now_ms: i64) -> bool {
        now_ms >= self.next_review_date
    }
}

impl AsRef<ReviewCard> for ReviewCard {
    fn as_ref(&self) -> &ReviewCard {
        self
    }
}

/// SM-2 ease update for quality `q`, floored at 1.3.
pub fn next_ease(ease_factor: f64, grade: Grade) -> f64 {
    let miss = 5.0 - grade.quality() as f64;
    let ease = ease_factor + (0.1 - miss * (0.08 + miss * 0.02));
    ease.max(MIN_EASE_FACTOR)
}

/// Advance a card by one review.
///
/// A recalled grade steps the interval 1 → 6 → round(interval × ease) using
/// the ease factor from before this review. `Again` resets the repetition
/// count and brings the card back tomorrow. The due date is measured from
/// `now_ms`, not from the previous due date.
pub fn next_state(card: &ReviewCard, grade: Grade, now_ms: i64) -> ReviewCard {
    let (interval, repetition) = if grade.is_recalled() {
        let interval = match card.repetition {
            0 => 1,
            1 => 6,
            _ => scale_interval(card.interval, card.ease_factor),
        };
        (interval, card.repetition.saturating_add(1))
    } else {
        (1, 0)
    };

    let next = ReviewCard {
        interval,
        repetition,
        ease_factor: next_ease(card.ease_factor, grade),
        next_review_date: now_ms.saturating_add(i64::from(interval).saturating_mul(MS_PER_DAY)),
    };

    tracing::debug!(
        grade = grade.as_str(),
        interval = next.interval,
        repetition = next.repetition,
        ease = next.ease_factor,
        "card scheduled"
    );
    next
}

fn scale_interval(interval: u32, ease_factor: f64) -> u32 {
    let scaled = (interval as f64 * ease_factor).round();
    if scaled >= u32::MAX as f64 {
        u32::MAX
    } else {
        scaled.max(1.0) as u32
    }
}

/// Interval in days each grade would produce for `card`, in button order.
pub fn preview_intervals(card: &ReviewCard) -> [(Grade, u32); 4] {
    Grade::ALL.map(|g| (g, next_state(card, g, 0).interval))
}

/// Cards whose review date has arrived, in their original order.
pub fn due_cards<T: AsRef<ReviewCard>>(cards: &[T], now_ms: i64) -> Vec<&T> {
    cards
        .iter()
        .filter(|c| c.as_ref().is_due(now_ms))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const NOW: i64 = 1_771_632_000_000;

    #[test]
    fn test_fresh_card_is_due_now() {
        let card = ReviewCard::new(NOW);
        assert_eq!(card.interval, 0);
        assert_eq!(card.repetition, 0);
        assert_eq!(card.ease_factor, 2.5);
        assert!(card.is_due(NOW));
        assert!(!card.is_due(NOW - 1));
    }

    #[test]
    fn test_first_good_review() {
        let next = next_state(&ReviewCard::new(NOW), Grade::Good, NOW);
        assert_eq!(next.interval, 1);
        assert_eq!(next.repetition, 1);
        assert_relative_eq!(next.ease_factor, 2.5, epsilon = 1e-12);
        assert_eq!(next.next_review_date, NOW + MS_PER_DAY);
    }

    #[test]
    fn test_three_goods_progression() {
        let c1 = next_state(&ReviewCard::new(NOW), Grade::Good, NOW);
        let c2 = next_state(&c1, Grade::Good, NOW);
        let c3 = next_state(&c2, Grade::Good, NOW);
        assert_eq!(c1.interval, 1);
        assert_eq!(c2.interval, 6);
        assert_eq!(c3.interval, (6.0 * c2.ease_factor).round() as u32);
        assert_eq!(c3.interval, 15);
        assert_eq!(c3.repetition, 3);
    }

    #[test]
    fn test_again_resets_to_tomorrow() {
        let card = ReviewCard {
            interval: 40,
            repetition: 6,
            ease_factor: 2.8,
            next_review_date: NOW,
        };
        let next = next_state(&card, Grade::Again, NOW);
        assert_eq!(next.interval, 1);
        assert_eq!(next.repetition, 0);
        assert_eq!(next.next_review_date, NOW + MS_PER_DAY);
        assert!(!next.is_due(NOW));
        // 2.8 + 0.1 - 5·(0.08 + 5·0.02) = 2.0
        assert_relative_eq!(next.ease_factor, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ease_deltas_per_grade() {
        assert_relative_eq!(next_ease(2.5, Grade::Easy), 2.6, epsilon = 1e-12);
        assert_relative_eq!(next_ease(2.5, Grade::Good), 2.5, epsilon = 1e-12);
        assert_relative_eq!(next_ease(2.5, Grade::Hard), 2.36, epsilon = 1e-12);
        assert_relative_eq!(next_ease(2.5, Grade::Again), 1.7, epsilon = 1e-12);
    }

    #[test]
    fn test_ease_floor() {
        let mut card = ReviewCard::new(NOW);
        for _ in 0..10 {
            card = next_state(&card, Grade::Again, NOW);
        }
        assert_eq!(card.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_ease_has_no_ceiling() {
        let mut card = ReviewCard::new(NOW);
        for _ in 0..20 {
            card = next_state(&card, Grade::Easy, NOW);
        }
        assert_relative_eq!(card.ease_factor, 4.5, epsilon = 1e-9);
    }

    #[test]
    fn test_due_date_measured_from_now() {
        let card = ReviewCard {
            interval: 6,
            repetition: 2,
            ease_factor: 2.5,
            next_review_date: NOW - 10 * MS_PER_DAY,
        };
        let next = next_state(&card, Grade::Good, NOW);
        assert_eq!(next.interval, 15);
        assert_eq!(next.next_review_date, NOW + 15 * MS_PER_DAY);
    }

    #[test]
    fn test_preview_intervals() {
        let card = ReviewCard {
            interval: 6,
            repetition: 2,
            ease_factor: 2.5,
            next_review_date: NOW,
        };
        let preview = preview_intervals(&card);
        assert_eq!(
            preview,
            [
                (Grade::Again, 1),
                (Grade::Hard, 15),
                (Grade::Good, 15),
                (Grade::Easy, 15)
            ]
        );
    }

    #[test]
    fn test_due_cards_preserves_order() {
        let cards = vec![
            ReviewCard::new(NOW - 5),
            ReviewCard::new(NOW + 5),
            ReviewCard::new(NOW),
            ReviewCard::new(NOW - 1000),
        ];
        let due = due_cards(&cards, NOW);
        assert_eq!(due.len(), 3);
        assert_eq!(due[0].next_review_date, NOW - 5);
        assert_eq!(due[1].next_review_date, NOW);
        assert_eq!(due[2].next_review_date, NOW - 1000);
        assert_eq!(due_cards(&cards, NOW), due);
    }

    #[test]
    fn test_grade_parsing() {
        assert_eq!("again".parse::<Grade>().unwrap(), Grade::Again);
        assert_eq!("GOOD".parse::<Grade>().unwrap(), Grade::Good);
        assert_eq!("5".parse::<Grade>().unwrap(), Grade::Easy);
        assert_eq!("3".parse::<Grade>().unwrap(), Grade::Hard);
        assert!("2".parse::<Grade>().is_err());
        assert!("-1".parse::<Grade>().is_err());
        assert!("meh".parse::<Grade>().is_err());
    }

    #[test]
    fn test_grade_try_from_rejects_unused_qualities() {
        for q in [1u8, 2, 6, 255] {
            assert!(Grade::try_from(q).is_err(), "quality {q} should be rejected");
        }
        for g in Grade::ALL {
            assert_eq!(Grade::try_from(g.quality()).unwrap(), g);
        }
    }
}
