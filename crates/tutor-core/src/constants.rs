/// Lower bound for any mastery probability after an update.
pub const MASTERY_FLOOR: f64 = 0.01;

/// Upper bound for any mastery probability after an update.
pub const MASTERY_CEIL: f64 = 0.99;

/// Slip and guess are capped here after the time adjustment.
/// Above 0.5 an answer would carry inverted evidence.
pub const SLIP_GUESS_CAP: f64 = 0.5;

/// Added to slip and guess when sub-skill evidence is propagated to the
/// parent topic, before the time adjustment.
pub const PARENT_DILUTION: f64 = 0.1;

/// A correct answer slower than this multiple of the expected time looks
/// like a lucky guess.
pub const SLOW_FACTOR: f64 = 2.5;

/// Answers faster than this fraction of the expected time are suspicious,
/// right or wrong.
pub const FAST_FACTOR: f64 = 0.2;

/// Slow-but-correct: guess bump.
pub const SLOW_CORRECT_GUESS_DELTA: f64 = 0.15;

/// Slow-but-correct: slip bump.
pub const SLOW_CORRECT_SLIP_DELTA: f64 = 0.05;

/// Fast-and-correct: guess bump.
pub const FAST_CORRECT_GUESS_DELTA: f64 = 0.30;

/// Fast-and-wrong: slip bump (careless rather than ignorant).
pub const FAST_WRONG_SLIP_DELTA: f64 = 0.30;

/// SM-2 starting ease factor for a fresh card.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// SM-2 ease floor. No ceiling applies.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Milliseconds in one scheduling day.
pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
