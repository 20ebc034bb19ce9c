//! Integration tests exercising the full pipeline across modules:
//! seed → attempt → replay → snapshot, and the card lifecycle.

use approx::assert_relative_eq;
use tutor_core::{
    BktParams, Curriculum, Difficulty, Flashcard, Grade, Interaction, MS_PER_DAY, SimulatedLearner,
    SubSkillDef, TopicDef, difficulty_for_mastery, due_cards, export_json, import_json, replay,
    simulate, update, update_with_report,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;

const NOW: i64 = 1_771_632_000_000;

fn rng() -> SmallRng {
    SmallRng::seed_from_u64(42)
}

fn curriculum() -> Curriculum {
    let topic = |id: &str, subs: &[&str]| TopicDef {
        id: id.to_string(),
        name: String::new(),
        sub_skills: subs
            .iter()
            .map(|s| SubSkillDef {
                id: s.to_string(),
                name: String::new(),
            })
            .collect(),
    };
    Curriculum {
        topics: vec![
            topic("counting", &["perm", "comb", "pigeonhole"]),
            topic("probability", &["conditional", "bayes"]),
        ],
    }
}

/// The worked example: fresh node, on-time correct Basic answer.
#[test]
fn worked_example_from_fresh_curriculum() {
    let params = BktParams::default();
    let skills = curriculum().seed(params.p_init).unwrap();

    let interaction = Interaction::new("counting", "perm", true, 45.0, Difficulty::Basic);
    let next = update(&skills, &interaction, &params);

    assert_relative_eq!(next["perm"].mastery_probability, 0.4333333, epsilon = 1e-6);
    assert!(next["counting"].mastery_probability > params.p_init);
    assert!(next["counting"].mastery_probability < next["perm"].mastery_probability);

    // Untouched nodes are identical.
    for id in ["comb", "pigeonhole", "probability", "conditional", "bayes"] {
        assert_eq!(next[id], skills[id], "{id} should not change");
    }
}

/// Slow-but-right gains strictly less than on-time right.
#[test]
fn slow_correct_answer_is_weaker_evidence() {
    let params = BktParams::default();
    let skills = curriculum().seed(params.p_init).unwrap();

    let slow = update(
        &skills,
        &Interaction::new("counting", "perm", true, 200.0, Difficulty::Basic),
        &params,
    );
    let on_time = update(
        &skills,
        &Interaction::new("counting", "perm", true, 45.0, Difficulty::Basic),
        &params,
    );

    let gain_slow = slow["perm"].mastery_probability - params.p_init;
    let gain_on_time = on_time["perm"].mastery_probability - params.p_init;
    assert!(gain_slow > 0.0);
    assert!(gain_slow < gain_on_time);
}

/// Interactions on different topics never bleed into each other.
#[test]
fn topics_are_independent() {
    let params = BktParams::default();
    let skills = curriculum().seed(params.p_init).unwrap();
    let batch: Vec<Interaction> = (0..10)
        .map(|_| Interaction::new("probability", "bayes", true, 90.0, Difficulty::Intermediate))
        .collect();

    let report = replay(&skills, &batch, &params);
    assert_eq!(report.skills["counting"], skills["counting"]);
    assert_eq!(report.skills["bayes"].total_attempts, 10);
    assert_eq!(report.skills["probability"].total_attempts, 10);
    assert_eq!(report.skills["conditional"].total_attempts, 0);
}

/// Mastery climbs through the difficulty ladder with a streak of good answers.
#[test]
fn difficulty_ladder_follows_mastery() {
    let params = BktParams::default();
    let mut skills = curriculum().seed(params.p_init).unwrap();
    let mut seen = Vec::new();

    for _ in 0..12 {
        let difficulty = difficulty_for_mastery(skills["comb"].mastery_probability);
        if seen.last() != Some(&difficulty) {
            seen.push(difficulty);
        }
        let time = difficulty.expected_seconds();
        skills = update(
            &skills,
            &Interaction::new("counting", "comb", true, time, difficulty),
            &params,
        );
    }

    assert_eq!(
        seen,
        vec![
            Difficulty::Basic,
            Difficulty::Intermediate,
            Difficulty::Advanced,
            Difficulty::Olympiad
        ]
    );
}

/// The report's effective params show the parent's dilution.
#[test]
fn parent_effective_params_are_noisier() {
    let params = BktParams::default();
    let skills = curriculum().seed(params.p_init).unwrap();
    for (correct, secs) in [(true, 45.0), (false, 45.0), (true, 200.0), (false, 3.0)] {
        let (_, report) = update_with_report(
            &skills,
            &Interaction::new("counting", "perm", correct, secs, Difficulty::Basic),
            &params,
        );
        let leaf = report.sub_skill.unwrap().effective;
        let topic = report.topic.unwrap().effective;
        assert!(topic.p_slip > leaf.p_slip || topic.p_slip == 0.5);
        assert!(topic.p_guess > leaf.p_guess || topic.p_guess == 0.5);
    }
}

/// Simulated session → snapshot → import preserves the learned state.
#[test]
fn simulated_session_snapshot_roundtrip() {
    let params = BktParams::default();
    let skills = curriculum().seed(params.p_init).unwrap();
    let mut learner = SimulatedLearner::new(params, rng());
    let (interactions, report) = simulate(&skills, &params, &mut learner, 40);
    assert_eq!(interactions.len(), 40);

    let attempts: u32 = report
        .skills
        .values()
        .filter(|n| !n.is_parent)
        .map(|n| n.total_attempts)
        .sum();
    assert_eq!(attempts, 40);

    let cards = vec![Flashcard::new("c1", "counting", "C(5,2)?", "10", NOW)];
    let json = export_json("sim", &report.skills, &cards).unwrap();
    let snapshot = import_json(&json).unwrap();
    assert_eq!(snapshot.skill_map(), report.skills);
    assert_eq!(snapshot.cards, cards);
}

/// A card reviewed over several days follows the SM-2 ladder and the due set
/// tracks it.
#[test]
fn card_lifecycle() {
    let mut deck = vec![
        Flashcard::new("a", "counting", "4!", "24", NOW),
        Flashcard::new("b", "counting", "C(4,2)", "6", NOW),
    ];
    assert_eq!(due_cards(&deck, NOW).len(), 2);

    deck[0] = deck[0].graded(Grade::Good, NOW);
    deck[1] = deck[1].graded(Grade::Again, NOW);
    assert!(due_cards(&deck, NOW).is_empty());

    let tomorrow = NOW + MS_PER_DAY;
    let due: Vec<&str> = due_cards(&deck, tomorrow).iter().map(|c| c.id.as_str()).collect();
    assert_eq!(due, vec!["a", "b"]);

    deck[0] = deck[0].graded(Grade::Good, tomorrow);
    assert_eq!(deck[0].review.interval, 6);
    deck[0] = deck[0].graded(Grade::Good, tomorrow + 6 * MS_PER_DAY);
    assert_eq!(deck[0].review.interval, 15);

    // Idempotent: same clock, same answer.
    let later = tomorrow + 7 * MS_PER_DAY;
    assert_eq!(due_cards(&deck, later), due_cards(&deck, later));
}
