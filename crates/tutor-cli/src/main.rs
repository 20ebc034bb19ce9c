use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tutor_core::{
    Difficulty, Grade, Interaction, SimulatedLearner, SkillMap, SkillNode, TraceStep,
    difficulty_for_mastery, now_unix_millis, preview_intervals, simulate,
    unix_millis_to_iso8601,
};
use tutor_store::{DEFAULT_LEARNER, LearnerStore, load_curriculum};

#[derive(Parser)]
#[command(name = "tutor", about = "Knowledge tracing and spaced repetition for an adaptive tutor")]
struct Cli {
    /// Learner whose state to use
    #[arg(long, global = true, default_value = DEFAULT_LEARNER)]
    learner: String,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the skill tree from a curriculum TOML file
    Init {
        curriculum: PathBuf,

        /// Replace existing skills
        #[arg(long)]
        force: bool,
    },

    /// Record one attempt and update mastery
    #[command(group(ArgGroup::new("outcome").required(true).args(["correct", "wrong"])))]
    Attempt {
        /// Parent topic id
        #[arg(long)]
        topic: String,

        /// Sub-skill id
        #[arg(long)]
        skill: String,

        #[arg(long)]
        correct: bool,

        #[arg(long)]
        wrong: bool,

        /// Seconds spent on the problem
        #[arg(long, allow_negative_numbers = true)]
        time: f64,

        /// basic, intermediate, advanced or olympiad
        #[arg(long, default_value = "basic")]
        difficulty: Difficulty,
    },

    /// List skills with their mastery estimates
    Skills,

    /// Manage flashcards
    Card {
        #[command(subcommand)]
        action: CardCommand,
    },

    /// Grade a card: again, hard, good, easy (or 0, 3, 4, 5)
    Review { card_id: String, grade: Grade },

    /// List cards due now
    Due {
        #[arg(long)]
        deck: Option<String>,
    },

    /// Run a simulated learner against the current skills
    Simulate {
        #[arg(long, default_value_t = 50)]
        steps: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Persist the simulated session
        #[arg(long)]
        save: bool,
    },

    /// Show learner statistics
    Stats,

    /// Export state to a JSON file
    Export { path: PathBuf },

    /// Import state from a JSON file
    Import { path: PathBuf },
}

#[derive(Subcommand)]
enum CardCommand {
    /// Create a card, due immediately
    Add {
        #[arg(long, default_value = "")]
        deck: String,
        front: String,
        back: String,
    },
}

fn open_store(cli: &Cli) -> Result<LearnerStore> {
    let base_dir = std::env::var("TUTOR_DATA_DIR").ok().map(PathBuf::from);
    LearnerStore::open(Some(&cli.learner), base_dir.as_deref())
        .context("failed to open learner store")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Init { curriculum, force } => cmd_init(&cli, curriculum, *force),
        Commands::Attempt {
            topic,
            skill,
            correct,
            wrong,
            time,
            difficulty,
        } => cmd_attempt(&cli, topic, skill, *correct && !*wrong, *time, *difficulty),
        Commands::Skills => cmd_skills(&cli),
        Commands::Card {
            action: CardCommand::Add { deck, front, back },
        } => cmd_card_add(&cli, deck, front, back),
        Commands::Review { card_id, grade } => cmd_review(&cli, card_id, *grade),
        Commands::Due { deck } => cmd_due(&cli, deck.as_deref()),
        Commands::Simulate { steps, seed, save } => cmd_simulate(&cli, *steps, *seed, *save),
        Commands::Stats => cmd_stats(&cli),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
    }
}

fn cmd_init(cli: &Cli, path: &Path, force: bool) -> Result<()> {
    let store = open_store(cli)?;
    let curriculum = load_curriculum(path)
        .with_context(|| format!("failed to load curriculum {}", path.display()))?;
    let skills = store
        .seed(&curriculum, force)
        .context("failed to seed skills (use --force to replace)")?;

    let topics = skills.values().filter(|n| n.is_parent).count();
    println!(
        "seeded {} skills ({} topics) for learner '{}'",
        skills.len(),
        topics,
        store.learner_id()
    );
    Ok(())
}

fn cmd_attempt(
    cli: &Cli,
    topic: &str,
    skill: &str,
    correct: bool,
    time: f64,
    difficulty: Difficulty,
) -> Result<()> {
    let store = open_store(cli)?;
    let interaction = Interaction::new(topic, skill, correct, time, difficulty);
    let report = store
        .record_interaction(&interaction, now_unix_millis())
        .context("failed to record attempt")?;

    if report.sub_skill.is_none() && report.topic.is_none() {
        println!("no matching skills for {topic}/{skill} (attempt logged)");
        return Ok(());
    }
    for step in [&report.sub_skill, &report.topic].into_iter().flatten() {
        print_step(step);
    }
    Ok(())
}

fn print_step(step: &TraceStep) {
    println!(
        "{:<16} {:.3} -> {:.3} ({:+.3})  slip={:.2} guess={:.2}",
        step.node_id,
        step.before,
        step.after,
        step.delta(),
        step.effective.p_slip,
        step.effective.p_guess,
    );
}

fn cmd_skills(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let skills = store.load_skills().context("failed to load skills")?;
    if skills.is_empty() {
        println!("(no skills; run `tutor init <curriculum.toml>`)");
        return Ok(());
    }

    println!(
        "{:<20} {:>7} {:>8} {:>6} {:>8}  next",
        "skill", "mastery", "attempts", "streak", "avg_secs"
    );
    for (depth, node) in skill_rows(&skills) {
        let indent = "  ".repeat(depth);
        println!(
            "{:<20} {:>7.3} {:>8} {:>6} {:>8.1}  {}",
            format!("{indent}{}", node.id),
            node.mastery_probability,
            node.total_attempts,
            node.correct_streak,
            node.average_response_time,
            difficulty_for_mastery(node.mastery_probability),
        );
    }

    let orphans = store.orphaned_sub_skills()?;
    if !orphans.is_empty() {
        tracing::warn!("sub-skills without a parent topic: {}", orphans.join(", "));
    }
    Ok(())
}

/// Topics sorted by id, each followed by its sub-skills in curriculum order,
/// then anything not reachable that way.
fn skill_rows(skills: &SkillMap) -> Vec<(usize, &SkillNode)> {
    let mut topics: Vec<&SkillNode> = skills.values().filter(|n| n.is_parent).collect();
    topics.sort_by(|a, b| a.id.cmp(&b.id));

    let mut rows = Vec::with_capacity(skills.len());
    for topic in topics {
        rows.push((0, topic));
        for id in &topic.sub_skill_ids {
            if let Some(sub) = skills.get(id) {
                rows.push((1, sub));
            }
        }
    }

    let mut rest: Vec<&SkillNode> = skills
        .values()
        .filter(|n| !rows.iter().any(|(_, seen)| seen.id == n.id))
        .collect();
    rest.sort_by(|a, b| a.id.cmp(&b.id));
    rows.extend(rest.into_iter().map(|n| (0, n)));
    rows
}

fn cmd_card_add(cli: &Cli, deck: &str, front: &str, back: &str) -> Result<()> {
    let store = open_store(cli)?;
    let card = store
        .add_card(deck, front, back, now_unix_millis())
        .context("failed to add card")?;
    println!("added card {}", card.id);
    Ok(())
}

fn cmd_review(cli: &Cli, card_id: &str, grade: Grade) -> Result<()> {
    let store = open_store(cli)?;
    let now = now_unix_millis();
    let card = store
        .review_card(card_id, grade, now)
        .with_context(|| format!("failed to review card {card_id}"))?;

    println!(
        "{}: {} -> interval {} day(s), ease {:.2}, due {}",
        card.id,
        grade,
        card.review.interval,
        card.review.ease_factor,
        unix_millis_to_iso8601(card.review.next_review_date),
    );
    if cli.verbose {
        let preview: Vec<String> = preview_intervals(&card.review)
            .iter()
            .map(|(g, days)| format!("{g}={days}d"))
            .collect();
        eprintln!("--- next: {} ---", preview.join(", "));
    }
    Ok(())
}

fn cmd_due(cli: &Cli, deck: Option<&str>) -> Result<()> {
    let store = open_store(cli)?;
    let due = store
        .due_cards(deck, now_unix_millis())
        .context("failed to load cards")?;

    if due.is_empty() {
        println!("(no cards due)");
    }
    for card in &due {
        println!("{}  [{}]  {}", card.id, card.deck, card.front);
    }
    Ok(())
}

fn cmd_simulate(cli: &Cli, steps: usize, seed: u64, save: bool) -> Result<()> {
    let store = open_store(cli)?;
    let skills = store.load_skills().context("failed to load skills")?;
    if skills.is_empty() {
        bail!("no skills to simulate against; run `tutor init` first");
    }

    let params = *store.params();
    let mut learner = SimulatedLearner::new(params, SmallRng::seed_from_u64(seed));
    let (interactions, report) = simulate(&skills, &params, &mut learner, steps);

    println!(
        "simulated {} attempts, accuracy {:.1}%",
        report.total,
        report.accuracy() * 100.0
    );
    for (id, delta) in &report.deltas {
        let after = report.skills[id].mastery_probability;
        println!("{id:<16} {after:.3} ({delta:+.3})");
    }

    if save {
        store
            .commit_session(&report.skills, &interactions, now_unix_millis())
            .context("failed to save simulated session")?;
        println!("saved");
    }
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let inner = store.store();
    let due = store
        .due_cards(None, now_unix_millis())
        .context("failed to load cards")?;

    println!("learner:      {}", store.learner_id());
    println!("skills:       {}", inner.skill_count()?);
    println!("cards:        {}", inner.card_count()?);
    println!("due:          {}", due.len());
    println!("interactions: {}", inner.interaction_count()?);
    println!("reviews:      {}", inner.review_count()?);
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    store
        .export_json_file(path)
        .with_context(|| format!("failed to export to {}", path.display()))?;
    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    let snapshot = store
        .import_json_file(path)
        .context("failed to import JSON")?;
    println!(
        "imported from {}. skills={}, cards={}",
        path.display(),
        snapshot.skills.len(),
        snapshot.cards.len()
    );
    Ok(())
}
