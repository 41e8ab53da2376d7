//! Replays recorded attempts against a stored progress snapshot.
//!
//! Usage: `letter-mastery <store.json> <attempts.json> [YYYY-MM-DD]`
//!
//! The store file is created when missing. Attempts are a JSON array of
//! `{"kind": "trace", "letterId", "responseTimeMs", "strokes": [[{x, y}]]}` or
//! `{"kind": "answer", "letterId", "responseTimeMs", "correct"}`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Datelike, NaiveDate, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use letter_mastery::logging::init_tracing;
use letter_mastery::{EngineConfig, EngineError, EngineResult, LetterCatalog, MasteryEngine, Point, ProgressStore};

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ReplayAttempt {
    #[serde(rename_all = "camelCase")]
    Trace {
        letter_id: String,
        response_time_ms: u64,
        strokes: Vec<Vec<Point>>,
    },
    #[serde(rename_all = "camelCase")]
    Answer {
        letter_id: String,
        response_time_ms: u64,
        correct: bool,
    },
}

struct Args {
    store: PathBuf,
    attempts: PathBuf,
    today: NaiveDate,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let usage = "usage: letter-mastery <store.json> <attempts.json> [YYYY-MM-DD]";
    let store = args.next().ok_or(usage)?;
    let attempts = args.next().ok_or(usage)?;
    let today = match args.next() {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|err| format!("invalid date '{raw}': {err}"))?,
        None => Utc::now().date_naive(),
    };
    Ok(Args {
        store: store.into(),
        attempts: attempts.into(),
        today,
    })
}

fn load_store(path: &Path, engine: &MasteryEngine, today: NaiveDate) -> EngineResult<ProgressStore> {
    if !path.exists() {
        let mut store = ProgressStore::default();
        store.initialize_letter_progress(engine.catalog(), &engine.config().scheduler, today);
        return Ok(store);
    }
    let json = std::fs::read_to_string(path)?;
    let (store, report) =
        ProgressStore::from_json(&json, engine.catalog(), &engine.config().scheduler, today)?;
    if !report.is_clean() {
        tracing::info!(?report, "store repaired on load");
    }
    Ok(store)
}

fn run(args: &Args) -> EngineResult<()> {
    let config = EngineConfig::from_env();
    let engine = MasteryEngine::new(config, LetterCatalog::builtin())?;
    let mut store = load_store(&args.store, &engine, args.today)?;
    if store.letter_progress.is_empty() {
        store.initialize_letter_progress(engine.catalog(), &engine.config().scheduler, args.today);
    }

    let attempts: Vec<ReplayAttempt> =
        serde_json::from_str(&std::fs::read_to_string(&args.attempts)?)?;
    let book = &mut store.letter_progress;

    for attempt in &attempts {
        match attempt {
            ReplayAttempt::Trace {
                letter_id,
                response_time_ms,
                strokes,
            } => match engine.check_trace(book, letter_id, strokes, *response_time_ms, args.today) {
                Some(outcome) => tracing::info!(
                    letter_id = %letter_id,
                    score = outcome.verdict.score,
                    passed = outcome.verdict.passed,
                    stars = outcome.verdict.stars,
                    "trace checked"
                ),
                None => tracing::warn!(letter_id = %letter_id, "unknown letter, trace skipped"),
            },
            ReplayAttempt::Answer {
                letter_id,
                response_time_ms,
                correct,
            } => match engine.answer(book, letter_id, *correct, *response_time_ms, args.today) {
                Some(outcome) => tracing::info!(
                    letter_id = %letter_id,
                    quality = outcome.quality.value(),
                    next_review = %outcome.next_review,
                    mastery = outcome.mastery_score,
                    "answer recorded"
                ),
                None => tracing::warn!(letter_id = %letter_id, "unknown letter, answer skipped"),
            },
        }

        let letter_id = match attempt {
            ReplayAttempt::Trace { letter_id, .. } | ReplayAttempt::Answer { letter_id, .. } => letter_id,
        };
        match engine.advance_if_eligible(book, letter_id) {
            Ok(Some(transition)) => tracing::info!(
                letter_id = %letter_id,
                stage = transition.to.number(),
                unlocked_next = ?transition.unlocked_next,
                "stage advanced"
            ),
            Ok(None) => {}
            Err(err) => tracing::debug!(error = %err, "stage unchanged"),
        }
    }

    // same day, same plan
    let mut rng = ChaCha8Rng::seed_from_u64(args.today.num_days_from_ce() as u64);
    let plan = engine.plan_session(&store.letter_progress, args.today, &mut rng);
    tracing::info!(
        known = ?plan.known,
        new_or_review = ?plan.new_or_review,
        overall = store.letter_progress.overall_progress(engine.catalog()),
        "next session"
    );

    std::fs::write(&args.store, store.to_json()?)?;
    Ok(())
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let level = std::env::var("LETTER_MASTERY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let _guard = init_tracing(&level);

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ EngineError::Config(_)) => {
            tracing::error!(error = %err, "configuration rejected");
            ExitCode::from(2)
        }
        Err(err) => {
            tracing::error!(error = %err, "replay failed");
            ExitCode::FAILURE
        }
    }
}
