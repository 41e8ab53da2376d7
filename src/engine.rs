//! Mastery engine facade
//!
//! Wires the components together for one interaction at a time. Target shapes
//! are sampled once at construction; all learner state stays with the caller.

use std::collections::HashMap;

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::adaptive::{analyze_recent, PerformanceAnalysis, SessionPlan, SessionPlanner};
use crate::catalog::LetterCatalog;
use crate::config::EngineConfig;
use crate::corridor::{CorridorValidator, TraceVerdict};
use crate::error::{EngineResult, ProgressError};
use crate::progress::{ProgressBook, StageTransition};
use crate::scheduler::{AttemptOutcome, SpacedRepetitionScheduler};
use crate::types::{AttemptResult, LetterId, LetterProgress, Point};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceOutcome {
    pub verdict: TraceVerdict,
    /// `None` when the letter shape could not be sampled and nothing was recorded
    pub attempt: Option<AttemptOutcome>,
}

pub struct MasteryEngine {
    config: EngineConfig,
    catalog: LetterCatalog,
    targets: HashMap<LetterId, Vec<Point>>,
    validator: CorridorValidator,
    scheduler: SpacedRepetitionScheduler,
    planner: SessionPlanner,
}

impl MasteryEngine {
    pub fn new(config: EngineConfig, catalog: LetterCatalog) -> EngineResult<Self> {
        config.validate()?;
        let targets = catalog.sample_all(&config.trace);
        for (id, points) in &targets {
            if points.is_empty() {
                tracing::warn!(letter_id = %id, "letter shape unavailable, traces will fail");
            }
        }
        tracing::info!(letters = catalog.len(), "mastery engine ready");

        Ok(Self {
            validator: CorridorValidator::from_config(&config.trace),
            scheduler: SpacedRepetitionScheduler::new(config.scheduler.clone()),
            planner: SessionPlanner::from_config(&config.session),
            targets,
            catalog,
            config,
        })
    }

    /// Built-in alphabet with default configuration
    pub fn with_defaults() -> EngineResult<Self> {
        Self::new(EngineConfig::default(), LetterCatalog::builtin())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &LetterCatalog {
        &self.catalog
    }

    pub fn target_points(&self, letter_id: &str) -> Option<&[Point]> {
        self.targets.get(letter_id).map(Vec::as_slice)
    }

    /// Validates drawn strokes without touching any progress
    pub fn validate_trace(&self, letter_id: &str, drawn: &[Vec<Point>]) -> Option<TraceVerdict> {
        let target = self.target_points(letter_id)?;
        Some(self.validator.validate(drawn, target))
    }

    /// Validates a trace and records it as an attempt scored by the verdict.
    ///
    /// Returns `None` for a letter missing from the catalog or the book.
    pub fn check_trace(
        &self,
        book: &mut ProgressBook,
        letter_id: &str,
        drawn: &[Vec<Point>],
        response_time_ms: u64,
        today: NaiveDate,
    ) -> Option<TraceOutcome> {
        let target = self.target_points(letter_id)?;
        book.get(letter_id)?;

        let verdict = self.validator.validate(drawn, target);
        if target.is_empty() {
            return Some(TraceOutcome {
                verdict,
                attempt: None,
            });
        }

        let result = AttemptResult::new(verdict.passed, response_time_ms).with_score(verdict.score);
        let attempt = self.scheduler.process_attempt(book, letter_id, &result, today);
        Some(TraceOutcome { verdict, attempt })
    }

    /// Records a non-trace interaction such as a recognition answer
    pub fn answer(
        &self,
        book: &mut ProgressBook,
        letter_id: &str,
        correct: bool,
        response_time_ms: u64,
        today: NaiveDate,
    ) -> Option<AttemptOutcome> {
        self.scheduler.process_attempt(
            book,
            letter_id,
            &AttemptResult::new(correct, response_time_ms),
            today,
        )
    }

    pub fn advance_if_eligible(
        &self,
        book: &mut ProgressBook,
        letter_id: &str,
    ) -> Result<Option<StageTransition>, ProgressError> {
        book.advance_if_eligible(&self.catalog, letter_id)
    }

    pub fn review_queue<'a>(&self, book: &'a ProgressBook, today: NaiveDate) -> Vec<&'a LetterProgress> {
        self.scheduler.review_queue(book, today)
    }

    pub fn plan_session<R: Rng + ?Sized>(
        &self,
        book: &ProgressBook,
        today: NaiveDate,
        rng: &mut R,
    ) -> SessionPlan {
        self.planner.build_session(&self.catalog, book, today, rng)
    }

    pub fn analyze(&self, recent: &[AttemptResult]) -> PerformanceAnalysis {
        analyze_recent(recent, self.config.session.analysis_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BoundingBox, StrokeDirection, TracePath, TraceStroke};
    use crate::types::{Difficulty, Stage};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }

    #[test]
    fn test_retracing_target_passes_and_schedules() {
        let engine = MasteryEngine::with_defaults().unwrap();
        let mut book = ProgressBook::initial(engine.catalog(), today());
        let drawn = vec![engine.target_points("E").unwrap().to_vec()];

        let out = engine.check_trace(&mut book, "E", &drawn, 4000, today()).unwrap();
        assert!(out.verdict.passed);
        assert_eq!(out.verdict.stars, 3);
        let attempt = out.attempt.unwrap();
        assert_eq!(attempt.quality.value(), 5);
        assert_eq!(book.get("E").unwrap().best_trace_score, 100);
    }

    #[test]
    fn test_unknown_letter() {
        let engine = MasteryEngine::with_defaults().unwrap();
        let mut book = ProgressBook::initial(engine.catalog(), today());
        assert!(engine.check_trace(&mut book, "W", &[], 0, today()).is_none());
        assert!(engine.answer(&mut book, "W", true, 0, today()).is_none());
        assert!(engine.validate_trace("W", &[]).is_none());
    }

    #[test]
    fn test_broken_shape_never_records() {
        let catalog = LetterCatalog::new(vec![TracePath {
            letter_id: "X".into(),
            order: 1,
            group: 1,
            strokes: vec![TraceStroke {
                d: "M 10".into(),
                direction: StrokeDirection::Diagonal,
                start_point: Point::new(10.0, 10.0),
            }],
            bounding_box: BoundingBox {
                width: 100.0,
                height: 100.0,
            },
            difficulty: Difficulty::Easy,
        }])
        .unwrap();
        let engine = MasteryEngine::new(EngineConfig::default(), catalog).unwrap();
        let mut book = ProgressBook::initial(engine.catalog(), today());
        let drawn = vec![vec![Point::new(10.0, 10.0), Point::new(20.0, 20.0), Point::new(30.0, 30.0)]];

        let out = engine.check_trace(&mut book, "X", &drawn, 1000, today()).unwrap();
        assert!(!out.verdict.passed);
        assert!(out.attempt.is_none());
        assert_eq!(book.get("X").unwrap().attempts, 0);
    }

    #[test]
    fn test_answers_drive_stage_advance() {
        let engine = MasteryEngine::with_defaults().unwrap();
        let mut book = ProgressBook::initial(engine.catalog(), today());
        engine.answer(&mut book, "A", true, 1000, today()).unwrap();
        let t = engine.advance_if_eligible(&mut book, "A").unwrap().unwrap();
        assert_eq!(t.to, Stage::Recognize);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.session.known_ratio = 1.5;
        assert!(MasteryEngine::new(config, LetterCatalog::builtin()).is_err());
    }
}
