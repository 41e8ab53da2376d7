//! Progress State Machine
//!
//! Owns the per-letter learning records. Stages move forward only, a stage
//! change may overwrite mastery in the same step, and completing a letter
//! unlocks the next one in teaching order. Completion is the only unlock path.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{LetterCatalog, TracePath};
use crate::config::SchedulerConfig;
use crate::error::ProgressError;
use crate::scoring::can_advance_stage;
use crate::types::{LetterId, LetterProgress, Stage, INITIAL_UNLOCKED_LETTERS};

/// What a stage update changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTransition {
    pub letter_id: LetterId,
    pub from: Stage,
    pub to: Stage,
    pub mastery_score: i32,
    /// Letter unlocked as a consequence of reaching the final stage
    pub unlocked_next: Option<LetterId>,
}

/// Letter id → progress record, the caller-owned state every mutation goes through
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressBook {
    letters: BTreeMap<LetterId, LetterProgress>,
}

impl ProgressBook {
    /// Fresh records for every catalog letter; the first three start unlocked
    pub fn initial(catalog: &LetterCatalog, today: NaiveDate) -> Self {
        Self::initial_with(catalog, &SchedulerConfig::default(), today)
    }

    /// Like [`ProgressBook::initial`], seeding ease from `scheduler`
    pub fn initial_with(catalog: &LetterCatalog, scheduler: &SchedulerConfig, today: NaiveDate) -> Self {
        let letters = catalog
            .iter()
            .map(|l| (l.letter_id.clone(), fresh_record(l, scheduler, today)))
            .collect();
        Self { letters }
    }

    pub fn from_records(records: impl IntoIterator<Item = LetterProgress>) -> Self {
        Self {
            letters: records
                .into_iter()
                .map(|p| (p.letter_id.clone(), p))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn get(&self, letter_id: &str) -> Option<&LetterProgress> {
        self.letters.get(letter_id)
    }

    pub(crate) fn get_mut(&mut self, letter_id: &str) -> Option<&mut LetterProgress> {
        self.letters.get_mut(letter_id)
    }

    pub(crate) fn insert(&mut self, progress: LetterProgress) {
        self.letters.insert(progress.letter_id.clone(), progress);
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&LetterProgress) -> bool) {
        self.letters.retain(|_, p| keep(p));
    }

    pub fn iter(&self) -> impl Iterator<Item = &LetterProgress> {
        self.letters.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut LetterProgress> {
        self.letters.values_mut()
    }

    // ==================== Queries ====================

    pub fn stage(&self, letter_id: &str) -> Option<Stage> {
        self.get(letter_id).map(|p| p.stage)
    }

    pub fn is_unlocked(&self, letter_id: &str) -> bool {
        self.get(letter_id).map(|p| p.unlocked).unwrap_or(false)
    }

    pub fn mastery(&self, letter_id: &str) -> Option<i32> {
        self.get(letter_id).map(|p| p.mastery_score)
    }

    /// First unlocked, unfinished letter in teaching order; otherwise the first locked one
    pub fn next_letter_to_learn<'c>(&self, catalog: &'c LetterCatalog) -> Option<&'c TracePath> {
        catalog
            .iter()
            .find(|l| {
                self.get(&l.letter_id)
                    .map(|p| p.unlocked && p.stage < Stage::Complete)
                    .unwrap_or(false)
            })
            .or_else(|| catalog.iter().find(|l| !self.is_unlocked(&l.letter_id)))
    }

    /// Practised letters due today, weakest first
    pub fn letters_for_review(&self, catalog: &LetterCatalog, today: NaiveDate) -> Vec<&LetterProgress> {
        let mut due: Vec<&LetterProgress> = catalog
            .iter()
            .filter_map(|l| self.get(&l.letter_id))
            .filter(|p| p.unlocked && p.mastery_score > 0 && p.is_due(today))
            .collect();
        due.sort_by_key(|p| p.mastery_score);
        due
    }

    pub fn unlocked_count(&self) -> usize {
        self.iter().filter(|p| p.unlocked).count()
    }

    pub fn completed_count(&self) -> usize {
        self.iter().filter(|p| p.stage.is_complete()).count()
    }

    /// Mean mastery over the whole catalog, rounded; missing letters count as zero
    pub fn overall_progress(&self, catalog: &LetterCatalog) -> u8 {
        if catalog.is_empty() {
            return 0;
        }
        let total: i64 = catalog
            .ids()
            .map(|id| self.mastery(id).unwrap_or(0) as i64)
            .sum();
        crate::types::round_percent(total as f64 / catalog.len() as f64)
    }

    pub fn is_complete(&self, catalog: &LetterCatalog) -> bool {
        !catalog.is_empty()
            && catalog
                .ids()
                .all(|id| self.stage(id) == Some(Stage::Complete))
    }

    // ==================== Mutations ====================

    fn entry(&mut self, letter_id: &str) -> Result<&mut LetterProgress, ProgressError> {
        self.letters
            .get_mut(letter_id)
            .ok_or_else(|| ProgressError::UnknownLetter(letter_id.to_string()))
    }

    /// Counts one interaction. A miss resets the correct streak.
    pub fn record_attempt(
        &mut self,
        letter_id: &str,
        correct: bool,
        trace_score: Option<u8>,
        today: NaiveDate,
    ) -> Result<&LetterProgress, ProgressError> {
        let p = self.entry(letter_id)?;
        p.attempts = p.attempts.saturating_add(1);
        if correct {
            p.correct_attempts = p.correct_attempts.saturating_add(1);
            p.consecutive_correct = p.consecutive_correct.saturating_add(1);
        } else {
            p.consecutive_correct = 0;
        }
        if let Some(score) = trace_score {
            p.best_trace_score = p.best_trace_score.max(score.min(100));
        }
        p.last_practiced = Some(today);
        Ok(&*p)
    }

    /// Overwrites mastery, clamped into range. Returns the stored value.
    pub fn update_mastery(&mut self, letter_id: &str, score: i32) -> Result<i32, ProgressError> {
        let p = self.entry(letter_id)?;
        p.set_mastery(score);
        Ok(p.mastery_score)
    }

    /// Stores the next review date and ease factor. A non-finite ease is ignored.
    pub fn update_review(
        &mut self,
        letter_id: &str,
        next_review: NaiveDate,
        ease_factor: f64,
    ) -> Result<(), ProgressError> {
        let p = self.entry(letter_id)?;
        p.next_review = next_review;
        if ease_factor.is_finite() {
            p.ease_factor = ease_factor;
        }
        Ok(())
    }

    /// Unlocks a letter. Returns whether anything changed.
    pub fn unlock_letter(&mut self, letter_id: &str) -> Result<bool, ProgressError> {
        let p = self.entry(letter_id)?;
        if p.unlocked {
            return Ok(false);
        }
        p.unlocked = true;
        tracing::info!(letter_id = %letter_id, "letter unlocked");
        Ok(true)
    }

    /// Moves a letter to `stage`, optionally overwriting mastery in the same step.
    ///
    /// Refused without changes when the letter is unknown, when the stage would
    /// go backwards, or when a locked letter is asked to reach the trace stage.
    /// Reaching [`Stage::Complete`] unlocks the next letter in teaching order.
    pub fn update_letter_stage(
        &mut self,
        catalog: &LetterCatalog,
        letter_id: &str,
        stage: Stage,
        mastery: Option<i32>,
    ) -> Result<StageTransition, ProgressError> {
        let current = self
            .get(letter_id)
            .ok_or_else(|| ProgressError::UnknownLetter(letter_id.to_string()))?;

        if stage < current.stage {
            return Err(ProgressError::StageRegression {
                letter_id: letter_id.to_string(),
                current: current.stage,
                requested: stage,
            });
        }
        if stage >= Stage::Trace && !current.unlocked {
            return Err(ProgressError::LetterLocked(letter_id.to_string()));
        }

        let from = current.stage;
        let p = self.entry(letter_id)?;
        p.stage = stage;
        if let Some(score) = mastery {
            p.set_mastery(score);
        }
        let mastery_score = p.mastery_score;

        let mut unlocked_next = None;
        if stage.is_complete() {
            if let Some(next) = catalog.next_letter(letter_id) {
                if let Ok(true) = self.unlock_letter(&next.letter_id) {
                    unlocked_next = Some(next.letter_id.clone());
                }
            }
        }

        if from != stage {
            tracing::info!(
                letter_id = %letter_id,
                from = from.number(),
                to = stage.number(),
                mastery = mastery_score,
                "letter stage changed"
            );
        }

        Ok(StageTransition {
            letter_id: letter_id.to_string(),
            from,
            to: stage,
            mastery_score,
            unlocked_next,
        })
    }

    /// Advances one stage when the streak and mastery rules allow it
    pub fn advance_if_eligible(
        &mut self,
        catalog: &LetterCatalog,
        letter_id: &str,
    ) -> Result<Option<StageTransition>, ProgressError> {
        let p = self
            .get(letter_id)
            .ok_or_else(|| ProgressError::UnknownLetter(letter_id.to_string()))?;

        if !can_advance_stage(p.stage, p.mastery_score, p.consecutive_correct) {
            return Ok(None);
        }
        match p.stage.next() {
            Some(next) => self
                .update_letter_stage(catalog, letter_id, next, None)
                .map(Some),
            None => Ok(None),
        }
    }
}

/// Record for a letter the child has never practised
pub(crate) fn fresh_record(letter: &TracePath, scheduler: &SchedulerConfig, today: NaiveDate) -> LetterProgress {
    let unlocked = letter.order <= INITIAL_UNLOCKED_LETTERS;
    LetterProgress::new(letter.letter_id.clone(), unlocked, today)
        .with_ease_factor(scheduler.default_ease_factor)
}
