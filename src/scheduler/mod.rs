//! Spaced Repetition Scheduler
//!
//! Simplified SM-2 for young learners:
//! - response quality 0-5 from correctness, response time and trace score
//! - fixed review ramp for the first successful reviews, then growth keyed to
//!   the ease factor
//! - a failure drops the ease factor and brings the letter back the next day

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::progress::ProgressBook;
use crate::types::{AttemptResult, LetterId, LetterProgress};

/// 快于此时间的错误回答视为粗心而非不会
const CARELESS_RESPONSE_MS: u64 = 2000;
const FAST_RESPONSE_MS: u64 = 3000;
const NORMAL_RESPONSE_MS: u64 = 6000;

// ==================== Quality ====================

/// SM-2 回答质量: 0-2 失败，3 勉强正确，4 正确，5 轻松
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(u8);

impl Quality {
    pub const MAX: Quality = Quality(5);

    pub fn new(value: u8) -> Option<Self> {
        (value <= 5).then_some(Quality(value))
    }

    pub fn from_response(correct: bool, response_time_ms: u64, trace_score: Option<u8>) -> Self {
        if !correct {
            return if response_time_ms < CARELESS_RESPONSE_MS {
                Quality(1)
            } else {
                Quality(0)
            };
        }

        if let Some(score) = trace_score {
            return if score >= 90 {
                Quality(5)
            } else if score >= 80 {
                Quality(4)
            } else {
                Quality(3)
            };
        }

        if response_time_ms < FAST_RESPONSE_MS {
            Quality(5)
        } else if response_time_ms < NORMAL_RESPONSE_MS {
            Quality(4)
        } else {
            Quality(3)
        }
    }

    pub fn from_attempt(attempt: &AttemptResult) -> Self {
        Self::from_response(attempt.correct, attempt.response_time_ms, attempt.score)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 >= 3
    }
}

/// 单次作答的掌握度变化
pub fn mastery_delta(correct: bool, quality: Quality) -> i32 {
    match (correct, quality.value() >= 4) {
        (true, true) => 10,
        (true, false) => 5,
        (false, _) => -5,
    }
}

// ==================== Scheduling ====================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    pub quality: Quality,
    pub ease_factor: f64,
    pub consecutive_correct: u32,
    pub interval_days: u32,
    pub next_review: NaiveDate,
}

/// 一次作答处理后的全部变更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    pub letter_id: LetterId,
    pub quality: Quality,
    pub interval_days: u32,
    pub next_review: NaiveDate,
    pub ease_factor: f64,
    pub mastery_delta: i32,
    pub mastery_score: i32,
}

#[derive(Debug, Clone, Default)]
pub struct SpacedRepetitionScheduler {
    config: SchedulerConfig,
}

impl SpacedRepetitionScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// 按回答质量更新难度因子，并钳制到上下限
    pub fn ease_after(&self, ease_factor: f64, quality: Quality) -> f64 {
        let raw = if quality.is_success() {
            let miss = (5 - quality.value()) as f64;
            ease_factor + (0.1 - miss * (0.08 + miss * 0.02))
        } else {
            ease_factor - self.config.failure_ease_penalty
        };
        self.config.clamp_ease(raw)
    }

    /// 第 `consecutive` 次连续正确后的复习间隔 (天)
    pub fn interval_for(&self, consecutive: u32, ease_factor: f64) -> u32 {
        let ramp = &self.config.review_intervals;
        let Some(&last) = ramp.last() else {
            return self.config.failure_interval_days;
        };
        let step = consecutive.max(1) as usize;
        if step <= ramp.len() {
            return ramp[step - 1];
        }
        let extra = i32::try_from(step - ramp.len()).unwrap_or(i32::MAX);
        let days = (last as f64 * ease_factor.powi(extra)).round();
        // 浮点转整数饱和截断；答对后至少隔一天
        (days as u32).max(1)
    }

    /// 根据作答前的记录计算下次复习
    pub fn schedule(&self, progress: &LetterProgress, quality: Quality, today: NaiveDate) -> ReviewUpdate {
        let ease_factor = self.ease_after(progress.ease_factor, quality);
        let (consecutive_correct, interval_days) = if quality.is_success() {
            let consecutive = progress.consecutive_correct.saturating_add(1);
            (consecutive, self.interval_for(consecutive, ease_factor))
        } else {
            (0, self.config.failure_interval_days)
        };

        ReviewUpdate {
            quality,
            ease_factor,
            consecutive_correct,
            interval_days,
            next_review: add_days(today, interval_days),
        }
    }

    /// 记录作答、重新安排复习并调整掌握度
    ///
    /// 字母不在进度中时返回 `None`
    pub fn process_attempt(
        &self,
        book: &mut ProgressBook,
        letter_id: &str,
        attempt: &AttemptResult,
        today: NaiveDate,
    ) -> Option<AttemptOutcome> {
        let before = book.get(letter_id)?.clone();
        let quality = Quality::from_attempt(attempt);
        let update = self.schedule(&before, quality, today);

        book.record_attempt(letter_id, attempt.correct, attempt.score, today)
            .ok()?;
        book.update_review(letter_id, update.next_review, update.ease_factor)
            .ok()?;
        let delta = mastery_delta(attempt.correct, quality);
        let mastery_score = book
            .update_mastery(letter_id, before.mastery_score + delta)
            .ok()?;

        tracing::debug!(
            letter_id = %letter_id,
            quality = quality.value(),
            interval_days = update.interval_days,
            ease_factor = update.ease_factor,
            mastery = mastery_score,
            "attempt scheduled"
        );

        Some(AttemptOutcome {
            letter_id: letter_id.to_string(),
            quality,
            interval_days: update.interval_days,
            next_review: update.next_review,
            ease_factor: update.ease_factor,
            mastery_delta: delta,
            mastery_score,
        })
    }

    /// 到期待复习的字母，困难的优先: 难度因子升序，其次掌握度升序
    pub fn review_queue<'a>(&self, book: &'a ProgressBook, today: NaiveDate) -> Vec<&'a LetterProgress> {
        let mut queue: Vec<&LetterProgress> = book
            .iter()
            .filter(|p| p.unlocked && p.mastery_score > 0 && p.is_due(today))
            .collect();
        queue.sort_by(|a, b| {
            a.ease_factor
                .total_cmp(&b.ease_factor)
                .then(a.mastery_score.cmp(&b.mastery_score))
                .then_with(|| a.letter_id.cmp(&b.letter_id))
        });
        queue
    }
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(days as u64))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LetterCatalog;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    fn q(v: u8) -> Quality {
        Quality::new(v).unwrap()
    }

    #[test]
    fn test_quality_from_wrong_answers() {
        assert_eq!(Quality::from_response(false, 1500, None), q(1));
        assert_eq!(Quality::from_response(false, 2000, None), q(0));
        assert_eq!(Quality::from_response(false, 500, Some(95)), q(1));
    }

    #[test]
    fn test_quality_from_trace_score_ignores_time() {
        assert_eq!(Quality::from_response(true, 60_000, Some(90)), q(5));
        assert_eq!(Quality::from_response(true, 100, Some(85)), q(4));
        assert_eq!(Quality::from_response(true, 100, Some(79)), q(3));
    }

    #[test]
    fn test_quality_from_response_time() {
        assert_eq!(Quality::from_response(true, 2999, None), q(5));
        assert_eq!(Quality::from_response(true, 3000, None), q(4));
        assert_eq!(Quality::from_response(true, 5999, None), q(4));
        assert_eq!(Quality::from_response(true, 6000, None), q(3));
    }

    #[test]
    fn test_quality_bounds() {
        assert!(Quality::new(6).is_none());
        assert!(q(3).is_success());
        assert!(!q(2).is_success());
    }

    #[test]
    fn test_ease_updates() {
        let s = SpacedRepetitionScheduler::default();
        assert!((s.ease_after(2.0, q(5)) - 2.1).abs() < 1e-12);
        assert!((s.ease_after(2.0, q(4)) - 2.0).abs() < 1e-12);
        assert!((s.ease_after(2.0, q(3)) - 1.86).abs() < 1e-12);
        assert!((s.ease_after(2.0, q(0)) - 1.8).abs() < 1e-12);
        assert_eq!(s.ease_after(2.45, q(5)), 2.5);
        assert_eq!(s.ease_after(1.35, q(1)), 1.3);
    }

    #[test]
    fn test_interval_ramp_then_growth() {
        let s = SpacedRepetitionScheduler::default();
        assert_eq!(s.interval_for(1, 2.0), 1);
        assert_eq!(s.interval_for(2, 2.0), 3);
        assert_eq!(s.interval_for(3, 2.0), 7);
        assert_eq!(s.interval_for(4, 2.0), 14);
        assert_eq!(s.interval_for(5, 2.0), 28);
        assert_eq!(s.interval_for(4, 2.4), 17);
        assert_eq!(s.interval_for(500, 2.5), u32::MAX);
        assert_eq!(s.interval_for(u32::MAX, 1.3), u32::MAX);
    }

    #[test]
    fn test_huge_streak_still_pushes_review_out() {
        let s = SpacedRepetitionScheduler::default();
        let mut p = LetterProgress::new("E", true, day(1));
        p.consecutive_correct = 3_000_000_000;
        let update = s.schedule(&p, q(5), day(1));
        assert_eq!(update.interval_days, u32::MAX);
        assert_eq!(update.next_review, NaiveDate::MAX);
    }

    #[test]
    fn test_shrinking_ease_keeps_at_least_one_day() {
        let s = SpacedRepetitionScheduler::new(SchedulerConfig {
            min_ease_factor: 0.1,
            default_ease_factor: 0.1,
            ..SchedulerConfig::default()
        });
        assert_eq!(s.interval_for(1000, 0.1), 1);
    }

    #[test]
    fn test_failure_resets_and_returns_tomorrow() {
        let s = SpacedRepetitionScheduler::default();
        let mut p = LetterProgress::new("E", true, day(1));
        p.consecutive_correct = 4;
        let update = s.schedule(&p, q(0), day(10));
        assert_eq!(update.consecutive_correct, 0);
        assert_eq!(update.interval_days, 1);
        assert_eq!(update.next_review, day(11));
    }

    #[test]
    fn test_process_attempt_updates_record() {
        let catalog = LetterCatalog::builtin();
        let mut book = ProgressBook::initial(&catalog, day(1));
        let s = SpacedRepetitionScheduler::default();

        let out = s
            .process_attempt(&mut book, "E", &AttemptResult::new(true, 1000), day(1))
            .unwrap();
        assert_eq!(out.quality, q(5));
        assert_eq!(out.next_review, day(2));
        assert_eq!(out.mastery_delta, 10);

        let p = book.get("E").unwrap();
        assert_eq!(p.consecutive_correct, 1);
        assert_eq!(p.attempts, 1);
        assert_eq!(p.mastery_score, 10);
        assert!((p.ease_factor - 2.1).abs() < 1e-12);

        let out = s
            .process_attempt(&mut book, "E", &AttemptResult::new(false, 4000), day(2))
            .unwrap();
        assert_eq!(out.mastery_delta, -5);
        assert_eq!(book.get("E").unwrap().mastery_score, 5);
        assert_eq!(book.get("E").unwrap().consecutive_correct, 0);
    }

    #[test]
    fn test_mastery_never_negative() {
        let catalog = LetterCatalog::builtin();
        let mut book = ProgressBook::initial(&catalog, day(1));
        let s = SpacedRepetitionScheduler::default();
        let out = s
            .process_attempt(&mut book, "A", &AttemptResult::new(false, 100), day(1))
            .unwrap();
        assert_eq!(out.mastery_score, 0);
    }

    #[test]
    fn test_unknown_letter_is_none() {
        let mut book = ProgressBook::default();
        let s = SpacedRepetitionScheduler::default();
        assert!(s
            .process_attempt(&mut book, "E", &AttemptResult::new(true, 100), day(1))
            .is_none());
    }

    #[test]
    fn test_review_queue_order() {
        let catalog = LetterCatalog::builtin();
        let mut book = ProgressBook::initial(&catalog, day(1));
        book.update_mastery("E", 50).unwrap();
        book.update_mastery("A", 20).unwrap();
        book.update_mastery("İ", 70).unwrap();
        book.update_review("İ", day(1), 1.5).unwrap();
        book.update_review("E", day(1), 2.0).unwrap();
        book.update_review("A", day(9), 1.3).unwrap(); // not yet due

        let s = SpacedRepetitionScheduler::default();
        let queue: Vec<&str> = s
            .review_queue(&book, day(3))
            .iter()
            .map(|p| p.letter_id.as_str())
            .collect();
        assert_eq!(queue, vec!["İ", "E"]);
    }
}
