//! Data Sanitization
//!
//! Repairs persisted progress before the engine uses it.
//!
//! Functions:
//! - Per-record clamping (mastery, ease factor, counters, streak, trace score)
//! - Stage/unlock invariant repair
//! - Whole-book reconciliation against the catalog

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::LetterCatalog;
use crate::config::SchedulerConfig;
use crate::progress::{fresh_record, ProgressBook};
use crate::types::{clamp_mastery, LetterProgress, Stage};

/// 一次清理过程的修改统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeReport {
    /// 至少有一个字段被钳制或修复的记录数
    pub repaired: usize,
    /// 存储中缺失、按初始状态补建的字母数
    pub added: usize,
    /// 字母表中不存在、已丢弃的记录数
    pub removed: usize,
}

impl SanitizeReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// 检查难度因子是否有效 (不做修复)
pub fn is_valid_ease(ease: f64, config: &SchedulerConfig) -> bool {
    ease.is_finite() && (config.min_ease_factor..=config.max_ease_factor).contains(&ease)
}

/// 将单条记录钳制回有效范围，返回是否有修改
pub fn sanitize_letter_progress(progress: &mut LetterProgress, config: &SchedulerConfig) -> bool {
    let mut changed = false;

    let mastery = clamp_mastery(progress.mastery_score);
    if mastery != progress.mastery_score {
        progress.mastery_score = mastery;
        changed = true;
    }

    if !is_valid_ease(progress.ease_factor, config) {
        progress.ease_factor = config.clamp_ease(progress.ease_factor);
        changed = true;
    }

    if progress.correct_attempts > progress.attempts {
        progress.correct_attempts = progress.attempts;
        changed = true;
    }

    // 连续正确次数不能超过正确总数
    if progress.consecutive_correct > progress.correct_attempts {
        progress.consecutive_correct = progress.correct_attempts;
        changed = true;
    }

    if progress.best_trace_score > 100 {
        progress.best_trace_score = 100;
        changed = true;
    }

    // 描写阶段及以后的字母必须已解锁
    if progress.stage >= Stage::Trace && !progress.unlocked {
        progress.unlocked = true;
        changed = true;
    }

    changed
}

/// 按字母表校正加载的进度并清理每条记录
///
/// 空进度直接替换为初始进度
pub fn sanitize_book(
    book: &mut ProgressBook,
    catalog: &LetterCatalog,
    config: &SchedulerConfig,
    today: NaiveDate,
) -> SanitizeReport {
    let mut report = SanitizeReport::default();

    if book.is_empty() {
        *book = ProgressBook::initial_with(catalog, config, today);
        report.added = book.len();
        return report;
    }

    let before = book.len();
    book.retain(|p| catalog.contains(&p.letter_id));
    report.removed = before - book.len();

    for letter in catalog.iter() {
        if book.get(&letter.letter_id).is_none() {
            book.insert(fresh_record(letter, config, today));
            report.added += 1;
        }
    }

    for progress in book.iter_mut() {
        if sanitize_letter_progress(progress, config) {
            report.repaired += 1;
        }
    }

    if !report.is_clean() {
        tracing::warn!(
            repaired = report.repaired,
            added = report.added,
            removed = report.removed,
            "persisted progress needed repair"
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
    }

    #[test]
    fn test_clean_record_untouched() {
        let config = SchedulerConfig::default();
        let mut p = LetterProgress::new("E", true, today());
        let before = p.clone();
        assert!(!sanitize_letter_progress(&mut p, &config));
        assert_eq!(p, before);
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let config = SchedulerConfig::default();
        let mut p = LetterProgress::new("E", false, today());
        p.mastery_score = 250;
        p.ease_factor = 9.0;
        p.attempts = 2;
        p.correct_attempts = 5;
        p.consecutive_correct = 3_000_000_000;
        p.best_trace_score = 180;
        p.stage = Stage::Complete;
        assert!(sanitize_letter_progress(&mut p, &config));
        assert_eq!(p.mastery_score, 100);
        assert_eq!(p.ease_factor, 2.5);
        assert_eq!(p.correct_attempts, 2);
        assert_eq!(p.consecutive_correct, 2);
        assert_eq!(p.best_trace_score, 100);
        assert!(p.unlocked);
    }

    #[test]
    fn test_nan_ease_resets_to_default() {
        let config = SchedulerConfig::default();
        let mut p = LetterProgress::new("E", true, today());
        p.ease_factor = f64::NAN;
        assert!(sanitize_letter_progress(&mut p, &config));
        assert_eq!(p.ease_factor, config.default_ease_factor);
    }

    #[test]
    fn test_empty_book_initialized() {
        let catalog = LetterCatalog::builtin();
        let mut book = ProgressBook::default();
        let report = sanitize_book(&mut book, &catalog, &SchedulerConfig::default(), today());
        assert_eq!(report.added, 29);
        assert_eq!(book.unlocked_count(), 3);
    }

    #[test]
    fn test_book_reconciled_with_catalog() {
        let catalog = LetterCatalog::builtin();
        let mut book = ProgressBook::from_records([
            LetterProgress::new("E", true, today()),
            LetterProgress::new("W", true, today()),
        ]);
        let report = sanitize_book(&mut book, &catalog, &SchedulerConfig::default(), today());
        assert_eq!(report.removed, 1);
        assert_eq!(report.added, 28);
        assert_eq!(report.repaired, 0);
        assert!(book.get("W").is_none());
        assert_eq!(book.len(), 29);
    }

    #[test]
    fn test_added_letters_use_configured_ease() {
        let catalog = LetterCatalog::builtin();
        let config = SchedulerConfig {
            default_ease_factor: 2.3,
            ..SchedulerConfig::default()
        };
        let mut book = ProgressBook::from_records([LetterProgress::new("E", true, today())]);
        sanitize_book(&mut book, &catalog, &config, today());
        assert_eq!(book.get("E").unwrap().ease_factor, 2.0);
        assert_eq!(book.get("A").unwrap().ease_factor, 2.3);
        assert!(book.get("A").unwrap().unlocked);
        assert!(!book.get("L").unwrap().unlocked);

        let mut empty = ProgressBook::default();
        sanitize_book(&mut empty, &catalog, &config, today());
        assert!(empty.iter().all(|p| p.ease_factor == 2.3));
    }
}
