//! Adaptive Difficulty
//!
//! Reads a short window of recent attempts and recommends whether the child
//! should move ahead, stay, or step back. Also builds the letter mix for a
//! practice session and decides group-level advance/retreat.

use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::LetterCatalog;
use crate::config::SessionConfig;
use crate::progress::ProgressBook;
use crate::types::{round_percent, AttemptResult, LetterId, Stage};

/// 报告趋势所需的最小窗口长度
const MIN_TREND_WINDOW: usize = 4;
/// 前后半窗口正确率差超过此值视为趋势
const TREND_THRESHOLD: f64 = 0.2;
const ADVANCE_ACCURACY: u8 = 90;
const ADVANCE_STREAK: usize = 3;
const RETREAT_ACCURACY: u8 = 50;
/// 进入下一组前，本组每个字母需要的掌握度
const GROUP_ADVANCE_MASTERY: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Advance,
    #[default]
    Stay,
    Retreat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAnalysis {
    pub accuracy: u8,
    pub avg_response_time_ms: u64,
    pub trend: Trend,
    pub recommendation: Recommendation,
}

fn correct_share(results: &[AttemptResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().filter(|r| r.correct).count() as f64 / results.len() as f64
}

/// 从最近一次往前数的连续正确次数
pub fn trailing_consecutive_correct(results: &[AttemptResult]) -> usize {
    results.iter().rev().take_while(|r| r.correct).count()
}

/// 分析最近 `window` 条结果；窗口为空时为 Stable/Stay
pub fn analyze_recent(results: &[AttemptResult], window: usize) -> PerformanceAnalysis {
    let recent = &results[results.len().saturating_sub(window)..];
    if recent.is_empty() {
        return PerformanceAnalysis::default();
    }

    let accuracy = round_percent(correct_share(recent) * 100.0);
    let total_ms: u128 = recent.iter().map(|r| u128::from(r.response_time_ms)).sum();
    let n = recent.len() as u128;
    let avg_response_time_ms = u64::try_from((total_ms + n / 2) / n).unwrap_or(u64::MAX);

    let mut trend = Trend::Stable;
    if recent.len() >= MIN_TREND_WINDOW {
        let (first, second) = recent.split_at(recent.len() / 2);
        let swing = correct_share(second) - correct_share(first);
        if swing > TREND_THRESHOLD {
            trend = Trend::Improving;
        } else if -swing > TREND_THRESHOLD {
            trend = Trend::Declining;
        }
    }

    let recommendation = if accuracy >= ADVANCE_ACCURACY
        && trailing_consecutive_correct(recent) >= ADVANCE_STREAK
    {
        Recommendation::Advance
    } else if accuracy < RETREAT_ACCURACY {
        Recommendation::Retreat
    } else {
        Recommendation::Stay
    };

    PerformanceAnalysis {
        accuracy,
        avg_response_time_ms,
        trend,
        recommendation,
    }
}

// ==================== Session Log ====================

/// 单条作答记录的借用视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord<'a> {
    pub letter_id: &'a str,
    #[serde(flatten)]
    pub result: AttemptResult,
}

/// 最近作答记录 (旧的在前)
///
/// 全局记录和每个字母的记录分别限长，
/// 某个字母的练习不会挤掉其他字母的分析窗口
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionLog {
    capacity: usize,
    letter_capacity: usize,
    entries: VecDeque<(LetterId, AttemptResult)>,
    by_letter: BTreeMap<LetterId, VecDeque<AttemptResult>>,
}

impl SessionLog {
    pub fn new(capacity: usize, letter_capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            letter_capacity: letter_capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
            by_letter: BTreeMap::new(),
        }
    }

    /// 每个字母至少保留一个完整分析窗口
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.session_log_capacity, config.analysis_window)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 追加一条结果，已满的记录丢弃最旧一条
    pub fn push(&mut self, letter_id: impl Into<LetterId>, result: AttemptResult) {
        let letter_id = letter_id.into();

        let letter_cap = self.letter_capacity.max(1);
        let history = self.by_letter.entry(letter_id.clone()).or_default();
        if history.len() >= letter_cap {
            history.pop_front();
        }
        history.push_back(result);

        if self.entries.len() >= self.capacity.max(1) {
            self.entries.pop_front();
        }
        self.entries.push_back((letter_id, result));
    }

    pub fn records(&self) -> impl Iterator<Item = ActivityRecord<'_>> {
        self.entries.iter().map(|(id, result)| ActivityRecord {
            letter_id: id.as_str(),
            result: *result,
        })
    }

    pub fn results(&self) -> Vec<AttemptResult> {
        self.entries.iter().map(|(_, r)| *r).collect()
    }

    pub fn results_for(&self, letter_id: &str) -> Vec<AttemptResult> {
        self.by_letter
            .get(letter_id)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn analyze(&self, window: usize) -> PerformanceAnalysis {
        analyze_recent(&self.results(), window)
    }

    pub fn analyze_letter(&self, letter_id: &str, window: usize) -> PerformanceAnalysis {
        analyze_recent(&self.results_for(letter_id), window)
    }
}

// ==================== Session Mix ====================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPlan {
    pub known: Vec<LetterId>,
    pub new_or_review: Vec<LetterId>,
}

impl SessionPlan {
    pub fn len(&self) -> usize {
        self.known.len() + self.new_or_review.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn letters(&self) -> impl Iterator<Item = &str> {
        self.known.iter().chain(self.new_or_review.iter()).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct SessionPlanner {
    session_size: usize,
    known_ratio: f64,
    known_mastery_threshold: i32,
}

impl Default for SessionPlanner {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl SessionPlanner {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            session_size: config.session_size,
            known_ratio: config.known_ratio,
            known_mastery_threshold: config.known_mastery_threshold,
        }
    }

    pub fn session_size(&self) -> usize {
        self.session_size
    }

    /// 已掌握字母的名额: 至少 1 个，最多为会话长度
    pub fn known_slots(&self) -> usize {
        if self.session_size == 0 {
            return 0;
        }
        let target = (self.session_size as f64 * self.known_ratio).round() as usize;
        target.clamp(1, self.session_size)
    }

    /// 为一次练习挑选字母
    ///
    /// 已掌握字母占其名额，其余名额优先给到期复习的字母，两边互相补位。
    /// 仍有空缺时用其他已解锁字母填充，字母不足时循环重复。
    pub fn build_session<R: Rng + ?Sized>(
        &self,
        catalog: &LetterCatalog,
        book: &ProgressBook,
        today: NaiveDate,
        rng: &mut R,
    ) -> SessionPlan {
        let unlocked: Vec<&str> = catalog
            .ids()
            .filter(|id| book.is_unlocked(id))
            .collect();
        if unlocked.is_empty() || self.session_size == 0 {
            return SessionPlan::default();
        }

        let mastery = |id: &str| book.mastery(id).unwrap_or(0);
        let threshold = self.known_mastery_threshold;

        let mut known: Vec<&str> = unlocked
            .iter()
            .copied()
            .filter(|&id| mastery(id) >= threshold)
            .collect();
        let mut review: Vec<&str> = unlocked
            .iter()
            .copied()
            .filter(|&id| {
                mastery(id) < threshold && book.get(id).map(|p| p.is_due(today)).unwrap_or(false)
            })
            .collect();
        let mut fresh: Vec<&str> = unlocked
            .iter()
            .copied()
            .filter(|&id| mastery(id) == 0 && !review.contains(&id))
            .collect();

        known.shuffle(rng);
        review.shuffle(rng);
        fresh.shuffle(rng);

        let known_slots = self.known_slots();
        let other_slots = self.session_size - known_slots;

        let mut pool: VecDeque<&str> = review.into_iter().chain(fresh).collect();
        let mut known_pool: VecDeque<&str> = known.into_iter().collect();

        let mut plan_known: Vec<&str> = Vec::with_capacity(known_slots);
        let mut plan_other: Vec<&str> = Vec::with_capacity(self.session_size);

        take_into(&mut known_pool, &mut plan_known, known_slots);
        take_into(&mut pool, &mut plan_other, other_slots);

        // 两边互相补位
        let missing_known = known_slots - plan_known.len();
        take_into(&mut pool, &mut plan_other, missing_known);
        let missing = self.session_size - plan_known.len() - plan_other.len();
        take_into(&mut known_pool, &mut plan_known, missing);

        // 重复之前先用其他已解锁字母
        let chosen: HashSet<&str> = plan_known.iter().chain(plan_other.iter()).copied().collect();
        let mut rest: Vec<&str> = unlocked
            .iter()
            .copied()
            .filter(|id| !chosen.contains(id))
            .collect();
        rest.shuffle(rng);
        let mut rest: VecDeque<&str> = rest.into_iter().collect();
        let missing = self.session_size - plan_known.len() - plan_other.len();
        take_into(&mut rest, &mut plan_other, missing);

        let distinct: Vec<&str> = plan_known.iter().chain(plan_other.iter()).copied().collect();
        let mut cycle = distinct.iter().cycle();
        while plan_known.len() + plan_other.len() < self.session_size {
            let Some(&id) = cycle.next() else { break };
            if plan_known.len() < known_slots && mastery(id) >= threshold {
                plan_known.push(id);
            } else {
                plan_other.push(id);
            }
        }

        SessionPlan {
            known: plan_known.into_iter().map(str::to_string).collect(),
            new_or_review: plan_other.into_iter().map(str::to_string).collect(),
        }
    }
}

fn take_into<'a>(from: &mut VecDeque<&'a str>, into: &mut Vec<&'a str>, count: usize) {
    for _ in 0..count {
        match from.pop_front() {
            Some(id) => into.push(id),
            None => break,
        }
    }
}

// ==================== Group Progression ====================

/// `group` 中每个字母都已解锁、处于描写阶段及以后且掌握度过半时返回 true。
/// 空组永不进阶。
pub fn should_advance_to_next_group(group: u32, catalog: &LetterCatalog, book: &ProgressBook) -> bool {
    let mut letters = catalog.group(group).peekable();
    if letters.peek().is_none() {
        return false;
    }
    letters.all(|l| {
        book.get(&l.letter_id)
            .map(|p| p.unlocked && p.mastery_score >= GROUP_ADVANCE_MASTERY && p.stage >= Stage::Trace)
            .unwrap_or(false)
    })
}

pub fn should_retreat_to_previous_group(group: u32, recent: &[AttemptResult], window: usize) -> bool {
    group > 1 && analyze_recent(recent, window).recommendation == Recommendation::Retreat
}
