//! Common Types and Constants
//!
//! Shared data structures used across all engine modules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ==================== Constants ====================

/// Lowest mastery score a letter can hold
pub const MIN_MASTERY: i32 = 0;

/// Highest mastery score a letter can hold
pub const MAX_MASTERY: i32 = 100;

/// Ease factor lower bound (SM-2 floor)
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor upper bound
pub const MAX_EASE_FACTOR: f64 = 2.5;

/// Ease factor assigned to a freshly created letter
pub const DEFAULT_EASE_FACTOR: f64 = 2.0;

/// Letters whose pedagogical order is at or below this start unlocked
pub const INITIAL_UNLOCKED_LETTERS: u32 = 3;

/// Side length of the normalized drawing space
pub const CANVAS_EXTENT: f64 = 200.0;

/// Letter identifier, e.g. `"A"` or `"Ş"`
pub type LetterId = String;

// ==================== Geometry ====================

/// A point in the normalized 0-200 drawing space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Linear interpolation towards `other` at parameter `t`
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

// ==================== Learning Stage ====================

/// Learning phase of a single letter. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub enum Stage {
    Introduce = 1,
    Recognize = 2,
    Trace = 3,
    Complete = 4,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Introduce,
        Stage::Recognize,
        Stage::Trace,
        Stage::Complete,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Stage::Introduce),
            2 => Some(Stage::Recognize),
            3 => Some(Stage::Trace),
            4 => Some(Stage::Complete),
            _ => None,
        }
    }

    /// Maps any stored integer into the valid stage range
    pub fn clamped(n: i64) -> Self {
        match n {
            i64::MIN..=1 => Stage::Introduce,
            2 => Stage::Recognize,
            3 => Stage::Trace,
            _ => Stage::Complete,
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn is_complete(self) -> bool {
        self == Stage::Complete
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Introduce => "introduce",
            Stage::Recognize => "recognize",
            Stage::Trace => "trace",
            Stage::Complete => "complete",
        }
    }
}

impl TryFrom<u8> for Stage {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Stage::from_number(value).ok_or(EngineError::InvalidStage(value))
    }
}

impl From<i64> for Stage {
    fn from(value: i64) -> Self {
        Stage::clamped(value)
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.number()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.number(), self.as_str())
    }
}

// ==================== Letter Shape ====================

/// Difficulty tag attached to a letter shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

// ==================== Attempts ====================

/// Normalized outcome of one learning interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub correct: bool,
    pub response_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

impl AttemptResult {
    pub fn new(correct: bool, response_time_ms: u64) -> Self {
        Self {
            correct,
            response_time_ms,
            score: None,
        }
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.score = Some(score.min(100));
        self
    }
}

// ==================== Letter Progress ====================

/// Persisted learning record for one letter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterProgress {
    pub letter_id: LetterId,
    pub stage: Stage,
    /// Running competence estimate in [0, 100]
    pub mastery_score: i32,
    pub attempts: u32,
    pub correct_attempts: u32,
    pub best_trace_score: u8,
    #[serde(default)]
    pub last_practiced: Option<NaiveDate>,
    pub next_review: NaiveDate,
    pub unlocked: bool,
    /// SM-2 ease factor in [1.3, 2.5]
    pub ease_factor: f64,
    pub consecutive_correct: u32,
}

impl LetterProgress {
    /// Fresh record as created at profile creation
    pub fn new(letter_id: impl Into<LetterId>, unlocked: bool, today: NaiveDate) -> Self {
        Self {
            letter_id: letter_id.into(),
            stage: Stage::Introduce,
            mastery_score: MIN_MASTERY,
            attempts: 0,
            correct_attempts: 0,
            best_trace_score: 0,
            last_practiced: None,
            next_review: today,
            unlocked,
            ease_factor: DEFAULT_EASE_FACTOR,
            consecutive_correct: 0,
        }
    }

    /// Same record starting from a configured ease factor
    pub fn with_ease_factor(mut self, ease_factor: f64) -> Self {
        self.ease_factor = ease_factor;
        self
    }

    pub fn set_mastery(&mut self, score: i32) {
        self.mastery_score = clamp_mastery(score);
    }

    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review <= today
    }

    /// Share of correct attempts in [0, 1]
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.correct_attempts as f64 / self.attempts as f64
    }
}

pub fn clamp_mastery(score: i32) -> i32 {
    score.clamp(MIN_MASTERY, MAX_MASTERY)
}

/// Percentage (0-100) rounded to the nearest integer
pub(crate) fn round_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_stage_order_and_next() {
        assert!(Stage::Introduce < Stage::Complete);
        assert_eq!(Stage::Introduce.next(), Some(Stage::Recognize));
        assert_eq!(Stage::Trace.next(), Some(Stage::Complete));
        assert_eq!(Stage::Complete.next(), None);
    }

    #[test]
    fn test_stage_try_from_rejects_out_of_range() {
        assert_eq!(Stage::try_from(3u8).unwrap(), Stage::Trace);
        assert!(Stage::try_from(0u8).is_err());
        assert!(Stage::try_from(5u8).is_err());
    }

    #[test]
    fn test_stage_deserialize_clamps() {
        let s: Stage = serde_json::from_str("9").unwrap();
        assert_eq!(s, Stage::Complete);
        let s: Stage = serde_json::from_str("-2").unwrap();
        assert_eq!(s, Stage::Introduce);
        assert_eq!(serde_json::to_string(&Stage::Recognize).unwrap(), "2");
    }

    #[test]
    fn test_point_math() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.lerp(&b, 0.5), Point::new(1.5, 2.0));
    }

    #[test]
    fn test_letter_progress_defaults() {
        let p = LetterProgress::new("E", true, day(2026, 1, 5));
        assert_eq!(p.stage, Stage::Introduce);
        assert_eq!(p.ease_factor, DEFAULT_EASE_FACTOR);
        assert!(p.is_due(day(2026, 1, 5)));
        assert!(!p.is_due(day(2026, 1, 4)));
        assert_eq!(p.accuracy(), 0.0);
    }

    #[test]
    fn test_letter_progress_serializes_camel_case_dates() {
        let p = LetterProgress::new("A", false, day(2026, 3, 1));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["letterId"], "A");
        assert_eq!(json["nextReview"], "2026-03-01");
        assert_eq!(json["stage"], 1);
    }

    #[test]
    fn test_set_mastery_clamps() {
        let mut p = LetterProgress::new("A", true, day(2026, 3, 1));
        p.set_mastery(140);
        assert_eq!(p.mastery_score, 100);
        p.set_mastery(-7);
        assert_eq!(p.mastery_score, 0);
    }

    #[test]
    fn test_round_percent() {
        assert_eq!(round_percent(74.5), 75);
        assert_eq!(round_percent(f64::NAN), 0);
        assert_eq!(round_percent(130.0), 100);
    }
}
