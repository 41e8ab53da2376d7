//! Scoring rules
//!
//! Stateless conversions from raw scores to stars and mastery deltas, plus the
//! stage advancement and unlock eligibility rules.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::Stage;

/// Mastery lost on a wrong answer. Kept small so mistakes are not punishing.
pub const WRONG_ANSWER_PENALTY: i32 = -3;

/// Mastery required (together with stage 3+) before the next letter may open
pub const UNLOCK_MASTERY_THRESHOLD: i32 = 50;

/// Stars for round-based mini-games: 90 → 3, 80 → 2, 70 → 1
pub fn stars_from_score(score: u8) -> u8 {
    if score >= 90 {
        3
    } else if score >= 80 {
        2
    } else if score >= 70 {
        1
    } else {
        0
    }
}

fn stage_multiplier(stage: Stage) -> f64 {
    match stage {
        Stage::Introduce => 1.0,
        Stage::Recognize => 1.5,
        Stage::Trace => 2.0,
        Stage::Complete => 2.5,
    }
}

fn base_gain(score: u8) -> f64 {
    if score >= 90 {
        8.0
    } else if score >= 80 {
        6.0
    } else if score >= 70 {
        4.0
    } else {
        2.0
    }
}

/// Mastery delta for one round; later stages weigh more
pub fn mastery_gain(stage: Stage, score: u8, correct: bool) -> i32 {
    if !correct {
        return WRONG_ANSWER_PENALTY;
    }
    (base_gain(score) * stage_multiplier(stage)).round() as i32
}

pub fn can_advance_stage(stage: Stage, mastery: i32, consecutive_correct: u32) -> bool {
    match stage {
        Stage::Introduce => consecutive_correct >= 1,
        Stage::Recognize => consecutive_correct >= 2 && mastery >= 30,
        Stage::Trace => consecutive_correct >= 2 && mastery >= 60,
        Stage::Complete => false,
    }
}

pub fn can_unlock_next(mastery: i32, stage: Stage) -> bool {
    stage >= Stage::Trace && mastery >= UNLOCK_MASTERY_THRESHOLD
}

// ==================== Session Summary ====================

/// Encouragement shown at the end of a session; the UI owns the wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Encouragement {
    GreatJob,
    WorkedHard,
    BetterEveryDay,
    WellDone,
    LearnedALot,
}

impl Encouragement {
    pub const ALL: [Encouragement; 5] = [
        Encouragement::GreatJob,
        Encouragement::WorkedHard,
        Encouragement::BetterEveryDay,
        Encouragement::WellDone,
        Encouragement::LearnedALot,
    ];

    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub total_stars: u32,
    pub letters_studied: u32,
    pub activities_completed: u32,
    pub best_score: u8,
    pub encouragement: Encouragement,
}

pub fn session_summary<R: Rng + ?Sized>(
    stars_earned: u32,
    letters_studied: u32,
    activities_completed: u32,
    scores: &[u8],
    rng: &mut R,
) -> SessionSummary {
    SessionSummary {
        total_stars: stars_earned,
        letters_studied,
        activities_completed,
        best_score: scores.iter().copied().max().unwrap_or(0),
        encouragement: Encouragement::pick(rng),
    }
}
