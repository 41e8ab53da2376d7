//! Corridor Trace Validation
//!
//! Decides whether drawn strokes retrace a letter. The target path is widened
//! into a corridor of fixed half-width and two ratios are measured:
//! - inside ratio: share of drawn points lying in the corridor
//! - coverage ratio: share of target points reached by some drawn point
//!
//! Both must clear their thresholds for a pass.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::TraceConfig;
use crate::types::{round_percent, Point};

/// 单次描写的验证结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TraceVerdict {
    /// 0-100
    pub score: u8,
    pub passed: bool,
    /// 0-100，落在通道内的绘制点比例
    pub inside_ratio: u8,
    /// 0-100，被绘制覆盖的目标点比例
    pub coverage_ratio: u8,
    /// 0-3，未通过时为 0
    pub stars: u8,
}

impl TraceVerdict {
    pub fn failed() -> Self {
        Self::default()
    }
}

/// 描写星级 (与 `scoring` 中的小游戏星级表不同)
pub fn trace_stars(score: u8, passed: bool) -> u8 {
    if !passed {
        return 0;
    }
    if score >= 90 {
        3
    } else if score >= 80 {
        2
    } else {
        1
    }
}

/// `point` 到 `points` 中最近点的距离平方，`points` 为空时为无穷大
fn nearest_distance_squared(point: &Point, points: &[Point]) -> f64 {
    points
        .iter()
        .map(|p| point.distance_squared(p))
        .fold(f64::INFINITY, f64::min)
}

/// `from` 中距某个 `to` 点不超过 `half_width` 的点所占百分比
fn within_ratio(from: &[Point], to: &[Point], half_width: f64) -> f64 {
    if from.is_empty() {
        return 0.0;
    }
    let limit = half_width * half_width;
    let hits = from
        .iter()
        .filter(|p| nearest_distance_squared(p, to) <= limit)
        .count();
    hits as f64 / from.len() as f64 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorridorValidator {
    half_width: f64,
    min_inside_ratio: f64,
    min_coverage_ratio: f64,
    min_drawn_points: usize,
}

impl Default for CorridorValidator {
    fn default() -> Self {
        Self::from_config(&TraceConfig::default())
    }
}

impl CorridorValidator {
    pub fn new(half_width: f64) -> Self {
        Self {
            half_width,
            ..Self::default()
        }
    }

    pub fn from_config(config: &TraceConfig) -> Self {
        Self {
            half_width: config.corridor_half_width,
            min_inside_ratio: config.min_inside_ratio,
            min_coverage_ratio: config.min_coverage_ratio,
            min_drawn_points: config.min_drawn_points,
        }
    }

    pub fn half_width(&self) -> f64 {
        self.half_width
    }

    /// 用预采样的目标点验证一次描写的全部笔画
    pub fn validate(&self, drawn_strokes: &[Vec<Point>], target: &[Point]) -> TraceVerdict {
        let drawn: Vec<Point> = drawn_strokes.iter().flatten().copied().collect();

        if drawn.len() < self.min_drawn_points {
            tracing::debug!(points = drawn.len(), "trace too short, treating as a tap");
            return TraceVerdict::failed();
        }

        let inside = within_ratio(&drawn, target, self.half_width);
        let coverage = within_ratio(target, &drawn, self.half_width);

        let score = round_percent((inside + coverage) / 2.0);
        let passed = inside >= self.min_inside_ratio && coverage >= self.min_coverage_ratio;

        TraceVerdict {
            score,
            passed,
            inside_ratio: round_percent(inside),
            coverage_ratio: round_percent(coverage),
            stars: trace_stars(score, passed),
        }
    }

    /// 并行验证多次描写，保持输入顺序
    pub fn validate_batch(&self, attempts: &[(Vec<Vec<Point>>, Vec<Point>)]) -> Vec<TraceVerdict> {
        attempts
            .par_iter()
            .map(|(drawn, target)| self.validate(drawn, target))
            .collect()
    }
}
