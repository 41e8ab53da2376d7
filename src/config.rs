//! Engine configuration
//!
//! Every tunable constant the algorithms use lives here. Defaults reproduce the
//! reference behaviour; `from_env` lets a deployment override single values.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::{DEFAULT_EASE_FACTOR, MAX_EASE_FACTOR, MIN_EASE_FACTOR};

/// How elliptical-arc segments are turned into points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArcSampling {
    /// Only the arc's end point is emitted
    #[default]
    Endpoint,
    /// The arc is converted to center form and sampled like any other segment
    Full,
}

impl ArcSampling {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "endpoint" => Some(ArcSampling::Endpoint),
            "full" => Some(ArcSampling::Full),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceConfig {
    /// Distance from the guide path within which a point counts as on-path
    pub corridor_half_width: f64,
    pub samples_per_segment: usize,
    /// Number of target points a letter shape is normalized to
    pub target_sample_count: usize,
    pub min_inside_ratio: f64,
    pub min_coverage_ratio: f64,
    /// Fewer drawn points than this is treated as an accidental tap
    pub min_drawn_points: usize,
    pub arc_sampling: ArcSampling,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            corridor_half_width: 20.0,
            samples_per_segment: 20,
            target_sample_count: 120,
            min_inside_ratio: 75.0,
            min_coverage_ratio: 60.0,
            min_drawn_points: 3,
            arc_sampling: ArcSampling::Endpoint,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    /// Fixed review ramp in days for the first successful reviews
    pub review_intervals: Vec<u32>,
    pub min_ease_factor: f64,
    pub max_ease_factor: f64,
    pub default_ease_factor: f64,
    pub failure_ease_penalty: f64,
    pub failure_interval_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            review_intervals: vec![1, 3, 7],
            min_ease_factor: MIN_EASE_FACTOR,
            max_ease_factor: MAX_EASE_FACTOR,
            default_ease_factor: DEFAULT_EASE_FACTOR,
            failure_ease_penalty: 0.2,
            failure_interval_days: 1,
        }
    }
}

impl SchedulerConfig {
    pub fn clamp_ease(&self, ease: f64) -> f64 {
        if ease.is_nan() {
            return self.default_ease_factor;
        }
        ease.clamp(self.min_ease_factor, self.max_ease_factor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub session_size: usize,
    /// Share of session slots reserved for already-known letters
    pub known_ratio: f64,
    /// Mastery at which a letter counts as known
    pub known_mastery_threshold: i32,
    /// Number of recent attempts the difficulty analyzer inspects
    pub analysis_window: usize,
    pub session_log_capacity: usize,
    pub max_game_scores: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_size: 5,
            known_ratio: 0.8,
            known_mastery_threshold: 60,
            analysis_window: 5,
            session_log_capacity: 20,
            max_game_scores: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub trace: TraceConfig,
    pub scheduler: SchedulerConfig,
    pub session: SessionConfig,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = env_parse::<f64>("LETTER_MASTERY_CORRIDOR_HALF_WIDTH") {
            config.trace.corridor_half_width = val;
        }
        if let Some(val) = env_parse::<usize>("LETTER_MASTERY_SAMPLES_PER_SEGMENT") {
            config.trace.samples_per_segment = val;
        }
        if let Some(val) = env_parse::<usize>("LETTER_MASTERY_TARGET_SAMPLES") {
            config.trace.target_sample_count = val;
        }
        if let Ok(val) = std::env::var("LETTER_MASTERY_ARC_SAMPLING") {
            if let Some(mode) = ArcSampling::parse(&val) {
                config.trace.arc_sampling = mode;
            }
        }
        if let Ok(val) = std::env::var("LETTER_MASTERY_REVIEW_INTERVALS") {
            let ramp: Option<Vec<u32>> = val
                .split(',')
                .map(|part| part.trim().parse::<u32>().ok())
                .collect();
            if let Some(ramp) = ramp.filter(|r| !r.is_empty()) {
                config.scheduler.review_intervals = ramp;
            }
        }
        if let Some(val) = env_parse::<f64>("LETTER_MASTERY_MIN_EASE") {
            config.scheduler.min_ease_factor = val;
        }
        if let Some(val) = env_parse::<f64>("LETTER_MASTERY_MAX_EASE") {
            config.scheduler.max_ease_factor = val;
        }
        if let Some(val) = env_parse::<usize>("LETTER_MASTERY_SESSION_SIZE") {
            config.session.session_size = val;
        }
        if let Some(val) = env_parse::<f64>("LETTER_MASTERY_KNOWN_RATIO") {
            config.session.known_ratio = val;
        }

        config
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let trace = &self.trace;
        if !(trace.corridor_half_width > 0.0) {
            return Err(EngineError::Config(format!(
                "corridor half-width must be positive, got {}",
                trace.corridor_half_width
            )));
        }
        if trace.samples_per_segment == 0 {
            return Err(EngineError::Config("samples per segment must be at least 1".into()));
        }
        if trace.target_sample_count < 2 {
            return Err(EngineError::Config("target sample count must be at least 2".into()));
        }
        for (name, ratio) in [
            ("inside", trace.min_inside_ratio),
            ("coverage", trace.min_coverage_ratio),
        ] {
            if !(0.0..=100.0).contains(&ratio) {
                return Err(EngineError::Config(format!(
                    "minimum {name} ratio must be within [0, 100], got {ratio}"
                )));
            }
        }

        let scheduler = &self.scheduler;
        if scheduler.review_intervals.is_empty() {
            return Err(EngineError::Config("review interval ramp is empty".into()));
        }
        if scheduler.review_intervals.contains(&0) {
            return Err(EngineError::Config("review intervals must be at least one day".into()));
        }
        if !(scheduler.min_ease_factor > 0.0 && scheduler.min_ease_factor <= scheduler.max_ease_factor)
        {
            return Err(EngineError::Config(format!(
                "ease bounds [{}, {}] are invalid",
                scheduler.min_ease_factor, scheduler.max_ease_factor
            )));
        }
        if !(scheduler.min_ease_factor..=scheduler.max_ease_factor)
            .contains(&scheduler.default_ease_factor)
        {
            return Err(EngineError::Config(
                "default ease factor lies outside the ease bounds".into(),
            ));
        }

        let session = &self.session;
        if !(0.0..=1.0).contains(&session.known_ratio) {
            return Err(EngineError::Config(format!(
                "known ratio must be within [0, 1], got {}",
                session.known_ratio
            )));
        }
        if session.analysis_window == 0 {
            return Err(EngineError::Config("analysis window must be at least 1".into()));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
