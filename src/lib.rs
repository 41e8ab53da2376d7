//! # letter-mastery - 字母学习核心引擎
//!
//! 本 crate 提供纯 Rust 实现的幼儿书写学习算法:
//!
//! - **Path sampling** - 将 SVG 路径语法的笔画转换为采样点
//! - **Corridor validation** - 判断描写是否沿字母轨迹
//! - **Spaced repetition** - 简化 SM-2，前几次复习使用固定间隔
//! - **Adaptive difficulty** - 根据最近作答给出进阶/保持/退回建议
//! - **Progress state machine** - 每个字母的四个学习阶段与解锁
//!
//! ## 设计理念
//!
//! - **无全局状态** - 所有操作都作用于调用方传入的状态
//! - **不读时钟** - 日期由调用方以 `today` 传入
//!
//! ## 模块结构
//!
//! - [`path`] - 路径解析、采样、降采样
//! - [`corridor`] - 描写验证
//! - [`scoring`] - 星级、掌握度增量、阶段规则、练习小结
//! - [`scheduler`] - 复习间隔与复习队列
//! - [`adaptive`] - 表现分析与练习组合
//! - [`progress`] - 字母进度记录
//! - [`catalog`] - 内置字母形状
//! - [`store`] - 持久化数据布局
//! - [`sanitize`] - 加载数据的修复
//! - [`engine`] - 组合各模块的门面
//!
//! ## 使用示例
//!
//! ```rust
//! use chrono::NaiveDate;
//! use letter_mastery::{MasteryEngine, ProgressBook};
//!
//! let engine = MasteryEngine::with_defaults().unwrap();
//! let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
//! let mut book = ProgressBook::initial(engine.catalog(), today);
//!
//! let drawn = vec![engine.target_points("E").unwrap().to_vec()];
//! let outcome = engine.check_trace(&mut book, "E", &drawn, 2500, today).unwrap();
//! assert!(outcome.verdict.passed);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub mod adaptive;
pub mod catalog;
pub mod corridor;
pub mod engine;
pub mod path;
pub mod progress;
pub mod sanitize;
pub mod scheduler;
pub mod scoring;
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use config::{ArcSampling, EngineConfig, SchedulerConfig, SessionConfig, TraceConfig};
pub use error::{EngineError, EngineResult, ProgressError};

pub use path::{downsample, parse_path, PathCommand, PathSampler};

pub use corridor::{trace_stars, CorridorValidator, TraceVerdict};

pub use scoring::{
    can_advance_stage, can_unlock_next, mastery_gain, session_summary, stars_from_score,
    Encouragement, SessionSummary,
};

pub use scheduler::{AttemptOutcome, Quality, ReviewUpdate, SpacedRepetitionScheduler};

pub use adaptive::{
    analyze_recent, should_advance_to_next_group, should_retreat_to_previous_group,
    trailing_consecutive_correct, PerformanceAnalysis, Recommendation, SessionLog, SessionPlan,
    SessionPlanner, Trend,
};

pub use progress::{ProgressBook, StageTransition};

pub use catalog::{LetterCatalog, StrokeDirection, TracePath, TraceStroke};

pub use store::{ChildProfile, DailySession, GameScore, ProgressStore};

pub use engine::{MasteryEngine, TraceOutcome};
