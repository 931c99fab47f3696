//! Core domain logic for the focus tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Scoring: computing a 0-100 quality score for a finalized session
//! - Aggregation: folding sessions into per-user running statistics
//! - Milestones: idempotent rule-based achievement unlocking
//! - Insights: projecting the aggregate into a compact summary
//!
//! Everything here is pure; persistence and timezone discovery live with
//! the callers.

pub mod hourly;
pub mod insights;
pub mod milestone;
pub mod score;
pub mod session;
pub mod stats;
pub mod streak;
pub mod types;

pub use hourly::{HourStat, MIN_SESSIONS_FOR_RANKING, best_hours};
pub use insights::{InsightsSummary, project};
pub use milestone::{Milestone, MilestoneKind};
pub use score::{ScoreError, focus_score, score_session};
pub use session::{
    Break, BreakKind, DistractionEvent, DistractionResolution, SessionRecord, SessionStatus,
    SessionType,
};
pub use stats::{AggregateConfig, ApplyResult, StatsError, TypeStat, UserStats, apply_session};
pub use streak::{StreakAdvance, advance};
pub use types::{Confidence, FocusScore, SessionId, UserId, ValidationError};
