//! Read-only projection of user stats into a compact summary.
//!
//! The summary is what reporting and advice collaborators consume; it never
//! mutates the aggregate and can safely run against a stale snapshot.

use serde::Serialize;

use crate::session::SessionType;
use crate::stats::UserStats;

/// Compact, presentation-ready view of a user's aggregate record.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct InsightsSummary {
    /// Total focus time in hours, one decimal.
    pub total_focus_hours: f64,
    /// Completed sessions as a rounded percentage of all sessions.
    pub completion_rate: u8,
    pub average_focus_score: u8,
    /// Average session length in minutes.
    pub average_session_length: i64,
    pub current_streak: u32,
    pub best_hours: Vec<u8>,
    /// Average distractions per session, one decimal.
    pub distraction_rate: f64,
    pub preferred_sounds: Vec<String>,
    pub session_type_preference: SessionType,
    pub milestone_count: usize,
}

/// Rounds to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Projects a user's stats into an [`InsightsSummary`].
///
/// Pure and total: a brand-new record projects to the all-zero summary, and
/// the zero-session division guards are explicit policy, not errors.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn project(stats: &UserStats) -> InsightsSummary {
    let completion_rate = if stats.total_sessions == 0 {
        0
    } else {
        (f64::from(stats.completed_sessions) / f64::from(stats.total_sessions) * 100.0).round()
            as u8
    };

    let session_type_preference = stats
        .session_types
        .iter()
        // Strictly-greater keeps the first-declared type on ties.
        .fold(None::<(SessionType, u32)>, |best, (ty, stat)| {
            match best {
                Some((_, count)) if stat.count <= count => best,
                _ if stat.count == 0 => best,
                _ => Some((*ty, stat.count)),
            }
        })
        .map_or(SessionType::Standard, |(ty, _)| ty);

    InsightsSummary {
        total_focus_hours: round1(stats.total_focus_minutes as f64 / 60.0),
        completion_rate,
        average_focus_score: stats.average_focus_score,
        average_session_length: stats.average_session_length,
        current_streak: stats.current_streak,
        best_hours: stats.best_hours.clone(),
        distraction_rate: round1(stats.average_distractions_per_session),
        preferred_sounds: stats.preferred_sounds.clone(),
        session_type_preference,
        milestone_count: stats.milestones.len(),
    }
}
