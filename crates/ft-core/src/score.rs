//! Focus score calculation and session finalization.
//!
//! # Algorithm Summary
//!
//! Scoring starts from 100 and applies, in order:
//!
//! 1. Completion penalty: up to 30 points for stopping short of the plan,
//!    proportional to the missing fraction
//! 2. Distraction penalty: 5 points per distraction, capped at 25
//! 3. Break-overage penalty: breaks above 20% of the session draw
//!    50 points per unit of excess ratio
//! 4. Completion bonus: +10 for an intentionally completed session that
//!    reached its planned duration
//!
//! The result is clamped to \[0, 100\].

use thiserror::Error;

use crate::session::SessionRecord;
use crate::types::{FocusScore, SessionId, ValidationError};

/// Breaks above this fraction of the session start drawing a penalty.
const BREAK_RATIO_ALLOWANCE: f64 = 0.2;

/// Maximum total distraction penalty.
const MAX_DISTRACTION_PENALTY: i64 = 25;

/// Errors from scoring a session.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// The session has no end time yet.
    #[error("session {id} is not finalized")]
    NotFinalized { id: SessionId },

    /// The session carries malformed values.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Computes the quality score for a finalized session.
///
/// Pure: reads the raw break/distraction sequences, never the stamped
/// aggregates, so a stale or hand-set aggregate cannot skew the result.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]
pub fn focus_score(session: &SessionRecord) -> Result<FocusScore, ScoreError> {
    let actual = session
        .elapsed_minutes()
        .ok_or_else(|| ScoreError::NotFinalized {
            id: session.id.clone(),
        })?;
    session.validate()?;

    let total_break_minutes: i64 = session.breaks.iter().map(|b| b.duration_minutes).sum();
    let distraction_count = session.distractions.len() as i64;

    let mut score: i64 = 100;

    if actual < session.planned_minutes {
        let ratio = actual as f64 / session.planned_minutes as f64;
        score -= ((1.0 - ratio) * 30.0).round() as i64;
    }

    score -= (distraction_count * 5).min(MAX_DISTRACTION_PENALTY);

    // A zero-length session has no meaningful break ratio; no penalty.
    let break_ratio = if actual == 0 {
        0.0
    } else {
        total_break_minutes as f64 / actual as f64
    };
    if break_ratio > BREAK_RATIO_ALLOWANCE {
        score -= ((break_ratio - BREAK_RATIO_ALLOWANCE) * 50.0).round() as i64;
    }

    if session.completed && actual >= session.planned_minutes {
        score += 10;
    }

    Ok(FocusScore::clamped(score))
}

/// Finalizes a session: recomputes the derived aggregates and the score.
///
/// Returns a copy of the record with `actual_minutes`,
/// `total_break_minutes`, `total_distractions`, and `focus_score`
/// overwritten. Called once by the session-lifecycle collaborator when
/// `end_time` is set, before persistence. Fails if the session has no end
/// time or carries malformed values; the input is untouched on failure.
#[allow(clippy::cast_possible_truncation)]
pub fn score_session(session: &SessionRecord) -> Result<SessionRecord, ScoreError> {
    let score = focus_score(session)?;

    let mut scored = session.clone();
    scored.actual_minutes = scored.elapsed_minutes();
    scored.total_break_minutes = scored.breaks.iter().map(|b| b.duration_minutes).sum();
    scored.total_distractions = scored.distractions.len() as u32;
    scored.focus_score = Some(score);
    Ok(scored)
}
