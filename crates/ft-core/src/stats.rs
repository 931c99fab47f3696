//! Per-user running statistics and the session-apply reducer.
//!
//! [`UserStats`] is an aggregate that is only ever advanced by folding one
//! finalized session into it — no counter is ever recomputed from full
//! history. [`apply_session`] is the single transition: it takes the current
//! state and a scored session and produces the next state plus any newly
//! unlocked milestones. It performs no I/O, so the persistence layer can
//! wrap it in an atomic read-modify-write and safely re-run it after an
//! optimistic-concurrency conflict.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hourly::{self, HourStat, fold_mean};
use crate::milestone::{self, Milestone, MilestoneKind};
use crate::session::{SessionRecord, SessionStatus, SessionType};
use crate::streak;
use crate::types::{SessionId, UserId, ValidationError};

/// Cap on remembered ambient-sound preferences.
const PREFERRED_SOUNDS_CAP: usize = 5;

/// Errors from applying a session to a user's stats.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The session has no end time yet.
    #[error("session {id} is not finalized")]
    NotFinalized { id: SessionId },

    /// The session belongs to a different user than the stats record.
    #[error("session {id} belongs to user {got}, not {expected}")]
    UserMismatch {
        id: SessionId,
        expected: UserId,
        got: UserId,
    },

    /// The session carries malformed values.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Configuration for the aggregation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AggregateConfig {
    /// Offset from UTC, in minutes, used to bucket sessions into calendar
    /// days and hours-of-day. Default: 0 (UTC). The caller supplies the
    /// user's zone offset; out-of-range values fall back to UTC.
    pub utc_offset_minutes: i64,
}

impl AggregateConfig {
    fn offset(self) -> FixedOffset {
        i32::try_from(self.utc_offset_minutes * 60)
            .ok()
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
    }

    /// Calendar date and hour-of-day of a timestamp in the configured zone.
    #[allow(clippy::cast_possible_truncation)]
    fn local_parts(self, ts: DateTime<Utc>) -> (NaiveDate, u8) {
        let local = ts.with_timezone(&self.offset());
        (local.date_naive(), local.hour() as u8)
    }
}

/// Running stats for one session type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStat {
    pub count: u32,
    /// Incrementally maintained rounded mean, 0-100.
    pub avg_score: u8,
}

/// Per-user aggregate record, upsert-created on the first applied session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: UserId,

    // Lifetime counters
    pub total_sessions: u32,
    pub completed_sessions: u32,
    pub abandoned_sessions: u32,
    pub total_focus_minutes: i64,
    pub total_distractions: u64,
    pub longest_session_minutes: i64,

    // Running averages, maintained incrementally
    pub average_session_length: i64,
    pub average_focus_score: u8,
    pub average_distractions_per_session: f64,

    // Streak state
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,

    // Hourly pattern
    #[serde(default)]
    pub hourly: BTreeMap<u8, HourStat>,
    #[serde(default)]
    pub best_hours: Vec<u8>,

    // Windowed counters
    pub today_date: Option<NaiveDate>,
    pub today_minutes: i64,
    pub week_start_date: Option<NaiveDate>,
    pub this_week_minutes: i64,

    // Session-type breakdown (tracked types only)
    #[serde(default)]
    pub session_types: BTreeMap<SessionType, TypeStat>,

    // Preferences and rewards
    #[serde(default)]
    pub preferred_sounds: Vec<String>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    pub total_xp_from_focus: i64,
}

impl UserStats {
    /// A zeroed record for a new user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            total_sessions: 0,
            completed_sessions: 0,
            abandoned_sessions: 0,
            total_focus_minutes: 0,
            total_distractions: 0,
            longest_session_minutes: 0,
            average_session_length: 0,
            average_focus_score: 0,
            average_distractions_per_session: 0.0,
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
            hourly: BTreeMap::new(),
            best_hours: Vec::new(),
            today_date: None,
            today_minutes: 0,
            week_start_date: None,
            this_week_minutes: 0,
            session_types: SessionType::TRACKED
                .iter()
                .map(|ty| (*ty, TypeStat::default()))
                .collect(),
            preferred_sounds: Vec::new(),
            milestones: Vec::new(),
            total_xp_from_focus: 0,
        }
    }

    /// Whether a milestone kind is already on the record.
    #[must_use]
    pub fn has_milestone(&self, kind: MilestoneKind) -> bool {
        self.milestones.iter().any(|m| m.kind == kind)
    }
}

/// Outcome of folding one session into a user's stats.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    /// The next state.
    pub stats: UserStats,
    /// Milestones that became unlocked by this session, with their XP.
    /// Their XP is recorded on the milestone entries but not added to
    /// `total_xp_from_focus`; awarding it is the caller's decision.
    pub unlocked: Vec<Milestone>,
}

/// Folds one finalized, scored session into a user's stats.
///
/// Pure: computes the next state from the inputs and never partially
/// applies — on any error the current state is untouched. Callers must
/// serialize invocations per user; across users, calls are independent.
/// `now` stamps `achieved_at` on newly unlocked milestones.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::too_many_lines
)]
pub fn apply_session(
    stats: &UserStats,
    session: &SessionRecord,
    config: &AggregateConfig,
    now: DateTime<Utc>,
) -> Result<ApplyResult, StatsError> {
    let actual_minutes = session
        .elapsed_minutes()
        .ok_or_else(|| StatsError::NotFinalized {
            id: session.id.clone(),
        })?;
    if session.user_id != stats.user_id {
        return Err(StatsError::UserMismatch {
            id: session.id.clone(),
            expected: stats.user_id.clone(),
            got: session.user_id.clone(),
        });
    }
    session.validate()?;

    let mut next = stats.clone();

    // Lifetime counters. Distraction count comes from the raw event
    // sequence, the one input a careless caller cannot leave stale.
    let distraction_count = session.distractions.len() as u64;
    next.total_sessions += 1;
    next.total_focus_minutes += actual_minutes;
    next.total_distractions += distraction_count;

    if session.completed {
        next.completed_sessions += 1;
    } else if session.status == SessionStatus::Abandoned {
        next.abandoned_sessions += 1;
    }

    let total = f64::from(next.total_sessions);
    next.average_session_length = (next.total_focus_minutes as f64 / total).round() as i64;
    next.average_distractions_per_session = next.total_distractions as f64 / total;

    next.longest_session_minutes = next.longest_session_minutes.max(actual_minutes);

    if let Some(score) = session.focus_score {
        next.average_focus_score = fold_mean(
            next.average_focus_score,
            u64::from(next.total_sessions - 1),
            score.value(),
        );
    }

    // Streak and windowed counters bucket by the configured zone.
    let (today, hour) = config.local_parts(session.start_time);

    let adv = streak::advance(next.current_streak, next.last_active_date, today);
    next.current_streak = adv.streak;
    next.longest_streak = next.longest_streak.max(adv.streak);
    next.last_active_date = Some(today);

    if next.today_date != Some(today) {
        next.today_date = Some(today);
        next.today_minutes = 0;
    }
    next.today_minutes += actual_minutes;

    let week_rolled = match next.week_start_date {
        None => true,
        Some(start) => (today - start).num_days() >= 7,
    };
    if week_rolled {
        next.week_start_date = Some(today);
        next.this_week_minutes = 0;
    }
    next.this_week_minutes += actual_minutes;

    // Quality-pattern tracking needs a score; an unscored session would
    // skew the running means, so it only counts toward the totals above.
    if let Some(score) = session.focus_score {
        hourly::update(&mut next.hourly, hour, actual_minutes, score);
        next.best_hours = hourly::best_hours(&next.hourly);

        if let Some(stat) = next.session_types.get_mut(&session.session_type) {
            stat.avg_score = fold_mean(stat.avg_score, u64::from(stat.count), score.value());
            stat.count += 1;
        } else {
            tracing::debug!(
                session_type = %session.session_type,
                "session type not tracked in breakdown, skipping"
            );
        }
    } else {
        tracing::debug!(session = %session.id, "unscored session, skipping pattern tracking");
    }

    for sound in &session.ambient_sounds {
        if let Some(pos) = next.preferred_sounds.iter().position(|s| s == sound) {
            // Re-adding refreshes recency.
            next.preferred_sounds.remove(pos);
        }
        next.preferred_sounds.push(sound.clone());
    }
    while next.preferred_sounds.len() > PREFERRED_SOUNDS_CAP {
        next.preferred_sounds.remove(0);
    }

    next.total_xp_from_focus += session.xp_earned.unwrap_or(0);

    let unlocked: Vec<Milestone> = milestone::evaluate(&next)
        .into_iter()
        .map(|kind| Milestone {
            kind,
            achieved_at: now,
            xp_awarded: milestone::xp_for(kind),
        })
        .collect();
    next.milestones.extend(unlocked.iter().cloned());

    tracing::debug!(
        user = %next.user_id,
        session = %session.id,
        total_sessions = next.total_sessions,
        unlocked = unlocked.len(),
        "applied session"
    );

    Ok(ApplyResult {
        stats: next,
        unlocked,
    })
}
