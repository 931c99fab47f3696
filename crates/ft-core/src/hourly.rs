//! Per-hour focus pattern tracking.
//!
//! Maintains a running stat per hour-of-day and ranks the user's best hours.
//! An hour only enters the ranking once it has enough samples, so a single
//! lucky session cannot dominate the signal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::FocusScore;

/// Sessions required before an hour qualifies for the best-hours ranking.
pub const MIN_SESSIONS_FOR_RANKING: u32 = 3;

/// Number of hours reported as "best".
const BEST_HOURS_LIMIT: usize = 3;

/// Running stats for one hour-of-day bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourStat {
    pub total_minutes: i64,
    pub session_count: u32,
    /// Incrementally maintained rounded mean, 0-100.
    pub avg_focus_score: u8,
}

/// Folds one sample into a rounded running mean.
///
/// The prior average is weighted by the pre-increment sample count, matching
/// how the average was produced; re-deriving the weight from a post-increment
/// count would double-count the new sample.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn fold_mean(prior_avg: u8, prior_count: u64, sample: u8) -> u8 {
    let total = f64::from(prior_avg) * (prior_count as f64) + f64::from(sample);
    (total / (prior_count + 1) as f64).round() as u8
}

/// Folds one session into the hour bucket for its start hour.
pub fn update(stats: &mut BTreeMap<u8, HourStat>, hour: u8, minutes: i64, score: FocusScore) {
    debug_assert!(hour < 24, "hour-of-day out of range: {hour}");
    let stat = stats.entry(hour).or_default();
    stat.total_minutes += minutes;
    stat.avg_focus_score = fold_mean(
        stat.avg_focus_score,
        u64::from(stat.session_count),
        score.value(),
    );
    stat.session_count += 1;
}

/// Ranks the best hours by average focus score.
///
/// Hours with fewer than [`MIN_SESSIONS_FOR_RANKING`] sessions are excluded.
/// Ties break toward the hour with more sessions, then the earlier hour.
#[must_use]
pub fn best_hours(stats: &BTreeMap<u8, HourStat>) -> Vec<u8> {
    let mut ranked: Vec<(u8, HourStat)> = stats
        .iter()
        .filter(|(_, stat)| stat.session_count >= MIN_SESSIONS_FOR_RANKING)
        .map(|(hour, stat)| (*hour, *stat))
        .collect();

    ranked.sort_by(|(hour_a, a), (hour_b, b)| {
        b.avg_focus_score
            .cmp(&a.avg_focus_score)
            .then(b.session_count.cmp(&a.session_count))
            .then(hour_a.cmp(hour_b))
    });

    ranked
        .into_iter()
        .take(BEST_HOURS_LIMIT)
        .map(|(hour, _)| hour)
        .collect()
}
