//! Consecutive-day streak tracking.

use chrono::NaiveDate;

/// Result of advancing a streak for a new active day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakAdvance {
    /// The streak after the advance.
    pub streak: u32,
    /// Whether the streak grew (first day or one day after the last).
    pub increased: bool,
}

/// Advances a consecutive-calendar-day streak.
///
/// Both inputs are calendar dates, already normalized to day granularity —
/// differencing whole dates side-steps daylight-saving drift that naive
/// timestamp subtraction would hit. The caller updates `longest_streak`
/// from the returned value and must not call twice for the same day
/// expecting an increment.
#[must_use]
pub fn advance(current_streak: u32, last_active: Option<NaiveDate>, today: NaiveDate) -> StreakAdvance {
    let Some(last) = last_active else {
        return StreakAdvance {
            streak: 1,
            increased: true,
        };
    };

    match (today - last).num_days() {
        // Same calendar day: no-op.
        0 => StreakAdvance {
            streak: current_streak,
            increased: false,
        },
        1 => StreakAdvance {
            streak: current_streak + 1,
            increased: true,
        },
        days if days > 1 => StreakAdvance {
            streak: 1,
            increased: false,
        },
        // Out-of-order session from an earlier day: keep the streak.
        _ => StreakAdvance {
            streak: current_streak,
            increased: false,
        },
    }
}
