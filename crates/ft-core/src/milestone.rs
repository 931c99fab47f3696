//! Rule-based milestone unlocking.
//!
//! The rule table below is the single authoritative source for milestone
//! thresholds and XP values; renderers only display what the engine emits.
//! Evaluation is idempotent: a kind already present on the user's record is
//! never emitted again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::UserStats;
use crate::types::ValidationError;

/// A one-time-unlockable achievement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    FirstSession,
    TenSessions,
    FiftySessions,
    HundredSessions,
    OneHourTotal,
    TenHoursTotal,
    FiftyHoursTotal,
    HundredHoursTotal,
    ThreeDayStreak,
    SevenDayStreak,
    ThirtyDayStreak,
}

impl MilestoneKind {
    /// Returns the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FirstSession => "first_session",
            Self::TenSessions => "ten_sessions",
            Self::FiftySessions => "fifty_sessions",
            Self::HundredSessions => "hundred_sessions",
            Self::OneHourTotal => "one_hour_total",
            Self::TenHoursTotal => "ten_hours_total",
            Self::FiftyHoursTotal => "fifty_hours_total",
            Self::HundredHoursTotal => "hundred_hours_total",
            Self::ThreeDayStreak => "three_day_streak",
            Self::SevenDayStreak => "seven_day_streak",
            Self::ThirtyDayStreak => "thirty_day_streak",
        }
    }
}

impl std::fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MilestoneKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_session" => Ok(Self::FirstSession),
            "ten_sessions" => Ok(Self::TenSessions),
            "fifty_sessions" => Ok(Self::FiftySessions),
            "hundred_sessions" => Ok(Self::HundredSessions),
            "one_hour_total" => Ok(Self::OneHourTotal),
            "ten_hours_total" => Ok(Self::TenHoursTotal),
            "fifty_hours_total" => Ok(Self::FiftyHoursTotal),
            "hundred_hours_total" => Ok(Self::HundredHoursTotal),
            "three_day_streak" => Ok(Self::ThreeDayStreak),
            "seven_day_streak" => Ok(Self::SevenDayStreak),
            "thirty_day_streak" => Ok(Self::ThirtyDayStreak),
            _ => Err(ValidationError::InvalidVariant {
                field: "milestone kind",
                value: s.to_string(),
            }),
        }
    }
}

/// An unlocked milestone on a user's record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub achieved_at: DateTime<Utc>,
    /// XP value from the rule table. Recorded here for display; the caller
    /// decides when and where to award it.
    pub xp_awarded: i64,
}

/// Which counter a milestone threshold reads.
#[derive(Debug, Clone, Copy)]
enum Threshold {
    TotalSessions(u32),
    TotalFocusMinutes(i64),
    CurrentStreak(u32),
}

impl Threshold {
    const fn met(self, stats: &UserStats) -> bool {
        match self {
            Self::TotalSessions(n) => stats.total_sessions >= n,
            Self::TotalFocusMinutes(n) => stats.total_focus_minutes >= n,
            Self::CurrentStreak(n) => stats.current_streak >= n,
        }
    }
}

struct Rule {
    kind: MilestoneKind,
    threshold: Threshold,
    xp: i64,
}

/// The milestone rule table, evaluated in order.
const RULES: [Rule; 11] = [
    Rule {
        kind: MilestoneKind::FirstSession,
        threshold: Threshold::TotalSessions(1),
        xp: 50,
    },
    Rule {
        kind: MilestoneKind::TenSessions,
        threshold: Threshold::TotalSessions(10),
        xp: 100,
    },
    Rule {
        kind: MilestoneKind::FiftySessions,
        threshold: Threshold::TotalSessions(50),
        xp: 250,
    },
    Rule {
        kind: MilestoneKind::HundredSessions,
        threshold: Threshold::TotalSessions(100),
        xp: 500,
    },
    Rule {
        kind: MilestoneKind::OneHourTotal,
        threshold: Threshold::TotalFocusMinutes(60),
        xp: 50,
    },
    Rule {
        kind: MilestoneKind::TenHoursTotal,
        threshold: Threshold::TotalFocusMinutes(600),
        xp: 200,
    },
    Rule {
        kind: MilestoneKind::FiftyHoursTotal,
        threshold: Threshold::TotalFocusMinutes(3000),
        xp: 500,
    },
    Rule {
        kind: MilestoneKind::HundredHoursTotal,
        threshold: Threshold::TotalFocusMinutes(6000),
        xp: 1000,
    },
    Rule {
        kind: MilestoneKind::ThreeDayStreak,
        threshold: Threshold::CurrentStreak(3),
        xp: 75,
    },
    Rule {
        kind: MilestoneKind::SevenDayStreak,
        threshold: Threshold::CurrentStreak(7),
        xp: 150,
    },
    Rule {
        kind: MilestoneKind::ThirtyDayStreak,
        threshold: Threshold::CurrentStreak(30),
        xp: 500,
    },
];

/// Returns the XP value a milestone kind awards.
#[must_use]
pub fn xp_for(kind: MilestoneKind) -> i64 {
    RULES
        .iter()
        .find(|rule| rule.kind == kind)
        .map_or(0, |rule| rule.xp)
}

/// Evaluates the rule table against the current counters.
///
/// Returns the kinds that qualify and are not already on the record, in
/// table order. Does not mutate; a single aggregation step can cross several
/// thresholds at once and all of them are returned together.
#[must_use]
pub fn evaluate(stats: &UserStats) -> Vec<MilestoneKind> {
    RULES
        .iter()
        .filter(|rule| !stats.has_milestone(rule.kind))
        .filter(|rule| rule.threshold.met(stats))
        .map(|rule| rule.kind)
        .collect()
}
