//! Focus session records.
//!
//! A [`SessionRecord`] is one timed focus attempt by a user. It is created
//! when the session starts, accumulates breaks and distraction events while
//! active, and is finalized exactly once when `end_time` is set. The derived
//! aggregates (`actual_minutes`, `total_break_minutes`, `total_distractions`,
//! `focus_score`) are recomputed on finalization and never hand-set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Confidence, FocusScore, SessionId, UserId, ValidationError};

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Abandoned,
}

impl SessionStatus {
    /// Returns the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(ValidationError::InvalidVariant {
                field: "session status",
                value: s.to_string(),
            }),
        }
    }
}

/// Kind of session, by intended length/depth.
///
/// Variant order matters: the session-type breakdown and the insights
/// preference tie-break both follow declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Quick,
    #[default]
    Standard,
    DeepWork,
    Ultra,
    /// User-defined session shape; excluded from the per-type breakdown.
    Custom,
}

impl SessionType {
    /// The session types tracked in the per-type breakdown.
    pub const TRACKED: [Self; 4] = [Self::Quick, Self::Standard, Self::DeepWork, Self::Ultra];

    /// Returns the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Standard => "standard",
            Self::DeepWork => "deep_work",
            Self::Ultra => "ultra",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(Self::Quick),
            "standard" => Ok(Self::Standard),
            "deep_work" => Ok(Self::DeepWork),
            "ultra" => Ok(Self::Ultra),
            "custom" => Ok(Self::Custom),
            _ => Err(ValidationError::InvalidVariant {
                field: "session type",
                value: s.to_string(),
            }),
        }
    }
}

/// Why a break was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    Scheduled,
    Manual,
    Distraction,
}

/// How a distraction event was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistractionResolution {
    Dismissed,
    TookBreak,
    PlayedGame,
    Ignored,
}

/// An interruption within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Break {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    pub kind: BreakKind,
}

/// An already-classified distraction observed during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistractionEvent {
    pub timestamp: DateTime<Utc>,
    /// Classifier confidence; clamped to \[0, 1\] on deserialization.
    #[serde(default)]
    pub confidence: Confidence,
    pub duration_seconds: i64,
    pub resolution: DistractionResolution,
}

/// One attempted focus session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Planned duration in minutes.
    pub planned_minutes: i64,
    /// Actual duration in minutes, stamped at finalize time from
    /// `end_time - start_time`. `None` until the session ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_minutes: Option<i64>,
    #[serde(default)]
    pub status: SessionStatus,
    /// Set by the caller when the user finished the session intentionally.
    /// Independent of whether the planned duration was reached.
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub breaks: Vec<Break>,
    #[serde(default)]
    pub distractions: Vec<DistractionEvent>,
    /// Derived: sum of break durations. Stamped at finalize time.
    #[serde(default)]
    pub total_break_minutes: i64,
    /// Derived: count of distraction events. Stamped at finalize time.
    #[serde(default)]
    pub total_distractions: u32,
    /// Derived: quality score. Stamped at finalize time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_score: Option<FocusScore>,
    #[serde(default)]
    pub session_type: SessionType,
    #[serde(default)]
    pub ambient_sounds: Vec<String>,
    /// XP granted for this session by the caller, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_earned: Option<i64>,
}

impl SessionRecord {
    /// Elapsed minutes between start and end, rounded to the nearest minute.
    ///
    /// `None` until `end_time` is set. Negative when the record carries an
    /// end before its start; [`validate`](Self::validate) rejects that.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn elapsed_minutes(&self) -> Option<i64> {
        let end = self.end_time?;
        let seconds = (end - self.start_time).num_seconds();
        Some((seconds as f64 / 60.0).round() as i64)
    }

    /// Checks the record for malformed values.
    ///
    /// Rejects negative planned/elapsed durations, negative break and
    /// distraction durations, and negative XP.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.planned_minutes < 0 {
            return Err(ValidationError::Negative {
                field: "planned_minutes",
                value: self.planned_minutes,
            });
        }
        if let Some(elapsed) = self.elapsed_minutes() {
            if elapsed < 0 {
                return Err(ValidationError::Negative {
                    field: "elapsed minutes",
                    value: elapsed,
                });
            }
        }
        for brk in &self.breaks {
            if brk.duration_minutes < 0 {
                return Err(ValidationError::Negative {
                    field: "break duration_minutes",
                    value: brk.duration_minutes,
                });
            }
        }
        for distraction in &self.distractions {
            if distraction.duration_seconds < 0 {
                return Err(ValidationError::Negative {
                    field: "distraction duration_seconds",
                    value: distraction.duration_seconds,
                });
            }
        }
        if let Some(xp) = self.xp_earned {
            if xp < 0 {
                return Err(ValidationError::Negative {
                    field: "xp_earned",
                    value: xp,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_session() -> SessionRecord {
        SessionRecord {
            id: SessionId::new("sess-1").unwrap(),
            user_id: UserId::new("user-1").unwrap(),
            start_time: Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
            end_time: Some(Utc.with_ymd_and_hms(2025, 3, 10, 9, 25, 0).unwrap()),
            planned_minutes: 25,
            actual_minutes: None,
            status: SessionStatus::Completed,
            completed: true,
            breaks: Vec::new(),
            distractions: Vec::new(),
            total_break_minutes: 0,
            total_distractions: 0,
            focus_score: None,
            session_type: SessionType::Standard,
            ambient_sounds: Vec::new(),
            xp_earned: None,
        }
    }

    #[test]
    fn elapsed_minutes_rounds_to_nearest() {
        let mut session = base_session();
        session.end_time = Some(Utc.with_ymd_and_hms(2025, 3, 10, 9, 25, 29).unwrap());
        assert_eq!(session.elapsed_minutes(), Some(25));

        session.end_time = Some(Utc.with_ymd_and_hms(2025, 3, 10, 9, 25, 30).unwrap());
        assert_eq!(session.elapsed_minutes(), Some(26));
    }

    #[test]
    fn elapsed_minutes_none_until_finalized() {
        let mut session = base_session();
        session.end_time = None;
        assert_eq!(session.elapsed_minutes(), None);
    }

    #[test]
    fn validate_rejects_end_before_start() {
        let mut session = base_session();
        session.end_time = Some(Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap());
        assert!(matches!(
            session.validate(),
            Err(ValidationError::Negative { field: "elapsed minutes", .. })
        ));
    }

    #[test]
    fn validate_rejects_negative_planned_duration() {
        let mut session = base_session();
        session.planned_minutes = -5;
        assert!(session.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_xp() {
        let mut session = base_session();
        session.xp_earned = Some(-10);
        assert!(session.validate().is_err());
    }

    #[test]
    fn session_type_roundtrip() {
        for ty in [
            SessionType::Quick,
            SessionType::Standard,
            SessionType::DeepWork,
            SessionType::Ultra,
            SessionType::Custom,
        ] {
            let s = ty.as_str();
            let parsed: SessionType = s.parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn session_status_roundtrip() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Paused,
            SessionStatus::Completed,
            SessionStatus::Abandoned,
        ] {
            let s = status.as_str();
            let parsed: SessionStatus = s.parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn session_type_serde_matches_as_str() {
        // Serde serialization must match as_str() so JSON export and DB
        // storage stay consistent.
        for ty in [
            SessionType::Quick,
            SessionType::Standard,
            SessionType::DeepWork,
            SessionType::Ultra,
            SessionType::Custom,
        ] {
            let serde_value = serde_json::to_value(ty).unwrap();
            assert_eq!(serde_value.as_str().unwrap(), ty.as_str());
        }
    }

    #[test]
    fn session_record_deserializes_with_defaults() {
        let json = r#"{
            "id": "sess-9",
            "user_id": "user-9",
            "start_time": "2025-03-10T09:00:00Z",
            "planned_minutes": 25
        }"#;
        let session: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.session_type, SessionType::Standard);
        assert!(!session.completed);
        assert!(session.breaks.is_empty());
        assert_eq!(session.end_time, None);
    }
}
