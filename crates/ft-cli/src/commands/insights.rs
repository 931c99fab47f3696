//! Insights command: project a user's stats into the summary view.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use ft_core::{InsightsSummary, UserId, project};
use ft_db::Database;

use super::stats::format_duration;

/// JSON report wrapper recording which timezone governed hour bucketing.
#[derive(Debug, Serialize)]
struct InsightsReport<'a> {
    timezone: String,
    utc_offset_minutes: i64,
    #[serde(flatten)]
    summary: &'a InsightsSummary,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &str,
    utc_offset_minutes: i64,
    json: bool,
) -> Result<()> {
    let user_id = UserId::new(user).context("invalid user ID")?;
    // A user without stats gets the all-zero summary, not an error.
    let summary = db
        .load_stats(&user_id)?
        .map_or_else(InsightsSummary::default, |(stats, _)| project(&stats));

    if json {
        let report = InsightsReport {
            timezone: iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string()),
            utc_offset_minutes,
            summary: &summary,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    writeln!(writer, "Insights for {user}")?;
    writeln!(writer, "Total focus: {:.1}h", summary.total_focus_hours)?;
    writeln!(writer, "Completion rate: {}%", summary.completion_rate)?;
    writeln!(writer, "Average score: {}", summary.average_focus_score)?;
    writeln!(
        writer,
        "Average session: {}",
        format_duration(summary.average_session_length)
    )?;
    writeln!(writer, "Current streak: {} day(s)", summary.current_streak)?;
    if summary.best_hours.is_empty() {
        writeln!(writer, "Best hours: not enough data yet")?;
    } else {
        let hours: Vec<String> = summary
            .best_hours
            .iter()
            .map(|h| format!("{h:02}:00"))
            .collect();
        writeln!(writer, "Best hours: {}", hours.join(", "))?;
    }
    writeln!(
        writer,
        "Distraction rate: {:.1} per session",
        summary.distraction_rate
    )?;
    if !summary.preferred_sounds.is_empty() {
        writeln!(
            writer,
            "Preferred sounds: {}",
            summary.preferred_sounds.join(", ")
        )?;
    }
    writeln!(
        writer,
        "Preferred session type: {}",
        summary.session_type_preference
    )?;
    writeln!(writer, "Milestones: {}", summary.milestone_count)?;

    Ok(())
}
