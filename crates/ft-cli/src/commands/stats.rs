//! Stats command for showing a user's aggregate record.

use std::io::Write;

use anyhow::{Context, Result};

use ft_core::UserId;
use ft_db::Database;

/// Formats minutes as a duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are treated as 0m.
pub fn format_duration(minutes: i64) -> String {
    if minutes < 0 {
        return "0m".to_string();
    }
    let hours = minutes / 60;
    let rest = minutes % 60;

    if hours >= 1 {
        format!("{hours}h {rest}m")
    } else {
        format!("{rest}m")
    }
}

pub fn run<W: Write>(writer: &mut W, db: &Database, user: &str, json: bool) -> Result<()> {
    let user_id = UserId::new(user).context("invalid user ID")?;
    let Some((stats, _version)) = db.load_stats(&user_id)? else {
        writeln!(writer, "No stats for user {user}.")?;
        return Ok(());
    };

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&stats)?)?;
        return Ok(());
    }

    writeln!(writer, "Focus stats for {user}")?;
    writeln!(
        writer,
        "Sessions: {} ({} completed, {} abandoned)",
        stats.total_sessions, stats.completed_sessions, stats.abandoned_sessions
    )?;
    writeln!(
        writer,
        "Focus time: {} total, longest session {}",
        format_duration(stats.total_focus_minutes),
        format_duration(stats.longest_session_minutes)
    )?;
    writeln!(writer, "Average score: {}", stats.average_focus_score)?;
    writeln!(
        writer,
        "Average session: {}",
        format_duration(stats.average_session_length)
    )?;
    writeln!(
        writer,
        "Distractions: {:.1} per session",
        stats.average_distractions_per_session
    )?;
    writeln!(
        writer,
        "Streak: {} day(s), longest {}",
        stats.current_streak, stats.longest_streak
    )?;
    writeln!(
        writer,
        "Today: {}, this week: {}",
        format_duration(stats.today_minutes),
        format_duration(stats.this_week_minutes)
    )?;
    writeln!(writer, "XP from focus: {}", stats.total_xp_from_focus)?;
    writeln!(writer, "Milestones: {} unlocked", stats.milestones.len())?;

    Ok(())
}
