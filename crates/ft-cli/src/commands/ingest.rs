//! Ingest command: score finalized sessions and fold them into user stats.
//!
//! Accepts either a single session object or a JSONL batch. Batch lines are
//! parsed in parallel; malformed lines are skipped with a warning rather
//! than failing the whole batch. Sessions are applied oldest-first so
//! streaks and rollovers see days in order.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rayon::prelude::*;

use ft_core::{AggregateConfig, SessionRecord, score_session};
use ft_db::{Database, DbError};

/// Parses one session value, filling in a fresh ID when none was sent.
fn session_from_value(mut value: serde_json::Value) -> Result<SessionRecord, serde_json::Error> {
    if let Some(map) = value.as_object_mut() {
        let missing_id = match map.get("id") {
            None | Some(serde_json::Value::Null) => true,
            Some(_) => false,
        };
        if missing_id {
            map.insert(
                "id".to_string(),
                serde_json::Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
    }
    serde_json::from_value(value)
}

/// Parses input as a single session object or a JSONL batch.
fn parse_sessions(input: &str) -> Vec<SessionRecord> {
    // Single pretty-printed object first; otherwise one object per line.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(input) {
        if value.is_object() {
            match session_from_value(value) {
                Ok(session) => return vec![session],
                Err(error) => {
                    tracing::warn!(%error, "skipping malformed session");
                    return Vec::new();
                }
            }
        }
    }

    input
        .par_lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let value: serde_json::Value = match serde_json::from_str(line) {
                Ok(value) => value,
                Err(error) => {
                    tracing::warn!(%error, "skipping malformed JSON line");
                    return None;
                }
            };
            match session_from_value(value) {
                Ok(session) => Some(session),
                Err(error) => {
                    tracing::warn!(%error, "skipping malformed session");
                    None
                }
            }
        })
        .collect()
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    path: &Path,
    config: &AggregateConfig,
) -> Result<()> {
    let input = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };

    let mut sessions = parse_sessions(&input);
    if sessions.is_empty() {
        writeln!(writer, "No sessions found in input.")?;
        return Ok(());
    }
    sessions.sort_by_key(|s| s.start_time);

    let mut applied = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for session in &sessions {
        // Score at the finalize boundary; already-scored records keep
        // their stamped score recomputed for consistency.
        let scored = match score_session(session) {
            Ok(scored) => scored,
            Err(error) => {
                tracing::warn!(session = %session.id, %error, "cannot score session");
                failed += 1;
                continue;
            }
        };

        match db.apply_session(&scored, config, Utc::now()) {
            Ok(outcome) if outcome.newly_ingested => {
                applied += 1;
                writeln!(
                    writer,
                    "Applied session {} for {} (score {})",
                    scored.id,
                    scored.user_id,
                    scored.focus_score.map_or(0, ft_core::FocusScore::value),
                )?;
                for milestone in &outcome.unlocked {
                    writeln!(
                        writer,
                        "  Unlocked {} (+{} XP)",
                        milestone.kind, milestone.xp_awarded
                    )?;
                }
            }
            Ok(_) => {
                skipped += 1;
                writeln!(writer, "Skipped session {} (already ingested)", scored.id)?;
            }
            Err(DbError::Stats(error)) => {
                tracing::warn!(session = %scored.id, %error, "session rejected");
                failed += 1;
            }
            Err(error) => return Err(error).context("failed to apply session"),
        }
    }

    writeln!(
        writer,
        "Done: {applied} applied, {skipped} skipped, {failed} failed."
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_object() {
        let input = r#"{
            "id": "sess-1",
            "user_id": "user-1",
            "start_time": "2025-03-10T09:00:00Z",
            "end_time": "2025-03-10T09:25:00Z",
            "planned_minutes": 25,
            "status": "completed",
            "completed": true
        }"#;
        let sessions = parse_sessions(input);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id.as_str(), "sess-1");
    }

    #[test]
    fn parse_jsonl_skips_malformed_lines() {
        let input = concat!(
            r#"{"id":"sess-1","user_id":"u","start_time":"2025-03-10T09:00:00Z","end_time":"2025-03-10T09:25:00Z","planned_minutes":25,"status":"completed","completed":true}"#,
            "\n",
            "{not json}\n",
            r#"{"id":"sess-2","user_id":"u","start_time":"2025-03-11T09:00:00Z","end_time":"2025-03-11T09:25:00Z","planned_minutes":25,"status":"completed","completed":true}"#,
            "\n",
        );
        let mut sessions = parse_sessions(input);
        sessions.sort_by_key(|s| s.start_time);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1].id.as_str(), "sess-2");
    }

    #[test]
    fn missing_id_gets_generated() {
        let input = r#"{"user_id":"u","start_time":"2025-03-10T09:00:00Z","end_time":"2025-03-10T09:25:00Z","planned_minutes":25,"status":"completed"}"#;
        let sessions = parse_sessions(input);
        assert_eq!(sessions.len(), 1);
        assert!(!sessions[0].id.as_str().is_empty());
    }

    #[test]
    fn ingest_end_to_end_applies_and_dedups() {
        let mut db = Database::open_in_memory().unwrap();
        let config = AggregateConfig::default();
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("sessions.jsonl");
        std::fs::write(
            &file,
            r#"{"id":"sess-1","user_id":"user-1","start_time":"2025-03-10T09:00:00Z","end_time":"2025-03-10T09:25:00Z","planned_minutes":25,"status":"completed","completed":true}"#,
        )
        .unwrap();

        let mut output = Vec::new();
        run(&mut output, &mut db, &file, &config).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Applied session sess-1 for user-1 (score 100)"));
        assert!(text.contains("Unlocked first_session (+50 XP)"));
        assert!(text.contains("Done: 1 applied, 0 skipped, 0 failed."));

        // Re-ingesting the same file is a no-op.
        let mut output = Vec::new();
        run(&mut output, &mut db, &file, &config).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Skipped session sess-1"));
        assert!(text.contains("Done: 0 applied, 1 skipped, 0 failed."));
    }

    #[test]
    fn unfinalized_session_counts_as_failed() {
        let mut db = Database::open_in_memory().unwrap();
        let config = AggregateConfig::default();
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("session.json");
        std::fs::write(
            &file,
            r#"{"id":"sess-1","user_id":"user-1","start_time":"2025-03-10T09:00:00Z","planned_minutes":25}"#,
        )
        .unwrap();

        let mut output = Vec::new();
        run(&mut output, &mut db, &file, &config).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Done: 0 applied, 0 skipped, 1 failed."));
    }
}
