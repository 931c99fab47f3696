//! End-to-end integration tests for the ingest -> stats -> insights flow.
//!
//! Drives the built `ft` binary against a temp database.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn ft_binary() -> String {
    env!("CARGO_BIN_EXE_ft").to_string()
}

fn ft_command(temp: &Path) -> Command {
    let mut cmd = Command::new(ft_binary());
    cmd.env("HOME", temp)
        .env("FT_DATABASE_PATH", temp.join("ft.db"))
        .env("FT_UTC_OFFSET_MINUTES", "0");
    cmd
}

const SESSIONS: &str = concat!(
    r#"{"id":"sess-1","user_id":"user-1","start_time":"2025-03-10T09:00:00Z","end_time":"2025-03-10T09:25:00Z","planned_minutes":25,"status":"completed","completed":true,"session_type":"standard","ambient_sounds":["rain"]}"#,
    "\n",
    r#"{"id":"sess-2","user_id":"user-1","start_time":"2025-03-11T09:00:00Z","end_time":"2025-03-11T09:50:00Z","planned_minutes":50,"status":"completed","completed":true,"session_type":"deep_work"}"#,
    "\n",
);

#[test]
fn ingest_then_stats_reports_aggregates() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("sessions.jsonl");
    std::fs::write(&input, SESSIONS).unwrap();

    let output = ft_command(temp.path())
        .arg("ingest")
        .arg(&input)
        .output()
        .expect("failed to run ft ingest");
    assert!(
        output.status.success(),
        "ingest should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Done: 2 applied, 0 skipped, 0 failed."));
    assert!(stdout.contains("Unlocked first_session (+50 XP)"));
    assert!(stdout.contains("Unlocked one_hour_total (+50 XP)"));

    let output = ft_command(temp.path())
        .arg("stats")
        .arg("--user")
        .arg("user-1")
        .arg("--json")
        .output()
        .expect("failed to run ft stats");
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total_sessions"], 2);
    assert_eq!(stats["total_focus_minutes"], 75);
    assert_eq!(stats["current_streak"], 2);
    assert_eq!(stats["average_focus_score"], 100);
}

#[test]
fn reingesting_does_not_double_count() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("sessions.jsonl");
    std::fs::write(&input, SESSIONS).unwrap();

    for _ in 0..2 {
        let output = ft_command(temp.path())
            .arg("ingest")
            .arg(&input)
            .output()
            .unwrap();
        assert!(output.status.success());
    }

    let output = ft_command(temp.path())
        .arg("stats")
        .arg("--user")
        .arg("user-1")
        .arg("--json")
        .output()
        .unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total_sessions"], 2);
    assert_eq!(stats["total_xp_from_focus"], 0);
}

#[test]
fn insights_for_unknown_user_is_all_zero() {
    let temp = TempDir::new().unwrap();

    let output = ft_command(temp.path())
        .arg("insights")
        .arg("--user")
        .arg("ghost")
        .arg("--json")
        .output()
        .expect("failed to run ft insights");
    assert!(
        output.status.success(),
        "insights should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["completion_rate"], 0);
    assert_eq!(summary["milestone_count"], 0);
    assert_eq!(summary["session_type_preference"], "standard");
}

#[test]
fn status_lists_ingested_users() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("sessions.jsonl");
    std::fs::write(&input, SESSIONS).unwrap();

    let output = ft_command(temp.path())
        .arg("ingest")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = ft_command(temp.path()).arg("status").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Users:"));
    assert!(stdout.contains("- user-1: 2 session(s)"));
}
