//! CLI end-to-end tests
//!
//! Tests for the playout command-line interface.

use assert_cmd::prelude::*;
use chrono::{Duration, TimeZone, Utc};
use playout_common::{ChannelId, Ingest, Output};
use playout_db::models::{NewChannel, NewProgramme, NewScheduleEntry};
use playout_db::{get_conn, init_pool, queries};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the playout binary
#[allow(deprecated)]
fn playout_cmd() -> Command {
    Command::cargo_bin("playout").unwrap()
}

/// Write a config pointing at a database inside `dir`.
fn write_config(dir: &Path) -> PathBuf {
    let db_path = dir.join("playout.db");
    let config_path = dir.join("config.toml");
    fs::write(
        &config_path,
        format!(
            "[database]\npath = \"{}\"\n\n[scheduler]\nqueue_size = 5\n",
            db_path.display()
        ),
    )
    .unwrap();
    config_path
}

/// A database with channel `news`: one rtmp output and two back-to-back
/// entries followed by a half-hour hole and a third entry.
fn seeded() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let config_path = write_config(dir.path());

    let pool = init_pool(&dir.path().join("playout.db").to_string_lossy()).unwrap();
    let conn = get_conn(&pool).unwrap();
    queries::channels::create_channel(
        &conn,
        &NewChannel {
            short_name: ChannelId::from("news"),
            name: "News".into(),
            description: String::new(),
            thumbnail_url: String::new(),
            channel_type: Default::default(),
            ingest: Ingest {
                url: "rtmp://ingest/news".into(),
                protocol: "rtmp".into(),
            },
            slate_url: String::new(),
            outputs: vec![Output {
                name: "youtube".into(),
                output_type: "rtmp".into(),
                destination: "rtmp://a.rtmp.youtube.com/live2/key".into(),
                passthrough: true,
                renditions: Vec::new(),
            }],
            archive: false,
            dvr: false,
            visibility: "public".into(),
            mixer_kind: None,
            mixer_endpoint: None,
        },
    )
    .unwrap();
    let programme = queries::programmes::create_programme(
        &conn,
        &NewProgramme {
            title: "Bulletin".into(),
            description: String::new(),
            thumbnail: String::new(),
            videos: vec!["https://vod/a.mp4".into()],
        },
    )
    .unwrap();

    let base = Utc.with_ymd_and_hms(2030, 1, 1, 18, 0, 0).unwrap();
    for (start, end) in [(0, 30), (30, 60), (90, 120)] {
        queries::schedule_entries::create_entry(
            &conn,
            &NewScheduleEntry {
                channel_id: ChannelId::from("news"),
                programme_id: programme.id,
                ingest_url: "rtmp://ingest/news".into(),
                ingest_type: "rtmp".into(),
                scheduled_start: base + Duration::minutes(start),
                scheduled_end: base + Duration::minutes(end),
                vod_url: None,
                dvr: false,
                archive: false,
            },
        )
        .unwrap();
    }

    (dir, config_path)
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = playout_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = playout_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("playout"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = playout_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_start_help() {
    let mut cmd = playout_cmd();
    cmd.args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("execution scheduler"));
}

#[test]
fn test_cli_validate_config() {
    let dir = tempdir().unwrap();
    let config_path = write_config(dir.path());

    let mut cmd = playout_cmd();
    cmd.args(["validate", config_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("lookahead 5"));
}

#[test]
fn test_cli_validate_rejects_bad_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("bad.toml");
    fs::write(&config_path, "[server]\nport = 0\n").unwrap();

    let mut cmd = playout_cmd();
    cmd.args(["validate", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("port"));
}

#[test]
fn test_cli_plan_channel() {
    let (_dir, config_path) = seeded();

    let mut cmd = playout_cmd();
    cmd.args(["--config", config_path.to_str().unwrap(), "plan", "news"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Output: youtube"))
        .stdout(predicate::str::contains("-c copy"))
        .stdout(predicate::str::contains("-f flv"));
}

#[test]
fn test_cli_plan_unknown_channel() {
    let (_dir, config_path) = seeded();

    let mut cmd = playout_cmd();
    cmd.args(["--config", config_path.to_str().unwrap(), "plan", "sport"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Channel not found"));
}

#[test]
fn test_cli_islands() {
    let (_dir, config_path) = seeded();

    let mut cmd = playout_cmd();
    cmd.args(["--config", config_path.to_str().unwrap(), "islands", "news"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 islands, 1 gaps"))
        .stdout(predicate::str::contains("(1800s)"));
}

#[test]
fn test_cli_islands_json() {
    let (_dir, config_path) = seeded();

    let output = playout_cmd()
        .args(["--config", config_path.to_str().unwrap(), "islands", "news", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let health: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(health["unscheduled"], false);
    assert_eq!(health["islands"][0]["entries"].as_array().unwrap().len(), 2);
    assert_eq!(health["gaps"][0]["seconds"], 1800);
}
