//! Integration tests for the `board` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise every subcommand
//! through the actual binary, including stdin/stdout piping, file I/O,
//! environment configuration and error handling.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn board() -> Command {
    let mut cmd = Command::cargo_bin("board").unwrap();
    cmd.env_remove("BOARD_MAX_DATES").env_remove("RUST_LOG");
    cmd
}

/// Run the command, assert success, and parse stdout as JSON.
fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout must be JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// conflicts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn conflicts_from_file() {
    let map = stdout_json(board().args(["conflicts", "-i", &fixture("board.json")]));

    assert_eq!(
        map,
        json!({
            "math": {
                "student": {
                    "kind": "student",
                    "conflictingBlockIds": ["reading"],
                    "conflictingPersonIds": ["s1"]
                }
            },
            "reading": {
                "student": {
                    "kind": "student",
                    "conflictingBlockIds": ["math"],
                    "conflictingPersonIds": ["s1"]
                }
            }
        })
    );
}

#[test]
fn conflicts_from_stdin() {
    let input = std::fs::read_to_string(fixture("board.json")).unwrap();

    let map = stdout_json(board().arg("conflicts").write_stdin(input));

    assert!(map.get("reading").is_some());
    assert!(map.get("art").is_none(), "adjacent blocks must not conflict");
    assert!(map.get("music").is_none(), "other dates must not conflict");
}

#[test]
fn conflicts_to_file() {
    let output_path = std::env::temp_dir().join("board-cli-test-conflicts.json");
    let _ = std::fs::remove_file(&output_path);

    board()
        .args(["conflicts", "-i", &fixture("board.json"), "-o"])
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(&output_path).expect("output file must exist");
    let map: Value = serde_json::from_str(&content).unwrap();
    assert!(map.get("math").is_some());

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn conflicts_pretty_output_is_indented() {
    board()
        .args(["conflicts", "--pretty", "-i", &fixture("board.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("\n  \"math\""));
}

#[test]
fn conflicts_empty_board() {
    let map = stdout_json(board().arg("conflicts").write_stdin("{}"));
    assert_eq!(map, json!({}));
}

#[test]
fn conflicts_rejects_inverted_block() {
    board()
        .args(["conflicts", "-i", &fixture("inverted.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid board snapshot"))
        .stderr(predicate::str::contains("bad"));
}

#[test]
fn conflicts_rejects_invalid_json() {
    board()
        .arg("conflicts")
        .write_stdin("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid board snapshot"));
}

#[test]
fn conflicts_missing_file() {
    board()
        .args(["conflicts", "-i", "/nonexistent/board.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// check
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn check_lists_candidate_pairs() {
    let pairs = stdout_json(board().args([
        "check",
        "-i",
        &fixture("board.json"),
        "--block",
        &fixture("candidate.json"),
    ]));

    let pairs = pairs.as_array().expect("array of pairs");
    assert_eq!(pairs.len(), 2);

    assert_eq!(pairs[0]["kind"], "student");
    assert_eq!(pairs[0]["personId"], "s2");
    assert_eq!(pairs[0]["blockA"], "art");
    assert_eq!(pairs[0]["blockB"], "speech");
    assert_eq!(pairs[0]["overlapMinutes"], 30);

    assert_eq!(pairs[1]["kind"], "aide");
    assert_eq!(pairs[1]["personId"], "y");
    assert_eq!(pairs[1]["blockA"], "math");
    assert_eq!(pairs[1]["overlapMinutes"], 15);
}

#[test]
fn check_strict_fails_on_conflict() {
    board()
        .args([
            "check",
            "--strict",
            "-i",
            &fixture("board.json"),
            "--block",
            &fixture("candidate.json"),
        ])
        .assert()
        .code(1);
}

#[test]
fn check_strict_passes_without_conflict() {
    board()
        .args([
            "check",
            "--strict",
            "--block",
            &fixture("candidate.json"),
        ])
        .write_stdin("{}")
        .assert()
        .success()
        .stdout("[]\n");
}

// ─────────────────────────────────────────────────────────────────────────────
// expand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_daily_every_other_day() {
    let dates = stdout_json(board().args([
        "expand",
        "--date",
        "2024-01-01",
        "--rule",
        r#"{"type":"daily","interval":2}"#,
        "--max-dates",
        "3",
    ]));

    assert_eq!(dates, json!(["2024-01-01", "2024-01-03", "2024-01-05"]));
}

#[test]
fn expand_custom_weekdays() {
    let dates = stdout_json(board().args([
        "expand",
        "--date",
        "2024-01-01",
        "--rule",
        r#"{"type":"custom","daysOfWeek":[1,3,5],"maxOccurrences":4}"#,
    ]));

    assert_eq!(
        dates,
        json!(["2024-01-01", "2024-01-03", "2024-01-05", "2024-01-08"])
    );
}

#[test]
fn expand_max_dates_from_environment() {
    let dates = stdout_json(
        board()
            .env("BOARD_MAX_DATES", "4")
            .args(["expand", "--date", "2024-01-01", "--rule", r#"{"type":"weekly"}"#]),
    );

    assert_eq!(dates.as_array().unwrap().len(), 4);
}

#[test]
fn expand_default_cap_is_365() {
    let dates = stdout_json(board().args([
        "expand",
        "--date",
        "2024-01-01",
        "--rule",
        r#"{"type":"daily"}"#,
    ]));

    assert_eq!(dates.as_array().unwrap().len(), 365);
}

#[test]
fn expand_malformed_rule_is_non_repeating() {
    let dates = stdout_json(board().args(["expand", "--date", "2024-01-01", "--rule", "not json"]));
    assert_eq!(dates, json!(["2024-01-01"]));
}

#[test]
fn expand_rejects_bad_date() {
    board()
        .args(["expand", "--date", "01/01/2024"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --date"));
}

// ─────────────────────────────────────────────────────────────────────────────
// describe
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn describe_rules() {
    board()
        .args(["describe", "--rule", r#"{"type":"weekly","interval":2}"#])
        .assert()
        .success()
        .stdout("Every 2 weeks\n");

    board()
        .args(["describe", "--rule", r#"{"type":"custom","daysOfWeek":[1,3,5]}"#])
        .assert()
        .success()
        .stdout("Custom: Mon, Wed, Fri\n");

    board()
        .args(["describe", "--rule", "none"])
        .assert()
        .success()
        .stdout("Does not repeat\n");
}

#[test]
fn describe_logs_only_real_fallbacks() {
    board()
        .env("RUST_LOG", "debug")
        .args(["describe", "--rule", r#"{"type":"none"}"#])
        .assert()
        .success()
        .stdout("Does not repeat\n")
        .stderr(predicate::str::is_empty());

    board()
        .env("RUST_LOG", "debug")
        .args(["describe", "--rule", r#"{"type":"monthly"}"#])
        .assert()
        .success()
        .stdout("Does not repeat\n")
        .stderr(predicate::str::contains("unknown recurrence type"));
}

// ─────────────────────────────────────────────────────────────────────────────
// materialize
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn materialize_weekly_template() {
    let blocks = stdout_json(board().args([
        "materialize",
        "-i",
        &fixture("template.json"),
        "--rule",
        r#"{"type":"weekly","maxOccurrences":3}"#,
    ]));

    let blocks = blocks.as_array().unwrap();
    let ids: Vec<&str> = blocks.iter().map(|b| b["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["circle-20240101", "circle-20240108", "circle-20240115"]);
    for b in blocks {
        assert_eq!(b["startTime"], "08:30");
        assert_eq!(b["studentIds"], json!(["s1", "s2"]));
        assert_eq!(b["notes"], "bring mats");
    }
}

#[test]
fn materialize_rejects_inverted_template() {
    board()
        .arg("materialize")
        .write_stdin(r#"{"id":"t","date":"2024-01-01","startTime":"10:00","endTime":"09:00"}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid template block"));
}

// ─────────────────────────────────────────────────────────────────────────────
// General
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    board()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("conflicts"))
        .stdout(predicate::str::contains("expand"))
        .stdout(predicate::str::contains("materialize"));
}

#[test]
fn version_flag() {
    board()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("board"));
}
