//! CLI integration tests
//!
//! These stay hermetic: every input either skips during classification or
//! points at an unroutable local address.

use predicates::prelude::*;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("clipvault").unwrap()
}

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("clip"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn test_cli_clip_requires_links() {
    cmd().arg("clip").assert().failure();
}

#[test]
fn test_cli_clip_skips_non_url() {
    cmd()
        .args(["--strategy", "fetch", "--no-save", "clip", "not-a-url-at-all"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_cli_clip_skips_blocked_and_extension_links() {
    cmd()
        .args([
            "--strategy",
            "fetch",
            "--no-save",
            "clip",
            "https://docs.google.com/document/d/1",
            "https://example.com/paper.pdf",
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_cli_run_leaves_skipped_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("links.md");
    let contents = "- [x] https://example.com/done\nhttps://docs.google.com/document/d/1\nsome plain note\n";
    std::fs::write(&file, contents).unwrap();

    cmd()
        .args(["--strategy", "fetch", "--no-save", "run"])
        .arg(&file)
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(&file).unwrap(), contents);
}

#[test]
fn test_cli_run_missing_file_fails() {
    cmd()
        .args(["--strategy", "fetch", "run", "/nonexistent/links.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to process"));
}

#[test]
fn test_cli_unreachable_fetch_leaves_line_unmarked() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("links.md");
    let contents = "http://127.0.0.1:9/unreachable\n";
    std::fs::write(&file, contents).unwrap();

    cmd()
        .args(["--strategy", "fetch", "--no-save", "--timeout", "5", "run"])
        .arg(&file)
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(&file).unwrap(), contents);
}

#[test]
fn test_cli_invalid_strategy_rejected() {
    cmd()
        .args(["--strategy", "carrier-pigeon", "clip", "https://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid strategy"));
}
