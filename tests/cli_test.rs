//! CLI binary tests.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PLAY: &str = "\
ACT 1

SCENE 1

HAMLET.
To be, or not to be, that is the question.

HORATIO.
Here, my good lord.

SCENE 2

HAMLET.
Words, words, words.
";

fn playgloss() -> Command {
    let mut cmd = Command::cargo_bin("playgloss").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

fn write_play(dir: &TempDir) -> String {
    let path = dir.path().join("hamlet.txt");
    std::fs::write(&path, PLAY).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn help_lists_subcommands() {
    playgloss()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("gloss"))
        .stdout(predicate::str::contains("scenes"))
        .stdout(predicate::str::contains("cast"))
        .stdout(predicate::str::contains("search"));
}

#[test]
fn scenes_lists_units_with_line_counts() {
    let dir = TempDir::new().unwrap();
    let play = write_play(&dir);

    playgloss()
        .args(["scenes", &play])
        .assert()
        .success()
        .stdout(predicate::str::contains("Format: modern"))
        .stdout(predicate::str::contains("Act I, Scene I"))
        .stdout(predicate::str::contains("Act I, Scene II"));
}

#[test]
fn scenes_shortest_prints_single_unit() {
    let dir = TempDir::new().unwrap();
    let play = write_play(&dir);

    playgloss()
        .args(["scenes", &play, "--shortest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Act I, Scene II"))
        .stdout(predicate::function(|out: &str| out.lines().count() == 1));
}

#[test]
fn scenes_alias_ls_works() {
    let dir = TempDir::new().unwrap();
    let play = write_play(&dir);

    playgloss()
        .args(["ls", &play])
        .assert()
        .success()
        .stdout(predicate::str::contains("Act I, Scene I"));
}

#[test]
fn cast_lists_detected_characters() {
    let dir = TempDir::new().unwrap();
    let play = write_play(&dir);

    playgloss()
        .args(["cast", &play])
        .assert()
        .success()
        .stdout(predicate::str::contains("HAMLET"))
        .stdout(predicate::str::contains("HORATIO"));
}

#[test]
fn gloss_dry_run_prints_plan_without_writing() {
    let dir = TempDir::new().unwrap();
    let play = write_play(&dir);
    let db = dir.path().join("cache.db");
    let out = dir.path().join("out");

    playgloss()
        .args([
            "gloss",
            &play,
            "Act 1, Scene 1",
            "--dry-run",
            "--db",
            db.to_str().unwrap(),
            "--output-dir",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("chunk(s)"));

    assert!(!out.exists());
}

#[test]
fn gloss_rejects_malformed_unit() {
    let dir = TempDir::new().unwrap();
    let play = write_play(&dir);
    let db = dir.path().join("cache.db");

    playgloss()
        .args([
            "gloss",
            &play,
            "somewhere in the middle",
            "--db",
            db.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse unit"));
}

#[test]
fn gloss_rejects_unknown_backend() {
    let dir = TempDir::new().unwrap();
    let play = write_play(&dir);

    playgloss()
        .args(["gloss", &play, "Act 1, Scene 1", "--backend", "gemini"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend"));
}

#[test]
fn status_reports_empty_cache() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("cache.db");

    playgloss()
        .args(["status", "--db", db.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache is empty."));
}

#[test]
fn search_reports_no_matches_on_empty_cache() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("cache.db");

    playgloss()
        .args(["search", "mortal coil", "--db", db.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No glosses match"));
}
