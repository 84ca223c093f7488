//! Integration tests for the inspect, check and normalize commands

#![allow(deprecated)]

use predicates::prelude::*;
use std::fs;

mod common;
use common::{annotask_cmd, fixture, task_dir, DOCUMENT, SCHEMA};

#[test]
fn test_inspect_lists_tags() {
    let temp = task_dir();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["inspect", "--schema", SCHEMA, DOCUMENT])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "P2  PERSON  24~28  \"They\"  kind=pronoun",
        ))
        .stdout(predicate::str::contains("T0  TOPIC  -1~-1  \"\""))
        .stdout(predicate::str::contains(
            "M0  MEET  guest->P1  host->P0  mood=friendly",
        ))
        .stdout(predicate::str::contains("[incomplete]").not());
}

#[test]
fn test_inspect_flags_incomplete_links() {
    let temp = task_dir();
    let document = fixture(DOCUMENT).replace(" guestID=\"P1\" guestText=\"Bob\"", "");
    fs::write(temp.path().join("partial.xml"), document).unwrap();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["inspect", "--schema", SCHEMA, "partial.xml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("M0  MEET  host->P0  mood=friendly  [incomplete]"));
}

#[test]
fn test_inspect_unknown_element_fails() {
    let temp = task_dir();
    let document = fixture(DOCUMENT).replace("<PLACE ", "<CITY ");
    fs::write(temp.path().join("unknown.xml"), document).unwrap();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["inspect", "--schema", SCHEMA, "unknown.xml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Schema mismatch"))
        .stderr(predicate::str::contains("CITY"));
}

#[test]
fn test_inspect_foreign_document_as_plain_text() {
    let temp = task_dir();
    fs::write(temp.path().join("other.xml"), "<Other><TEXT>x</TEXT></Other>").unwrap();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["inspect", "--schema", SCHEMA, "other.xml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("read as plain text"))
        .stdout(predicate::str::contains("No tags found"));
}

#[test]
fn test_strict_config_rejects_foreign_document() {
    let temp = task_dir();
    fs::write(temp.path().join("other.xml"), "<Other><TEXT>x</TEXT></Other>").unwrap();
    fs::write(temp.path().join("annotask.toml"), "strict_task_name = true\n").unwrap();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["inspect", "--schema", SCHEMA, "other.xml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("does not match task 'Meetings'"));
}

#[test]
fn test_explicit_config_must_exist() {
    let temp = task_dir();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["--config", "nope.toml", "schema", SCHEMA])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_inspect_warns_about_undeclared_attributes() {
    let temp = task_dir();
    let document = fixture(DOCUMENT).replace("<PLACE id=\"PL0\"", "<PLACE id=\"PL0\" size=\"big\"");
    fs::write(temp.path().join("extra.xml"), document).unwrap();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["inspect", "--schema", SCHEMA, "extra.xml"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "warning: <PLACE> PL0: attribute 'size' is not declared for PLACE; dropped",
        ))
        .stderr(predicate::str::contains("size"));
}

#[test]
fn test_check_all_valid() {
    let temp = task_dir();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["check", "--schema", SCHEMA, DOCUMENT])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"))
        .stdout(predicate::str::contains("(6 tag(s), 0 incomplete, 0 warning(s))"))
        .stdout(predicate::str::contains("1 of 1 document(s) valid"));
}

#[test]
fn test_check_directory_with_failures() {
    let temp = task_dir();
    let batch = temp.path().join("batch");
    fs::create_dir_all(batch.join(".hidden")).unwrap();
    fs::copy(temp.path().join(DOCUMENT), batch.join("good.xml")).unwrap();
    fs::write(batch.join("broken.xml"), "<Meetings><TEXT>").unwrap();
    fs::write(batch.join("other.xml"), "<Other><TEXT>x</TEXT></Other>").unwrap();
    fs::write(batch.join(".hidden/skipped.xml"), "<Meetings>").unwrap();
    fs::write(batch.join("notes.txt"), "not a document").unwrap();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["check", "--schema", SCHEMA, "batch"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("INVALID"))
        .stdout(predicate::str::contains("broken.xml"))
        .stdout(predicate::str::contains("MISMATCH"))
        .stdout(predicate::str::contains("(root <Other>)"))
        .stdout(predicate::str::contains("skipped.xml").not())
        .stdout(predicate::str::contains("1 of 3 document(s) valid"));
}

#[test]
fn test_check_uses_configured_extension() {
    let temp = task_dir();
    let batch = temp.path().join("batch");
    fs::create_dir_all(&batch).unwrap();
    fs::copy(temp.path().join(DOCUMENT), batch.join("doc.ann")).unwrap();
    fs::write(temp.path().join("custom.toml"), "document_extension = \"ann\"\n").unwrap();

    annotask_cmd()
        .current_dir(temp.path())
        .env("ANNOTASK_CONFIG", temp.path().join("custom.toml"))
        .args(["check", "--schema", SCHEMA, "batch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("doc.ann"));
}

#[test]
fn test_normalize_to_stdout() {
    let temp = task_dir();

    let output = annotask_cmd()
        .current_dir(temp.path())
        .args(["normalize", "--schema", SCHEMA, DOCUMENT])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let output = String::from_utf8(output).unwrap();

    let p2 = output.find("id=\"P2\"").unwrap();
    let pl0 = output.find("id=\"PL0\"").unwrap();
    assert!(p2 < pl0, "PERSON tags come before PLACE tags");
    assert!(output.ends_with("</TAGS>\n</Meetings>\n"));
}

#[test]
fn test_normalize_to_file_is_idempotent() {
    let temp = task_dir();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["normalize", "--schema", SCHEMA, DOCUMENT, "--output", "once.xml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote once.xml"));

    annotask_cmd()
        .current_dir(temp.path())
        .args(["normalize", "--schema", SCHEMA, "once.xml", "-o", "twice.xml"])
        .assert()
        .success();

    let once = fs::read_to_string(temp.path().join("once.xml")).unwrap();
    let twice = fs::read_to_string(temp.path().join("twice.xml")).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_normalize_without_text_attributes() {
    let temp = task_dir();
    fs::write(
        temp.path().join("annotask.toml"),
        "write_text_attributes = false\n",
    )
    .unwrap();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["normalize", "--schema", SCHEMA, DOCUMENT])
        .assert()
        .success()
        .stdout(predicate::str::contains("<PLACE id=\"PL0\" spans=\"17~22\" />"))
        .stdout(predicate::str::contains("hostText=\"Alice\""));
}

#[test]
fn test_missing_document_is_io_error() {
    let temp = task_dir();

    annotask_cmd()
        .current_dir(temp.path())
        .args(["normalize", "--schema", SCHEMA, "missing.xml"])
        .assert()
        .code(4);
}
