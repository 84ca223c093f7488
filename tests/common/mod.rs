#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SCHEMA: &str = "meetings.dtd";
pub const DOCUMENT: &str = "meetings.xml";

pub fn annotask_cmd() -> Command {
    let mut cmd = Command::cargo_bin("annotask").unwrap();
    cmd.env_remove("ANNOTASK_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).unwrap()
}

/// A scratch directory holding the meetings schema and document
pub fn task_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    for name in [SCHEMA, DOCUMENT] {
        fs::copy(fixture_path(name), temp.path().join(name)).unwrap();
    }
    temp
}
