//! Integration tests for schema parsing and the schema command

#![allow(deprecated)]

use annotask::domain::schema::{SchemaParser, ValueSet};
use annotask::error::AnnotaskError;
use predicates::prelude::*;
use std::fs;

mod common;
use common::{annotask_cmd, fixture, task_dir, SCHEMA};

#[test]
fn test_parse_fixture_schema() {
    let schema = SchemaParser::parse(&fixture(SCHEMA)).unwrap();

    assert_eq!(schema.task_name(), "Meetings");
    let names: Vec<&str> = schema.tag_types().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["PERSON", "PLACE", "TOPIC", "MEET"]);

    let prefixes: Vec<&str> = schema
        .tag_types()
        .iter()
        .map(|t| t.prefix.as_str())
        .collect();
    assert_eq!(prefixes, vec!["P", "PL", "T", "M"]);

    let person = schema.tag_type("PERSON").unwrap();
    let kind = person.attribute_type("kind").unwrap();
    assert_eq!(
        kind.value_set,
        ValueSet::Enumerated(vec!["named".to_string(), "pronoun".to_string()])
    );
    assert_eq!(kind.default_value, "named");

    assert!(schema.tag_type("TOPIC").unwrap().is_non_consuming());
    assert!(schema.tag_type("TOPIC").unwrap().attribute_types().is_empty());

    let meet = schema.tag_type("MEET").unwrap();
    assert!(meet.is_link());
    let arguments: Vec<&str> = meet
        .required_argument_types()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(arguments, vec!["host", "guest"]);
}

#[test]
fn test_three_type_example() {
    let schema = SchemaParser::parse(
        "<!ENTITY name \"T\"><!ELEMENT NOUN (#PCDATA)><!ELEMENT VERB (#PCDATA)><!ELEMENT ACTION EMPTY>",
    )
    .unwrap();

    assert_eq!(schema.task_name(), "T");
    assert_eq!(schema.tag_types().len(), 3);
    assert_eq!(schema.extent_types().count(), 2);
    assert_eq!(schema.link_types().count(), 1);

    let action = schema.tag_type("ACTION").unwrap();
    let arguments: Vec<(&str, bool)> = action
        .argument_types()
        .iter()
        .map(|a| (a.name.as_str(), a.required))
        .collect();
    assert_eq!(arguments, vec![("from", false), ("to", false)]);
}

#[test]
fn test_default_outside_value_set_reports_line() {
    let err = SchemaParser::parse(
        "<!ELEMENT VERB (#PCDATA)>\n<!ATTLIST VERB tense (past|present|future|none) #IMPLIED \"past-tense\">",
    )
    .unwrap_err();

    assert!(matches!(err, AnnotaskError::SchemaFormat(_)));
    assert!(err.to_string().contains("line 2:"));
}

#[test]
fn test_schema_command_summarizes_types() {
    let temp = task_dir();

    annotask_cmd()
        .current_dir(temp.path())
        .arg("schema")
        .arg(SCHEMA)
        .assert()
        .success()
        .stdout(predicate::str::contains("Task: Meetings"))
        .stdout(predicate::str::contains("4 tag type(s)"))
        .stdout(predicate::str::contains("PLACE (extent, prefix PL)"))
        .stdout(predicate::str::contains("TOPIC (extent, non-consuming, prefix T)"))
        .stdout(predicate::str::contains("argument host required"));
}

#[test]
fn test_schema_command_uses_file_stem_without_entity() {
    let temp = task_dir();
    fs::write(temp.path().join("Nouns.dtd"), "<!ELEMENT NOUN (#PCDATA)>\n").unwrap();

    annotask_cmd()
        .current_dir(temp.path())
        .arg("schema")
        .arg("Nouns.dtd")
        .assert()
        .success()
        .stdout(predicate::str::contains("Task: Nouns"));
}

#[test]
fn test_schema_command_rejects_bad_schema() {
    let temp = task_dir();
    fs::write(
        temp.path().join("bad.dtd"),
        "<!ELEMENT NOUN (#PCDATA)>\n<!ATTLIST VERB tense CDATA #IMPLIED>\n",
    )
    .unwrap();

    annotask_cmd()
        .current_dir(temp.path())
        .arg("schema")
        .arg("bad.dtd")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error: Schema format error: line 2:"));
}

#[test]
fn test_schema_command_missing_file() {
    let temp = task_dir();

    annotask_cmd()
        .current_dir(temp.path())
        .arg("schema")
        .arg("missing.dtd")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("IO error"));
}
