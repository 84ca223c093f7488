//! Output formatting utilities

use crate::application::{ValidationOutcome, ValidationReport};
use crate::domain::schema::Schema;
use crate::domain::tags::Tag;

/// Format the declared tag types of a schema for display
pub fn format_schema(schema: &Schema) -> String {
    let mut output = format!(
        "Task: {}\n{} tag type(s)\n",
        schema.task_name(),
        schema.tag_types().len()
    );

    for tag_type in schema.tag_types() {
        let kind = if tag_type.is_link() {
            "link"
        } else if tag_type.is_non_consuming() {
            "extent, non-consuming"
        } else {
            "extent"
        };
        output.push_str(&format!(
            "\n{} ({}, prefix {})\n",
            tag_type.name, kind, tag_type.prefix
        ));

        for attribute_type in tag_type.attribute_types() {
            let mut line = format!(
                "  attribute {} {} {}",
                attribute_type.name,
                attribute_type.value_set,
                requirement(attribute_type.required)
            );
            if attribute_type.has_default() {
                line.push_str(&format!(", default \"{}\"", attribute_type.default_value));
            }
            if attribute_type.id_ref {
                line.push_str(", id reference");
            }
            output.push_str(&line);
            output.push('\n');
        }
        for argument_type in tag_type.argument_types() {
            output.push_str(&format!(
                "  argument {} {}\n",
                argument_type.name,
                requirement(argument_type.required)
            ));
        }
    }

    output
}

fn requirement(required: bool) -> &'static str {
    if required {
        "required"
    } else {
        "optional"
    }
}

/// Format a list of tags for display, flagging incomplete ones
pub fn format_tags(schema: &Schema, tags: &[Tag]) -> String {
    if tags.is_empty() {
        return "No tags found".to_string();
    }

    let mut output = String::new();
    for tag in tags {
        let mut line = format!("{}  {}", tag.tid(), tag.type_name());
        match tag {
            Tag::Extent(extent) => {
                line.push_str(&format!("  {}  \"{}\"", extent.spans_as_string(), extent.text()));
            }
            Tag::Link(link) => {
                for (name, target) in link.arguments() {
                    line.push_str(&format!("  {}->{}", name, target));
                }
            }
        }
        for (name, value) in tag.attributes() {
            line.push_str(&format!("  {}={}", name, value));
        }
        if !tag.is_complete(schema) {
            line.push_str("  [incomplete]");
        }
        output.push_str(&line);
        output.push('\n');
    }

    output
}

/// Format batch validation results, one line per file plus a summary
pub fn format_reports(reports: &[ValidationReport]) -> String {
    if reports.is_empty() {
        return "No documents found".to_string();
    }

    let mut output = String::new();
    for report in reports {
        let path = report.path.display();
        match &report.outcome {
            ValidationOutcome::Valid {
                tags,
                incomplete,
                warnings,
            } => {
                output.push_str(&format!(
                    "OK        {}  ({} tag(s), {} incomplete, {} warning(s))\n",
                    path,
                    tags,
                    incomplete.len(),
                    warnings.len()
                ));
                for warning in warnings {
                    output.push_str(&format!("          warning: {}\n", warning));
                }
            }
            ValidationOutcome::TaskMismatch { found } => {
                output.push_str(&format!("MISMATCH  {}  (root <{}>)\n", path, found));
            }
            ValidationOutcome::Invalid { reason } => {
                output.push_str(&format!("INVALID   {}  {}\n", path, reason));
            }
        }
    }

    let valid = reports.iter().filter(|r| r.is_valid()).count();
    output.push_str(&format!("\n{} of {} document(s) valid\n", valid, reports.len()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::SchemaParser;
    use crate::domain::tags::{ExtentTag, LinkTag};
    use crate::infrastructure::xml::DecodeWarning;
    use std::path::PathBuf;

    fn schema() -> Schema {
        SchemaParser::parse(
            "<!ENTITY name \"People\">\n\
             <!ELEMENT PERSON (#PCDATA)>\n\
             <!ATTLIST PERSON kind (named | pronoun) #REQUIRED \"named\">\n\
             <!ELEMENT DOC (#PCDATA)>\n\
             <!ATTLIST DOC spans CDATA #IMPLIED>\n\
             <!ELEMENT MEET EMPTY>",
        )
        .unwrap()
    }

    #[test]
    fn test_format_schema() {
        let output = format_schema(&schema());
        assert!(output.starts_with("Task: People\n3 tag type(s)\n"));
        assert!(output.contains("PERSON (extent, prefix P)"));
        assert!(output.contains("  attribute kind (named|pronoun) required, default \"named\""));
        assert!(output.contains("DOC (extent, non-consuming, prefix D)"));
        assert!(output.contains("MEET (link, prefix M)\n  argument from optional\n  argument to optional\n"));
    }

    #[test]
    fn test_format_empty_tags() {
        assert_eq!(format_tags(&schema(), &[]), "No tags found");
    }

    #[test]
    fn test_format_tags() {
        let schema = schema();
        let text = "Alice met Bob.";
        let person = schema.tag_type("PERSON").unwrap();
        let meet = schema.tag_type("MEET").unwrap();

        let alice = ExtentTag::new("P0", person, 0..5, text).unwrap();
        let mut link = LinkTag::new("M0", meet).unwrap();
        link.add_argument(meet.argument_type("from").unwrap(), &alice)
            .unwrap();

        let output = format_tags(&schema, &[alice.into(), link.into()]);
        assert_eq!(
            output,
            "P0  PERSON  0~5  \"Alice\"  [incomplete]\nM0  MEET  from->P0\n"
        );
    }

    #[test]
    fn test_format_reports() {
        let reports = vec![
            ValidationReport {
                path: PathBuf::from("a.xml"),
                outcome: ValidationOutcome::Valid {
                    tags: 2,
                    incomplete: vec!["N1".to_string()],
                    warnings: vec![DecodeWarning {
                        element: "NOUN".to_string(),
                        tid: Some("N1".to_string()),
                        message: "attribute 'x' is not declared for NOUN; dropped".to_string(),
                    }],
                },
            },
            ValidationReport {
                path: PathBuf::from("b.xml"),
                outcome: ValidationOutcome::TaskMismatch {
                    found: "Other".to_string(),
                },
            },
            ValidationReport {
                path: PathBuf::from("c.xml"),
                outcome: ValidationOutcome::Invalid {
                    reason: "broken".to_string(),
                },
            },
        ];

        let output = format_reports(&reports);
        assert!(output.contains("OK        a.xml  (2 tag(s), 1 incomplete, 1 warning(s))"));
        assert!(output.contains("warning: <NOUN> N1: attribute 'x'"));
        assert!(output.contains("MISMATCH  b.xml  (root <Other>)"));
        assert!(output.contains("INVALID   c.xml  broken"));
        assert!(output.ends_with("1 of 3 document(s) valid\n"));
    }
}
