//! Batch validation use case
//!
//! Checks a set of annotated documents against one schema without loading
//! them into a session.

use crate::domain::schema::Schema;
use crate::error::Result;
use crate::infrastructure::xml::{self, probe, DecodeOptions, DecodeWarning, Decoded};
use crate::infrastructure::TaskFiles;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid {
        tags: usize,
        /// Tags missing a required attribute or argument
        incomplete: Vec<String>,
        warnings: Vec<DecodeWarning>,
    },
    /// Well-formed, but annotated for another task
    TaskMismatch { found: String },
    Invalid { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub path: PathBuf,
    pub outcome: ValidationOutcome,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, ValidationOutcome::Valid { .. })
    }
}

/// Service for validating documents
pub struct ValidateService {
    files: TaskFiles,
    extension: String,
}

impl ValidateService {
    pub fn new(files: TaskFiles, extension: &str) -> Self {
        ValidateService {
            files,
            extension: extension.to_string(),
        }
    }

    /// Validate every document named by `paths`, expanding directories.
    ///
    /// Problems with individual files end up in their report; only a
    /// failure to enumerate the inputs is an error.
    pub fn execute(&self, schema: &Schema, paths: &[PathBuf]) -> Result<Vec<ValidationReport>> {
        let documents = self.files.collect_documents(paths, &self.extension);
        log::debug!(
            "Validating {} document(s) against '{}'",
            documents.len(),
            schema.task_name()
        );

        Ok(documents
            .into_iter()
            .map(|path| {
                let outcome = self.validate_file(schema, &path);
                if !matches!(outcome, ValidationOutcome::Valid { .. }) {
                    log::info!("{} did not validate: {:?}", path.display(), outcome);
                }
                ValidationReport { path, outcome }
            })
            .collect())
    }

    fn validate_file(&self, schema: &Schema, path: &Path) -> ValidationOutcome {
        let contents = match self.files.read(path) {
            Ok(contents) => contents,
            Err(e) => {
                return ValidationOutcome::Invalid {
                    reason: e.to_string(),
                }
            }
        };
        validate_str(schema, &contents)
    }
}

/// Validate one document held in memory
pub fn validate_str(schema: &Schema, contents: &str) -> ValidationOutcome {
    if !probe::is_well_formed(contents) {
        // Decode again only for the detailed reason
        let reason = match xml::decode(contents, schema, &DecodeOptions::default()) {
            Err(e) => e.to_string(),
            Ok(_) => "not well-formed XML".to_string(),
        };
        return ValidationOutcome::Invalid { reason };
    }

    let task_name = schema.task_name();
    if !task_name.is_empty() && !probe::is_task_name_matching(contents, task_name) {
        return ValidationOutcome::TaskMismatch {
            found: probe::root_name(contents).unwrap_or_default(),
        };
    }

    let strict = DecodeOptions {
        require_task_match: true,
    };
    match xml::decode(contents, schema, &strict) {
        Ok(Decoded::Annotated(document)) => ValidationOutcome::Valid {
            tags: document.tags.len(),
            incomplete: document
                .tags
                .iter()
                .filter(|tag| !tag.is_complete(schema))
                .map(|tag| tag.tid().to_string())
                .collect(),
            warnings: document.warnings,
        },
        Ok(Decoded::PlainText(_)) => ValidationOutcome::TaskMismatch {
            found: probe::root_name(contents).unwrap_or_default(),
        },
        Err(e) => ValidationOutcome::Invalid {
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::SchemaParser;
    use std::fs;
    use tempfile::TempDir;

    fn schema() -> Schema {
        SchemaParser::parse(
            "<!ENTITY name \"Nouns\">\n\
             <!ELEMENT NOUN (#PCDATA)>\n\
             <!ATTLIST NOUN type (person | place) #REQUIRED>",
        )
        .unwrap()
    }

    #[test]
    fn test_valid_document_reports_incomplete_tags() {
        let outcome = validate_str(
            &schema(),
            "<Nouns><TEXT>Rome and Ann</TEXT><TAGS>\
             <NOUN id=\"N0\" spans=\"0~4\" type=\"place\" />\
             <NOUN id=\"N1\" spans=\"9~12\" />\
             </TAGS></Nouns>",
        );
        assert_eq!(
            outcome,
            ValidationOutcome::Valid {
                tags: 2,
                incomplete: vec!["N1".to_string()],
                warnings: vec![],
            }
        );
    }

    #[test]
    fn test_task_mismatch() {
        let outcome = validate_str(&schema(), "<Verbs><TEXT>x</TEXT></Verbs>");
        assert_eq!(
            outcome,
            ValidationOutcome::TaskMismatch {
                found: "Verbs".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_documents() {
        for contents in [
            "<Nouns><TEXT>x</TEXT>",
            "<Nouns><TAGS/></Nouns>",
            "<Nouns><TEXT>x</TEXT><TAGS><VERB id=\"V0\"/></TAGS></Nouns>",
        ] {
            assert!(
                matches!(
                    validate_str(&schema(), contents),
                    ValidationOutcome::Invalid { .. }
                ),
                "expected '{}' to be invalid",
                contents
            );
        }
    }

    #[test]
    fn test_execute_over_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("batch")).unwrap();
        fs::write(
            root.join("batch/good.xml"),
            "<Nouns><TEXT>Rome</TEXT><TAGS><NOUN id=\"N0\" spans=\"0~4\" type=\"place\"/></TAGS></Nouns>",
        )
        .unwrap();
        fs::write(root.join("batch/bad.xml"), "<Nouns>").unwrap();
        fs::write(root.join("batch/skip.txt"), "ignored").unwrap();

        let service = ValidateService::new(TaskFiles::new(root.to_path_buf()), "xml");
        let reports = service
            .execute(&schema(), &[PathBuf::from("batch"), PathBuf::from("missing.xml")])
            .unwrap();

        assert_eq!(reports.len(), 3);
        assert!(reports[0].path.ends_with(Path::new("batch/bad.xml")));
        assert!(!reports[0].is_valid());
        assert!(reports[1].path.ends_with(Path::new("batch/good.xml")));
        assert!(reports[1].is_valid());
        assert!(matches!(
            reports[2].outcome,
            ValidationOutcome::Invalid { .. }
        ));
    }
}
