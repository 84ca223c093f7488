//! Error types for annotask

use thiserror::Error;

/// Main error type for annotask
#[derive(Debug, Error)]
pub enum AnnotaskError {
    #[error("Schema format error: {0}")]
    SchemaFormat(String),

    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    #[error("Document format error: {0}")]
    DocumentFormat(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Malformed span: {0}")]
    MalformedSpan(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Duplicate tag id: {0}")]
    DuplicateTag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl AnnotaskError {
    /// Attach the declaration line to a schema-level error.
    ///
    /// Errors that are not about the schema text pass through untouched.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            AnnotaskError::SchemaFormat(msg) => {
                AnnotaskError::SchemaFormat(format!("line {}: {}", line, msg))
            }
            AnnotaskError::SchemaConflict(msg) => {
                AnnotaskError::SchemaConflict(format!("line {}: {}", line, msg))
            }
            AnnotaskError::InvalidValue(msg) => {
                AnnotaskError::InvalidValue(format!("line {}: {}", line, msg))
            }
            other => other,
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AnnotaskError::SchemaFormat(_) | AnnotaskError::SchemaConflict(_) => 2,
            AnnotaskError::DocumentFormat(_) | AnnotaskError::SchemaMismatch(_) => 3,
            AnnotaskError::Io(_) => 4,
            _ => 1,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn display_with_suggestions(&self) -> String {
        match self {
            AnnotaskError::SchemaFormat(msg) => {
                format!(
                    "Schema format error: {}\n\n\
                    Suggestions:\n\
                    • Declarations look like <!ELEMENT NAME (#PCDATA)> or <!ELEMENT NAME EMPTY>\n\
                    • Attributes look like <!ATTLIST NAME attr (a|b) #IMPLIED \"a\">\n\
                    • Every ATTLIST must follow the ELEMENT it refers to",
                    msg
                )
            }
            AnnotaskError::SchemaConflict(msg) => {
                format!(
                    "Schema conflict: {}\n\n\
                    Suggestions:\n\
                    • Tag type names must be unique\n\
                    • Custom id prefixes (prefix=\"...\") must not repeat another type's prefix",
                    msg
                )
            }
            AnnotaskError::SchemaMismatch(msg) => {
                format!(
                    "Schema mismatch: {}\n\n\
                    Suggestions:\n\
                    • Check that the document was annotated with this schema\n\
                    • Run 'annotask schema <file>' to list the declared tag types",
                    msg
                )
            }
            AnnotaskError::DocumentFormat(msg) => {
                format!(
                    "Document format error: {}\n\n\
                    Suggestions:\n\
                    • Annotated documents need a <TEXT> element holding the primary text\n\
                    • Check the file for unbalanced or unescaped markup",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type using AnnotaskError
pub type Result<T> = std::result::Result<T, AnnotaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_line_prefixes_schema_errors() {
        let err = AnnotaskError::SchemaFormat("bad declaration".to_string()).at_line(7);
        assert_eq!(err.to_string(), "Schema format error: line 7: bad declaration");

        let err = AnnotaskError::SchemaConflict("duplicate".to_string()).at_line(3);
        assert_eq!(err.to_string(), "Schema conflict: line 3: duplicate");
    }

    #[test]
    fn test_at_line_leaves_other_errors() {
        let err = AnnotaskError::TagNotFound("N1".to_string()).at_line(3);
        assert_eq!(err.to_string(), "Tag not found: N1");
    }

    #[test]
    fn test_schema_format_suggestion() {
        let err = AnnotaskError::SchemaFormat("line 2: unknown directive".to_string());
        let msg = err.display_with_suggestions();
        assert!(msg.contains("Suggestions"));
        assert!(msg.contains("<!ELEMENT"));
    }

    #[test]
    fn test_schema_mismatch_suggestion() {
        let err = AnnotaskError::SchemaMismatch("unknown element FOO".to_string());
        let msg = err.display_with_suggestions();
        assert!(msg.contains("annotask schema"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AnnotaskError::SchemaFormat("x".to_string()).exit_code(), 2);
        assert_eq!(AnnotaskError::SchemaConflict("x".to_string()).exit_code(), 2);
        assert_eq!(AnnotaskError::DocumentFormat("x".to_string()).exit_code(), 3);
        assert_eq!(AnnotaskError::SchemaMismatch("x".to_string()).exit_code(), 3);
        assert_eq!(
            AnnotaskError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "x")).exit_code(),
            4
        );
        assert_eq!(AnnotaskError::InvalidValue("x".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_other_errors_use_display() {
        let err = AnnotaskError::MalformedSpan("3~3".to_string());
        assert_eq!(err.display_with_suggestions(), "Malformed span: 3~3");
    }
}
