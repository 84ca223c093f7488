//! File system access for schemas and annotated documents

use crate::domain::schema::{Schema, SchemaParser};
use crate::error::{AnnotaskError, Result};
use crate::infrastructure::xml::probe;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Schema and document files under one root directory.
///
/// Relative paths resolve against the root; absolute paths are used as is.
#[derive(Debug, Clone)]
pub struct TaskFiles {
    pub root: PathBuf,
}

impl TaskFiles {
    pub fn new(root: PathBuf) -> Self {
        TaskFiles { root }
    }

    /// Files relative to the current directory
    pub fn current_dir() -> Result<Self> {
        Ok(TaskFiles::new(std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    /// Read a file as UTF-8; a missing file is an IO error
    pub fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(self.resolve(path)).map_err(AnnotaskError::Io)
    }

    /// Parse a declaration file.
    ///
    /// A schema without an `ENTITY name` takes the file stem as task name.
    pub fn read_schema(&self, path: &Path) -> Result<Schema> {
        let contents = self.read(path)?;
        let mut schema = SchemaParser::parse(&contents)?;
        if schema.task_name().is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                schema.set_task_name(stem);
            }
        }
        log::debug!(
            "Loaded schema '{}' with {} tag type(s) from {}",
            schema.task_name(),
            schema.tag_types().len(),
            path.display()
        );
        Ok(schema)
    }

    /// Write content using a best-effort atomic replace:
    /// write to a temp file in the same directory, then rename into place.
    ///
    /// On Windows, `rename` does not overwrite existing files, so we remove the destination first.
    pub fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        let path = self.resolve(path);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_name = format!(
            "{}.annotask-tmp-{}",
            path.file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("document.xml"),
            std::process::id()
        );
        let tmp_path = path.with_file_name(tmp_name);

        fs::write(&tmp_path, content)?;

        if path.exists() {
            fs::remove_file(&path)?;
        }

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// All files with the given extension below `dir`, skipping hidden
    /// directories, sorted by path
    pub fn list_documents(&self, dir: &Path, extension: &str) -> Vec<PathBuf> {
        let dir = self.resolve(dir);
        let mut documents = Vec::new();

        let walker = WalkDir::new(&dir).into_iter().filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if !entry.file_type().is_dir() {
                return true;
            }
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !name.starts_with('.'))
        });

        for entry in walker {
            let Ok(entry) = entry else {
                continue;
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if matches {
                documents.push(entry.into_path());
            }
        }

        documents.sort();
        documents
    }

    /// Expand directories into the documents they contain; plain files
    /// pass through whatever their extension
    pub fn collect_documents(&self, paths: &[PathBuf], extension: &str) -> Vec<PathBuf> {
        let mut documents = Vec::new();
        for path in paths {
            if self.resolve(path).is_dir() {
                documents.extend(self.list_documents(path, extension));
            } else {
                documents.push(self.resolve(path));
            }
        }
        documents
    }

    pub fn is_well_formed(&self, path: &Path) -> Result<bool> {
        Ok(probe::is_well_formed(&self.read(path)?))
    }

    pub fn is_task_name_matching(&self, path: &Path, task_name: &str) -> Result<bool> {
        Ok(probe::is_task_name_matching(&self.read(path)?, task_name))
    }

    pub fn is_primary_text_matching(&self, path: &Path, text: &str) -> Result<bool> {
        Ok(probe::is_primary_text_matching(&self.read(path)?, text))
    }
}
