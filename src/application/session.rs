//! Annotation session use case
//!
//! Ties one schema, one primary text and a store together: documents are
//! decoded into the store, edited through schema-checked operations and
//! encoded back out.

use crate::domain::schema::Schema;
use crate::domain::spans;
use crate::domain::tags::{Argument, Attribute, ExtentTag, LinkTag, Tag};
use crate::error::{AnnotaskError, Result};
use crate::infrastructure::xml::{self, DecodeOptions, DecodeWarning, Decoded, EncodeOptions};
use crate::infrastructure::{AnnotationStore, Config, MemoryStore, TaskFiles};
use std::path::Path;

/// What loading a document produced
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// The root did not match the task and the file became the primary text
    pub plain_text: bool,
    pub tag_count: usize,
    pub warnings: Vec<DecodeWarning>,
}

/// One task schema, one document and its tags
pub struct AnnotationSession<S: AnnotationStore = MemoryStore> {
    schema: Schema,
    store: S,
    text: String,
    decode_options: DecodeOptions,
    encode_options: EncodeOptions,
}

impl AnnotationSession<MemoryStore> {
    /// Start a session over an in-memory store
    pub fn new(schema: Schema) -> Result<Self> {
        Self::with_store(schema, MemoryStore::new())
    }

    /// Load the schema from a declaration file and start a session
    pub fn from_schema_file(files: &TaskFiles, path: &Path) -> Result<Self> {
        Self::new(files.read_schema(path)?)
    }
}

impl<S: AnnotationStore> AnnotationSession<S> {
    /// Start a session over the given store, registering the schema in it
    pub fn with_store(schema: Schema, mut store: S) -> Result<Self> {
        store.register_schema(&schema)?;
        Ok(AnnotationSession {
            schema,
            store,
            text: String::new(),
            decode_options: DecodeOptions::default(),
            encode_options: EncodeOptions::default(),
        })
    }

    /// Apply the codec settings from a config
    pub fn with_config(mut self, config: &Config) -> Self {
        self.decode_options.require_task_match = config.strict_task_name;
        self.encode_options.write_text_attributes = config.write_text_attributes;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The primary text of the current document
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the document with unannotated text
    pub fn start_document(&mut self, text: &str) {
        self.store.clear_tags();
        self.text = text.to_string();
    }

    /// Replace the document with the contents of an annotated XML string
    pub fn load_document_str(&mut self, xml: &str) -> Result<LoadReport> {
        let document = match xml::decode(xml, &self.schema, &self.decode_options)? {
            Decoded::Annotated(document) => document,
            Decoded::PlainText(text) => {
                self.start_document(&text);
                return Ok(LoadReport {
                    plain_text: true,
                    ..Default::default()
                });
            }
        };

        self.start_document(&document.text);
        let tag_count = document.tags.len();
        for tag in document.tags {
            self.schema.observe_id(tag.tid());
            match tag {
                Tag::Extent(extent) => self.store.create_extent_tag(extent)?,
                Tag::Link(link) => self.store.create_link_tag(link)?,
            }
        }

        Ok(LoadReport {
            plain_text: false,
            tag_count,
            warnings: document.warnings,
        })
    }

    pub fn open_document(&mut self, files: &TaskFiles, path: &Path) -> Result<LoadReport> {
        let xml = files.read(path)?;
        let report = self.load_document_str(&xml)?;
        log::info!(
            "Opened {} ({} tag(s), {} warning(s))",
            path.display(),
            report.tag_count,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Render the document and every stored tag
    pub fn encode(&self) -> String {
        xml::encode(
            &self.schema,
            &self.text,
            &self.store.all_tags(),
            &self.encode_options,
        )
    }

    pub fn save_document(&self, files: &TaskFiles, path: &Path) -> Result<()> {
        files.write_atomic(path, &self.encode())?;
        log::info!("Saved {}", path.display());
        Ok(())
    }

    /// Create an extent tag over the given offsets with a fresh id.
    ///
    /// Attributes with a declared default start out with it.
    pub fn create_extent_tag<I>(&mut self, type_name: &str, offsets: I) -> Result<ExtentTag>
    where
        I: IntoIterator<Item = usize>,
    {
        let tag_type = self.schema.require_tag_type(type_name)?;
        if tag_type.is_link() {
            return Err(AnnotaskError::SchemaMismatch(format!(
                "'{}' is a link type; use a link tag",
                type_name
            )));
        }

        let offsets: Vec<usize> = offsets.into_iter().collect();
        let length = spans::char_len(&self.text);
        if let Some(offset) = offsets.iter().find(|&&o| o >= length) {
            return Err(AnnotaskError::MalformedSpan(format!(
                "offset {} is past the end of the text ({} characters)",
                offset, length
            )));
        }

        let tid = self.schema.next_id(type_name)?;
        let tag_type = self.schema.require_tag_type(type_name)?;
        let mut tag = ExtentTag::new(&tid, tag_type, offsets, &self.text)?;
        for attribute_type in tag_type.attribute_types().iter().filter(|a| a.has_default()) {
            tag.set_attribute(attribute_type, &attribute_type.default_value)?;
        }

        self.store.create_extent_tag(tag.clone())?;
        log::debug!("Created {} {} over {}", type_name, tid, tag.spans_as_string());
        Ok(tag)
    }

    /// Create a link tag with no arguments and a fresh id
    pub fn create_link_tag(&mut self, type_name: &str) -> Result<LinkTag> {
        let tid = self.schema.next_id(type_name)?;
        let tag_type = self.schema.require_tag_type(type_name)?;
        let mut tag = LinkTag::new(&tid, tag_type)?;
        for attribute_type in tag_type.attribute_types().iter().filter(|a| a.has_default()) {
            tag.set_attribute(attribute_type, &attribute_type.default_value)?;
        }

        self.store.create_link_tag(tag.clone())?;
        log::debug!("Created {} {}", type_name, tid);
        Ok(tag)
    }

    /// Set or clear (with an empty value) one attribute of a tag
    pub fn set_attribute(&mut self, tid: &str, name: &str, value: &str) -> Result<()> {
        let tag = self.require_tag(tid)?;
        let tag_type = self.schema.require_tag_type(tag.type_name())?;
        let attribute_type = tag_type.attribute_type(name).ok_or_else(|| {
            AnnotaskError::SchemaMismatch(format!(
                "attribute '{}' is not declared on '{}'",
                name, tag_type.name
            ))
        })?;

        let attribute = Attribute::new(tid, attribute_type, value)?;
        self.store.add_attribute(&attribute)
    }

    /// Point a link tag's argument at an extent tag
    pub fn set_argument(&mut self, link_tid: &str, name: &str, target_tid: &str) -> Result<()> {
        let link = self.require_tag(link_tid)?;
        let tag_type = self.schema.require_tag_type(link.type_name())?;
        let argument_type = tag_type.argument_type(name).ok_or_else(|| {
            AnnotaskError::SchemaMismatch(format!(
                "argument '{}' is not declared on '{}'",
                name, tag_type.name
            ))
        })?;

        let argument = Argument::new(argument_type)
            .with_link(link_tid)
            .with_target(target_tid);
        self.store.add_argument(&argument)
    }

    /// Delete a tag and any link tags pointing at it
    pub fn delete_tag(&mut self, tid: &str) -> Result<Vec<String>> {
        let removed = self.store.delete_tag(tid)?;
        log::debug!("Deleted {}", removed.join(", "));
        Ok(removed)
    }

    pub fn tag(&self, tid: &str) -> Option<Tag> {
        self.store.tag(tid)
    }

    /// Tags missing a required attribute or argument
    pub fn incomplete_tags(&self) -> Vec<Tag> {
        self.store
            .all_tags()
            .into_iter()
            .filter(|tag| !tag.is_complete(&self.schema))
            .collect()
    }

    fn require_tag(&self, tid: &str) -> Result<Tag> {
        self.store
            .tag(tid)
            .ok_or_else(|| AnnotaskError::TagNotFound(tid.to_string()))
    }
}
