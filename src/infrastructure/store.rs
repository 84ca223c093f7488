//! Annotation store
//!
//! The store contract is the CRUD surface the tag model needs from
//! persistence. Reads hand out owned snapshots; every change goes back
//! through an explicit call.

use crate::domain::schema::{ArgumentType, AttributeType, Schema, TagType};
use crate::domain::tags::{compare_tids, Argument, Attribute, ExtentTag, LinkTag, Tag};
use crate::error::{AnnotaskError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Abstract storage for tag types and tags
pub trait AnnotationStore {
    fn create_tag_type(&mut self, tag_type: &TagType) -> Result<()>;

    fn create_attribute_type(&mut self, attribute_type: &AttributeType) -> Result<()>;

    fn create_argument_type(&mut self, argument_type: &ArgumentType) -> Result<()>;

    fn create_extent_tag(&mut self, tag: ExtentTag) -> Result<()>;

    /// Store a link tag; any arguments it already carries must resolve
    fn create_link_tag(&mut self, tag: LinkTag) -> Result<()>;

    fn add_attribute(&mut self, attribute: &Attribute) -> Result<()>;

    fn add_argument(&mut self, argument: &Argument) -> Result<()>;

    /// Delete a tag; deleting an extent tag first deletes every link tag
    /// pointing at it. Returns the ids of all removed tags.
    fn delete_tag(&mut self, tid: &str) -> Result<Vec<String>>;

    /// Remove every tag, keeping the registered types
    fn clear_tags(&mut self);

    fn tag(&self, tid: &str) -> Option<Tag>;

    fn tags_of_type(&self, type_name: &str) -> Vec<Tag>;

    /// Extent tags whose spans cover the offset
    fn extent_tags_at(&self, offset: usize) -> Vec<ExtentTag>;

    /// Link tags with an argument pointing at the tag
    fn links_to(&self, tid: &str) -> Vec<LinkTag>;

    fn all_tags(&self) -> Vec<Tag>;

    /// Register every type, attribute type and argument type of a schema
    fn register_schema(&mut self, schema: &Schema) -> Result<()> {
        for tag_type in schema.tag_types() {
            self.create_tag_type(tag_type)?;
            for attribute_type in tag_type.attribute_types() {
                self.create_attribute_type(attribute_type)?;
            }
            for argument_type in tag_type.argument_types() {
                self.create_argument_type(argument_type)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct TypeEntry {
    is_link: bool,
    attributes: HashMap<String, AttributeType>,
    arguments: BTreeSet<String>,
}

/// In-memory implementation of AnnotationStore
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    types: HashMap<String, TypeEntry>,
    tags: BTreeMap<String, Tag>,
    /// Offset to the extent tags covering it
    anchors: BTreeMap<usize, BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    fn type_entry(&self, type_name: &str) -> Result<&TypeEntry> {
        self.types.get(type_name).ok_or_else(|| {
            AnnotaskError::SchemaMismatch(format!("tag type '{}' is not registered", type_name))
        })
    }

    fn type_entry_mut(&mut self, type_name: &str) -> Result<&mut TypeEntry> {
        self.types.get_mut(type_name).ok_or_else(|| {
            AnnotaskError::SchemaMismatch(format!("tag type '{}' is not registered", type_name))
        })
    }

    fn ensure_new_tid(&self, tid: &str) -> Result<()> {
        if self.tags.contains_key(tid) {
            return Err(AnnotaskError::DuplicateTag(tid.to_string()));
        }
        Ok(())
    }

    fn check_attributes(&self, type_name: &str, attributes: &BTreeMap<String, String>) -> Result<()> {
        let entry = self.type_entry(type_name)?;
        for (name, value) in attributes {
            let attribute_type = entry.attributes.get(name).ok_or_else(|| {
                AnnotaskError::SchemaMismatch(format!(
                    "attribute '{}' is not declared on '{}'",
                    name, type_name
                ))
            })?;
            Attribute::new("", attribute_type, value)?;
        }
        Ok(())
    }

    fn require_extent(&self, tid: &str) -> Result<&ExtentTag> {
        match self.tags.get(tid) {
            Some(Tag::Extent(tag)) => Ok(tag),
            Some(Tag::Link(_)) => Err(AnnotaskError::InvalidValue(format!(
                "{} is a link tag and cannot be an argument target",
                tid
            ))),
            None => Err(AnnotaskError::TagNotFound(tid.to_string())),
        }
    }

    fn sorted(mut tags: Vec<Tag>) -> Vec<Tag> {
        tags.sort_by(|a, b| compare_tids(a.tid(), b.tid()));
        tags
    }

    fn unindex(&mut self, tag: &ExtentTag) {
        for offset in tag.spans() {
            if let Some(tids) = self.anchors.get_mut(offset) {
                tids.remove(tag.tid());
                if tids.is_empty() {
                    self.anchors.remove(offset);
                }
            }
        }
    }
}

impl AnnotationStore for MemoryStore {
    fn create_tag_type(&mut self, tag_type: &TagType) -> Result<()> {
        if self.types.contains_key(&tag_type.name) {
            return Err(AnnotaskError::SchemaConflict(format!(
                "tag type '{}' is already registered",
                tag_type.name
            )));
        }
        self.types.insert(
            tag_type.name.clone(),
            TypeEntry {
                is_link: tag_type.is_link(),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn create_attribute_type(&mut self, attribute_type: &AttributeType) -> Result<()> {
        let entry = self.type_entry_mut(&attribute_type.owner)?;
        entry
            .attributes
            .insert(attribute_type.name.clone(), attribute_type.clone());
        Ok(())
    }

    fn create_argument_type(&mut self, argument_type: &ArgumentType) -> Result<()> {
        let entry = self.type_entry_mut(&argument_type.owner)?;
        if !entry.is_link {
            return Err(AnnotaskError::SchemaMismatch(format!(
                "'{}' is not a link type",
                argument_type.owner
            )));
        }
        entry.arguments.insert(argument_type.name.clone());
        Ok(())
    }

    fn create_extent_tag(&mut self, tag: ExtentTag) -> Result<()> {
        if self.type_entry(tag.type_name())?.is_link {
            return Err(AnnotaskError::SchemaMismatch(format!(
                "'{}' is a link type",
                tag.type_name()
            )));
        }
        self.ensure_new_tid(tag.tid())?;
        self.check_attributes(tag.type_name(), tag.attributes())?;

        for offset in tag.spans() {
            self.anchors
                .entry(*offset)
                .or_default()
                .insert(tag.tid().to_string());
        }
        self.tags.insert(tag.tid().to_string(), Tag::Extent(tag));
        Ok(())
    }

    fn create_link_tag(&mut self, tag: LinkTag) -> Result<()> {
        let entry = self.type_entry(tag.type_name())?;
        if !entry.is_link {
            return Err(AnnotaskError::SchemaMismatch(format!(
                "'{}' is an extent type",
                tag.type_name()
            )));
        }
        for (name, target) in tag.arguments() {
            if !entry.arguments.contains(name) {
                return Err(AnnotaskError::SchemaMismatch(format!(
                    "argument '{}' is not declared on '{}'",
                    name,
                    tag.type_name()
                )));
            }
            self.require_extent(target)?;
        }
        self.ensure_new_tid(tag.tid())?;
        self.check_attributes(tag.type_name(), tag.attributes())?;

        self.tags.insert(tag.tid().to_string(), Tag::Link(tag));
        Ok(())
    }

    fn add_attribute(&mut self, attribute: &Attribute) -> Result<()> {
        let type_name = self
            .tags
            .get(&attribute.tid)
            .map(|t| t.type_name().to_string())
            .ok_or_else(|| AnnotaskError::TagNotFound(attribute.tid.clone()))?;

        let attribute_type = self
            .type_entry(&type_name)?
            .attributes
            .get(&attribute.name)
            .ok_or_else(|| {
                AnnotaskError::SchemaMismatch(format!(
                    "attribute '{}' is not declared on '{}'",
                    attribute.name, type_name
                ))
            })?;
        Attribute::new(&attribute.tid, attribute_type, &attribute.value)?;

        if let Some(tag) = self.tags.get_mut(&attribute.tid) {
            tag.apply_attribute(attribute);
        }
        Ok(())
    }

    fn add_argument(&mut self, argument: &Argument) -> Result<()> {
        let (Some(link_tid), Some(target_tid)) = (&argument.link, &argument.target) else {
            return Err(AnnotaskError::InvalidValue(format!(
                "argument '{}' is incomplete",
                argument.name
            )));
        };

        let type_name = match self.tags.get(link_tid) {
            Some(Tag::Link(link)) => link.type_name().to_string(),
            Some(Tag::Extent(_)) => {
                return Err(AnnotaskError::InvalidValue(format!(
                    "{} is an extent tag and has no arguments",
                    link_tid
                )));
            }
            None => return Err(AnnotaskError::TagNotFound(link_tid.clone())),
        };
        if !self.type_entry(&type_name)?.arguments.contains(&argument.name) {
            return Err(AnnotaskError::SchemaMismatch(format!(
                "argument '{}' is not declared on '{}'",
                argument.name, type_name
            )));
        }
        self.require_extent(target_tid)?;

        if let Some(Tag::Link(link)) = self.tags.get_mut(link_tid) {
            link.apply_argument(argument)?;
        }
        Ok(())
    }

    fn delete_tag(&mut self, tid: &str) -> Result<Vec<String>> {
        let tag = self
            .tags
            .remove(tid)
            .ok_or_else(|| AnnotaskError::TagNotFound(tid.to_string()))?;

        let mut removed = Vec::new();
        if let Tag::Extent(extent) = &tag {
            let linked: Vec<String> = self
                .links_to(tid)
                .iter()
                .map(|l| l.tid().to_string())
                .collect();
            for link_tid in linked {
                self.tags.remove(&link_tid);
                removed.push(link_tid);
            }
            self.unindex(extent);
        }

        removed.push(tid.to_string());
        Ok(removed)
    }

    fn clear_tags(&mut self) {
        self.tags.clear();
        self.anchors.clear();
    }

    fn tag(&self, tid: &str) -> Option<Tag> {
        self.tags.get(tid).cloned()
    }

    fn tags_of_type(&self, type_name: &str) -> Vec<Tag> {
        Self::sorted(
            self.tags
                .values()
                .filter(|t| t.type_name() == type_name)
                .cloned()
                .collect(),
        )
    }

    fn extent_tags_at(&self, offset: usize) -> Vec<ExtentTag> {
        let Some(tids) = self.anchors.get(&offset) else {
            return Vec::new();
        };
        let mut tags: Vec<ExtentTag> = tids
            .iter()
            .filter_map(|tid| self.tags.get(tid).and_then(Tag::as_extent).cloned())
            .collect();
        tags.sort_by(|a, b| compare_tids(a.tid(), b.tid()));
        tags
    }

    fn links_to(&self, tid: &str) -> Vec<LinkTag> {
        let mut links: Vec<LinkTag> = self
            .tags
            .values()
            .filter_map(Tag::as_link)
            .filter(|l| l.references(tid))
            .cloned()
            .collect();
        links.sort_by(|a, b| compare_tids(a.tid(), b.tid()));
        links
    }

    fn all_tags(&self) -> Vec<Tag> {
        Self::sorted(self.tags.values().cloned().collect())
    }
}
