//! Schema model: tag types, attribute types and argument types

use crate::domain::schema::ids::IdCounters;
use crate::error::{AnnotaskError, Result};
use std::fmt;

/// Allowed values of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValueSet {
    /// Any string, including the empty string
    #[default]
    FreeText,
    /// One of a fixed, ordered list of literals
    Enumerated(Vec<String>),
}

impl ValueSet {
    /// Check whether a non-empty value is allowed
    pub fn allows(&self, value: &str) -> bool {
        match self {
            ValueSet::FreeText => true,
            ValueSet::Enumerated(values) => values.iter().any(|v| v == value),
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, ValueSet::Enumerated(_))
    }
}

impl fmt::Display for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSet::FreeText => write!(f, "CDATA"),
            ValueSet::Enumerated(values) => write!(f, "({})", values.join("|")),
        }
    }
}

/// A declared attribute of a tag type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    pub name: String,
    /// Name of the owning tag type
    pub owner: String,
    pub required: bool,
    /// Empty string means no default
    pub default_value: String,
    pub value_set: ValueSet,
    /// The value is expected to name another tag's id
    pub id_ref: bool,
}

impl AttributeType {
    /// Create an attribute type, checking the value set and default.
    pub fn new(
        owner: &str,
        name: &str,
        value_set: ValueSet,
        required: bool,
        default_value: &str,
    ) -> Result<Self> {
        if let ValueSet::Enumerated(values) = &value_set {
            if values.len() < 2 {
                return Err(AnnotaskError::SchemaFormat(format!(
                    "attribute '{}' of '{}' needs at least two listed values, got {}",
                    name,
                    owner,
                    values.len()
                )));
            }
        }

        if !default_value.is_empty() && !value_set.allows(default_value) {
            return Err(AnnotaskError::SchemaFormat(format!(
                "default '{}' of attribute '{}' on '{}' is not one of {}",
                default_value, name, owner, value_set
            )));
        }

        Ok(AttributeType {
            name: name.to_string(),
            owner: owner.to_string(),
            required,
            default_value: default_value.to_string(),
            value_set,
            id_ref: false,
        })
    }

    /// Mark this attribute as holding another tag's id
    pub fn with_id_ref(mut self) -> Self {
        self.id_ref = true;
        self
    }

    /// Check a value against the value set; the empty string always passes
    pub fn accepts(&self, value: &str) -> bool {
        value.is_empty() || self.value_set.allows(value)
    }

    pub fn has_default(&self) -> bool {
        !self.default_value.is_empty()
    }
}

/// A declared argument slot of a link type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentType {
    pub name: String,
    /// Name of the owning link type
    pub owner: String,
    pub required: bool,
}

impl ArgumentType {
    /// Create an argument type owned by a link type
    pub fn new(owner: &TagType, name: &str, required: bool) -> Result<Self> {
        if !owner.is_link() {
            return Err(AnnotaskError::SchemaFormat(format!(
                "argument '{}' declared on extent type '{}'; only link types take arguments",
                name, owner.name
            )));
        }

        Ok(ArgumentType {
            name: name.to_string(),
            owner: owner.name.clone(),
            required,
        })
    }
}

/// A declared tag type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagType {
    pub name: String,
    pub prefix: String,
    is_link: bool,
    non_consuming: bool,
    attribute_types: Vec<AttributeType>,
    argument_types: Vec<ArgumentType>,
}

impl TagType {
    fn new(name: &str, prefix: String, is_link: bool) -> Self {
        TagType {
            name: name.to_string(),
            prefix,
            is_link,
            non_consuming: false,
            attribute_types: Vec::new(),
            argument_types: Vec::new(),
        }
    }

    pub fn is_link(&self) -> bool {
        self.is_link
    }

    pub fn is_extent(&self) -> bool {
        !self.is_link
    }

    /// Extent types whose tags may have an empty span
    pub fn is_non_consuming(&self) -> bool {
        self.non_consuming
    }

    pub fn attribute_types(&self) -> &[AttributeType] {
        &self.attribute_types
    }

    pub fn argument_types(&self) -> &[ArgumentType] {
        &self.argument_types
    }

    pub fn attribute_type(&self, name: &str) -> Option<&AttributeType> {
        self.attribute_types.iter().find(|a| a.name == name)
    }

    pub fn argument_type(&self, name: &str) -> Option<&ArgumentType> {
        self.argument_types.iter().find(|a| a.name == name)
    }

    pub fn required_attribute_types(&self) -> impl Iterator<Item = &AttributeType> {
        self.attribute_types.iter().filter(|a| a.required)
    }

    pub fn required_argument_types(&self) -> impl Iterator<Item = &ArgumentType> {
        self.argument_types.iter().filter(|a| a.required)
    }
}

/// The full set of declared types for one annotation task
#[derive(Debug, Clone, Default)]
pub struct Schema {
    task_name: String,
    tag_types: Vec<TagType>,
    ids: IdCounters,
}

impl Schema {
    pub fn new(task_name: &str) -> Self {
        Schema {
            task_name: task_name.to_string(),
            ..Default::default()
        }
    }

    /// Task name; also the root element name of annotated documents
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn set_task_name(&mut self, name: &str) {
        self.task_name = name.to_string();
    }

    /// All tag types in declaration order
    pub fn tag_types(&self) -> &[TagType] {
        &self.tag_types
    }

    pub fn tag_type(&self, name: &str) -> Option<&TagType> {
        self.tag_types.iter().find(|t| t.name == name)
    }

    /// Look up a tag type, failing when the schema does not declare it
    pub fn require_tag_type(&self, name: &str) -> Result<&TagType> {
        self.tag_type(name).ok_or_else(|| {
            AnnotaskError::SchemaMismatch(format!("tag type '{}' is not declared", name))
        })
    }

    fn tag_type_mut(&mut self, name: &str) -> Result<&mut TagType> {
        self.tag_types
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| {
                AnnotaskError::SchemaFormat(format!("tag type '{}' is not declared", name))
            })
    }

    pub fn extent_types(&self) -> impl Iterator<Item = &TagType> {
        self.tag_types.iter().filter(|t| t.is_extent())
    }

    pub fn link_types(&self) -> impl Iterator<Item = &TagType> {
        self.tag_types.iter().filter(|t| t.is_link())
    }

    pub fn tag_type_by_prefix(&self, prefix: &str) -> Option<&TagType> {
        self.tag_types.iter().find(|t| t.prefix == prefix)
    }

    /// Declare a tag type and assign it the shortest unused prefix of its name
    pub fn add_tag_type(&mut self, name: &str, is_link: bool) -> Result<&TagType> {
        if name.is_empty() {
            return Err(AnnotaskError::SchemaFormat(
                "tag type name cannot be empty".to_string(),
            ));
        }
        if self.tag_type(name).is_some() {
            return Err(AnnotaskError::SchemaConflict(format!(
                "tag type '{}' is declared twice",
                name
            )));
        }

        let prefix = self.shortest_free_prefix(name).ok_or_else(|| {
            AnnotaskError::SchemaConflict(format!(
                "no unused id prefix left for tag type '{}'",
                name
            ))
        })?;

        self.tag_types.push(TagType::new(name, prefix, is_link));
        let idx = self.tag_types.len() - 1;
        Ok(&self.tag_types[idx])
    }

    fn shortest_free_prefix(&self, name: &str) -> Option<String> {
        name.char_indices()
            .skip(1)
            .map(|(i, _)| &name[..i])
            .chain(std::iter::once(name))
            .find(|candidate| self.tag_type_by_prefix(candidate).is_none())
            .map(str::to_string)
    }

    /// Replace a type's automatic prefix with a custom one
    pub fn set_prefix(&mut self, type_name: &str, prefix: &str) -> Result<()> {
        if prefix.is_empty() {
            return Err(AnnotaskError::SchemaFormat(format!(
                "custom id prefix for '{}' cannot be empty",
                type_name
            )));
        }
        if let Some(other) = self.tag_type_by_prefix(prefix) {
            if other.name != type_name {
                return Err(AnnotaskError::SchemaConflict(format!(
                    "prefix '{}' for '{}' is already used by '{}'",
                    prefix, type_name, other.name
                )));
            }
        }

        self.tag_type_mut(type_name)?.prefix = prefix.to_string();
        Ok(())
    }

    /// Flag an extent type as allowing empty spans
    pub fn set_non_consuming(&mut self, type_name: &str) -> Result<()> {
        let tag_type = self.tag_type_mut(type_name)?;
        if tag_type.is_link {
            return Err(AnnotaskError::SchemaFormat(format!(
                "link type '{}' cannot be non-consuming",
                type_name
            )));
        }
        tag_type.non_consuming = true;
        Ok(())
    }

    pub fn add_attribute_type(&mut self, attribute: AttributeType) -> Result<()> {
        let tag_type = self.tag_type_mut(&attribute.owner)?;
        if tag_type.attribute_type(&attribute.name).is_some() {
            return Err(AnnotaskError::SchemaConflict(format!(
                "attribute '{}' is declared twice on '{}'",
                attribute.name, attribute.owner
            )));
        }
        tag_type.attribute_types.push(attribute);
        Ok(())
    }

    pub fn add_argument_type(&mut self, argument: ArgumentType) -> Result<()> {
        let tag_type = self.tag_type_mut(&argument.owner)?;
        if !tag_type.is_link {
            return Err(AnnotaskError::SchemaFormat(format!(
                "argument '{}' declared on extent type '{}'",
                argument.name, argument.owner
            )));
        }
        if tag_type.argument_type(&argument.name).is_some() {
            return Err(AnnotaskError::SchemaConflict(format!(
                "argument '{}' is declared twice on '{}'",
                argument.name, argument.owner
            )));
        }
        tag_type.argument_types.push(argument);
        Ok(())
    }

    /// Give every link type without arguments the binary `from`/`to` pair
    pub fn add_default_link_arguments(&mut self) {
        for tag_type in self.tag_types.iter_mut() {
            if tag_type.is_link && tag_type.argument_types.is_empty() {
                for name in ["from", "to"] {
                    tag_type.argument_types.push(ArgumentType {
                        name: name.to_string(),
                        owner: tag_type.name.clone(),
                        required: false,
                    });
                }
            }
        }
    }

    /// Generate the next unused id for a tag type
    pub fn next_id(&mut self, type_name: &str) -> Result<String> {
        let prefix = self.require_tag_type(type_name)?.prefix.clone();
        Ok(self.ids.next(type_name, &prefix))
    }

    /// Record an id seen in a loaded document so it is never handed out again.
    ///
    /// Ids are unique across the whole document, so the id advances the
    /// counter of every type whose prefix it carries, whatever its own type.
    pub fn observe_id(&mut self, tid: &str) {
        for tag_type in &self.tag_types {
            self.ids.observe(&tag_type.name, &tag_type.prefix, tid);
        }
    }

    pub fn ids(&self) -> &IdCounters {
        &self.ids
    }
}
