//! Tag model: extent tags, link tags, attributes and arguments

use crate::domain::schema::{ArgumentType, AttributeType, Schema, TagType};
use crate::domain::spans::{self, SpanRange};
use crate::error::{AnnotaskError, Result};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// One attribute value on a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub tid: String,
    pub name: String,
    pub value: String,
}

impl Attribute {
    /// Create an attribute value, rejecting values outside a finite value set.
    ///
    /// The empty string means "unset" and is always accepted.
    pub fn new(tid: &str, attribute_type: &AttributeType, value: &str) -> Result<Self> {
        if !attribute_type.accepts(value) {
            return Err(AnnotaskError::InvalidValue(format!(
                "'{}' is not allowed for attribute '{}' of '{}'; expected one of {}",
                value, attribute_type.name, attribute_type.owner, attribute_type.value_set
            )));
        }

        Ok(Attribute {
            tid: tid.to_string(),
            name: attribute_type.name.clone(),
            value: value.to_string(),
        })
    }
}

/// A typed edge from a link tag to an extent tag.
///
/// Either end may still be missing while the argument is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub link: Option<String>,
    pub name: String,
    pub target: Option<String>,
}

impl Argument {
    /// Start a staged argument with neither end set
    pub fn new(argument_type: &ArgumentType) -> Self {
        Argument {
            link: None,
            name: argument_type.name.clone(),
            target: None,
        }
    }

    pub fn with_link(mut self, link_tid: &str) -> Self {
        self.link = Some(link_tid.to_string());
        self
    }

    pub fn with_target(mut self, target_tid: &str) -> Self {
        self.target = Some(target_tid.to_string());
        self
    }

    /// Both the owning link and the target are known
    pub fn is_complete(&self) -> bool {
        self.link.is_some() && self.target.is_some()
    }
}

/// A tag anchored to a (possibly empty) set of character offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtentTag {
    tid: String,
    tag_type: String,
    spans: BTreeSet<usize>,
    text: String,
    attributes: BTreeMap<String, String>,
}

impl ExtentTag {
    /// Create an extent tag over the given offsets of `document`.
    ///
    /// No offsets means a non-consuming tag.
    pub fn new<I>(tid: &str, tag_type: &TagType, offsets: I, document: &str) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        if tag_type.is_link() {
            return Err(AnnotaskError::SchemaMismatch(format!(
                "'{}' is a link type and cannot anchor extent tag {}",
                tag_type.name, tid
            )));
        }

        let mut tag = ExtentTag {
            tid: tid.to_string(),
            tag_type: tag_type.name.clone(),
            spans: BTreeSet::new(),
            text: String::new(),
            attributes: BTreeMap::new(),
        };
        tag.set_spans(offsets, document);
        Ok(tag)
    }

    /// Create an extent tag from a canonical span string such as `"0~4,9~12"`
    pub fn from_span_string(
        tid: &str,
        tag_type: &TagType,
        span_string: &str,
        document: &str,
    ) -> Result<Self> {
        let offsets = spans::string_to_offsets(span_string)?;
        Self::new(tid, tag_type, offsets, document)
    }

    pub fn tid(&self) -> &str {
        &self.tid
    }

    pub fn type_name(&self) -> &str {
        &self.tag_type
    }

    pub fn spans(&self) -> &BTreeSet<usize> {
        &self.spans
    }

    /// Merged half-open ranges of the current offsets
    pub fn ranges(&self) -> Vec<SpanRange> {
        spans::offsets_to_ranges(self.spans.iter().copied())
    }

    /// Canonical span string of the current offsets
    pub fn spans_as_string(&self) -> String {
        spans::offsets_to_string(self.spans.iter().copied())
    }

    /// Text at the current spans, as of the last `set_spans`/`refresh_text`
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_consuming(&self) -> bool {
        !self.spans.is_empty()
    }

    pub fn covers(&self, offset: usize) -> bool {
        self.spans.contains(&offset)
    }

    /// Replace the offsets and recompute the text from `document`
    pub fn set_spans<I>(&mut self, offsets: I, document: &str)
    where
        I: IntoIterator<Item = usize>,
    {
        self.spans = offsets.into_iter().collect();
        self.refresh_text(document);
    }

    /// Recompute the cached text from the current offsets
    pub fn refresh_text(&mut self, document: &str) {
        self.text = spans::slice_text(document, &self.ranges());
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Validate and set an attribute; the empty value clears it
    pub fn set_attribute(&mut self, attribute_type: &AttributeType, value: &str) -> Result<Attribute> {
        set_attribute_value(
            &mut self.attributes,
            &self.tid,
            &self.tag_type,
            attribute_type,
            value,
        )
    }

    /// Store an attribute that was validated on construction
    pub fn apply_attribute(&mut self, attribute: &Attribute) {
        apply_attribute_value(&mut self.attributes, attribute);
    }

    /// Every required attribute has a non-empty value
    pub fn is_complete(&self, tag_type: &TagType) -> bool {
        required_attributes_present(&self.attributes, tag_type)
    }
}

/// A tag connecting extent tags through named arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTag {
    tid: String,
    tag_type: String,
    arguments: BTreeMap<String, String>,
    attributes: BTreeMap<String, String>,
}

impl LinkTag {
    pub fn new(tid: &str, tag_type: &TagType) -> Result<Self> {
        if tag_type.is_extent() {
            return Err(AnnotaskError::SchemaMismatch(format!(
                "'{}' is an extent type and cannot carry link tag {}",
                tag_type.name, tid
            )));
        }

        Ok(LinkTag {
            tid: tid.to_string(),
            tag_type: tag_type.name.clone(),
            arguments: BTreeMap::new(),
            attributes: BTreeMap::new(),
        })
    }

    pub fn tid(&self) -> &str {
        &self.tid
    }

    pub fn type_name(&self) -> &str {
        &self.tag_type
    }

    /// Argument name to target tid
    pub fn arguments(&self) -> &BTreeMap<String, String> {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }

    /// Point an argument at an extent tag; the returned argument is complete
    pub fn add_argument(&mut self, argument_type: &ArgumentType, target: &ExtentTag) -> Result<Argument> {
        if argument_type.owner != self.tag_type {
            return Err(AnnotaskError::SchemaMismatch(format!(
                "argument '{}' belongs to '{}', not to '{}'",
                argument_type.name, argument_type.owner, self.tag_type
            )));
        }

        let argument = Argument::new(argument_type)
            .with_link(&self.tid)
            .with_target(target.tid());
        self.arguments
            .insert(argument.name.clone(), target.tid().to_string());
        Ok(argument)
    }

    /// Store a staged argument once both of its ends are known
    pub fn apply_argument(&mut self, argument: &Argument) -> Result<()> {
        let (Some(link), Some(target)) = (&argument.link, &argument.target) else {
            return Err(AnnotaskError::InvalidValue(format!(
                "argument '{}' is incomplete",
                argument.name
            )));
        };
        if link != &self.tid {
            return Err(AnnotaskError::InvalidValue(format!(
                "argument '{}' belongs to link {}, not {}",
                argument.name, link, self.tid
            )));
        }

        self.arguments.insert(argument.name.clone(), target.clone());
        Ok(())
    }

    pub fn remove_argument(&mut self, name: &str) -> Option<String> {
        self.arguments.remove(name)
    }

    /// Whether any argument points at the given tag
    pub fn references(&self, tid: &str) -> bool {
        self.arguments.values().any(|target| target == tid)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, attribute_type: &AttributeType, value: &str) -> Result<Attribute> {
        set_attribute_value(
            &mut self.attributes,
            &self.tid,
            &self.tag_type,
            attribute_type,
            value,
        )
    }

    pub fn apply_attribute(&mut self, attribute: &Attribute) {
        apply_attribute_value(&mut self.attributes, attribute);
    }

    /// Required attributes are set and every required argument has a target
    pub fn is_complete(&self, tag_type: &TagType) -> bool {
        required_attributes_present(&self.attributes, tag_type)
            && tag_type
                .required_argument_types()
                .all(|a| self.arguments.contains_key(&a.name))
    }
}

/// Either kind of tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Extent(ExtentTag),
    Link(LinkTag),
}

impl Tag {
    pub fn tid(&self) -> &str {
        match self {
            Tag::Extent(tag) => tag.tid(),
            Tag::Link(tag) => tag.tid(),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Tag::Extent(tag) => tag.type_name(),
            Tag::Link(tag) => tag.type_name(),
        }
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        match self {
            Tag::Extent(tag) => tag.attributes(),
            Tag::Link(tag) => tag.attributes(),
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Tag::Link(_))
    }

    pub fn as_extent(&self) -> Option<&ExtentTag> {
        match self {
            Tag::Extent(tag) => Some(tag),
            Tag::Link(_) => None,
        }
    }

    pub fn as_link(&self) -> Option<&LinkTag> {
        match self {
            Tag::Link(tag) => Some(tag),
            Tag::Extent(_) => None,
        }
    }

    pub fn set_attribute(&mut self, attribute_type: &AttributeType, value: &str) -> Result<Attribute> {
        match self {
            Tag::Extent(tag) => tag.set_attribute(attribute_type, value),
            Tag::Link(tag) => tag.set_attribute(attribute_type, value),
        }
    }

    pub fn apply_attribute(&mut self, attribute: &Attribute) {
        match self {
            Tag::Extent(tag) => tag.apply_attribute(attribute),
            Tag::Link(tag) => tag.apply_attribute(attribute),
        }
    }

    /// Check completeness against the tag's type; undeclared types are never complete
    pub fn is_complete(&self, schema: &Schema) -> bool {
        let Some(tag_type) = schema.tag_type(self.type_name()) else {
            return false;
        };
        match self {
            Tag::Extent(tag) => tag.is_complete(tag_type),
            Tag::Link(tag) => tag.is_complete(tag_type),
        }
    }
}

impl From<ExtentTag> for Tag {
    fn from(tag: ExtentTag) -> Self {
        Tag::Extent(tag)
    }
}

impl From<LinkTag> for Tag {
    fn from(tag: LinkTag) -> Self {
        Tag::Link(tag)
    }
}

/// Order tids by prefix, then by numeric suffix: N2 < N10 < V1
pub fn compare_tids(a: &str, b: &str) -> Ordering {
    let split = |tid: &str| {
        let digits = tid.len() - tid.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (prefix, number) = tid.split_at(tid.len() - digits);
        (prefix.to_string(), number.parse::<u64>().ok())
    };

    let (prefix_a, number_a) = split(a);
    let (prefix_b, number_b) = split(b);
    prefix_a
        .cmp(&prefix_b)
        .then(number_a.cmp(&number_b))
        .then_with(|| a.cmp(b))
}

fn set_attribute_value(
    attributes: &mut BTreeMap<String, String>,
    tid: &str,
    type_name: &str,
    attribute_type: &AttributeType,
    value: &str,
) -> Result<Attribute> {
    if attribute_type.owner != type_name {
        return Err(AnnotaskError::SchemaMismatch(format!(
            "attribute '{}' belongs to '{}', not to '{}'",
            attribute_type.name, attribute_type.owner, type_name
        )));
    }

    let attribute = Attribute::new(tid, attribute_type, value)?;
    apply_attribute_value(attributes, &attribute);
    Ok(attribute)
}

fn apply_attribute_value(attributes: &mut BTreeMap<String, String>, attribute: &Attribute) {
    if attribute.value.is_empty() {
        attributes.remove(&attribute.name);
    } else {
        attributes.insert(attribute.name.clone(), attribute.value.clone());
    }
}

fn required_attributes_present(attributes: &BTreeMap<String, String>, tag_type: &TagType) -> bool {
    tag_type
        .required_attribute_types()
        .all(|a| attributes.get(&a.name).is_some_and(|v| !v.is_empty()))
}
