//! Read annotated documents back against a schema
//!
//! Decoding is tolerant of per-element problems: an element with a missing
//! or duplicate id, malformed spans, an undeclared attribute or a bad
//! argument reference is repaired or dropped with a warning, while a broken
//! document structure or an element type unknown to the schema fails the
//! whole decode.

use super::scan::{scan, ScanEvent};
use crate::domain::schema::{Schema, TagType};
use crate::domain::spans::{self, SpanRange};
use crate::domain::tags::{ExtentTag, LinkTag, Tag};
use crate::error::{AnnotaskError, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::ControlFlow;

/// Attribute names an extent element uses for its own bookkeeping
const RESERVED_EXTENT_ATTRIBUTES: [&str; 5] = ["id", "spans", "start", "end", "text"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fail instead of falling back to plain text when the root element
    /// does not name the schema's task
    pub require_task_match: bool,
}

/// A recovered per-element problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeWarning {
    pub element: String,
    pub tid: Option<String>,
    pub message: String,
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tid {
            Some(tid) => write!(f, "<{}> {}: {}", self.element, tid, self.message),
            None => write!(f, "<{}>: {}", self.element, self.message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnnotatedDocument {
    pub task_name: String,
    pub text: String,
    /// Extent tags in document order, then link tags in document order
    pub tags: Vec<Tag>,
    pub warnings: Vec<DecodeWarning>,
}

#[derive(Debug, Clone)]
pub enum Decoded {
    Annotated(AnnotatedDocument),
    /// The root element did not match the task; the whole file is text
    PlainText(String),
}

/// One child element of `<TAGS>`
#[derive(Debug, Clone)]
struct RawElement {
    name: String,
    attributes: Vec<(String, String)>,
}

impl RawElement {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Default)]
struct RawDocument {
    root: String,
    text: Option<String>,
    elements: Vec<RawElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Text,
    Tags,
}

/// Collect the root name, primary text and tag elements in one scan
fn read_structure(xml: &str) -> Result<RawDocument> {
    let mut raw = RawDocument::default();
    let mut section = Section::Other;

    scan(xml, |event| {
        match event {
            ScanEvent::Open {
                name, depth: 0, ..
            } => raw.root = name,
            ScanEvent::Open {
                name,
                depth: 1,
                empty,
                ..
            } => {
                section = match name.as_str() {
                    "TEXT" if raw.text.is_none() => {
                        raw.text = Some(String::new());
                        Section::Text
                    }
                    "TAGS" => Section::Tags,
                    _ => Section::Other,
                };
                if empty {
                    section = Section::Other;
                }
            }
            ScanEvent::Open {
                name,
                attributes,
                depth: 2,
                ..
            } if section == Section::Tags => raw.elements.push(RawElement { name, attributes }),
            ScanEvent::Close { depth: 1, .. } => section = Section::Other,
            ScanEvent::Text { content, depth: 2 } if section == Section::Text => {
                if let Some(text) = raw.text.as_mut() {
                    text.push_str(&content);
                }
            }
            _ => {}
        }
        ControlFlow::Continue(())
    })?;

    Ok(raw)
}

/// Decode an annotated document against `schema`.
///
/// A well-formed document whose root does not name the task decodes as
/// [`Decoded::PlainText`] unless the options require a match.
pub fn decode(xml: &str, schema: &Schema, options: &DecodeOptions) -> Result<Decoded> {
    let raw = read_structure(xml)?;

    let task_name = schema.task_name();
    if !task_name.is_empty() && raw.root != task_name {
        if options.require_task_match {
            return Err(AnnotaskError::SchemaMismatch(format!(
                "document root <{}> does not match task '{}'",
                raw.root, task_name
            )));
        }
        log::info!(
            "Root <{}> does not match task '{}'; reading the file as plain text",
            raw.root,
            task_name
        );
        return Ok(Decoded::PlainText(xml.to_string()));
    }

    let Some(text) = raw.text else {
        return Err(AnnotaskError::DocumentFormat(
            "document has no <TEXT> element".to_string(),
        ));
    };

    let mut typed = Vec::with_capacity(raw.elements.len());
    for element in &raw.elements {
        let tag_type = schema.tag_type(&element.name).ok_or_else(|| {
            AnnotaskError::SchemaMismatch(format!(
                "element <{}> is not a tag type of task '{}'",
                element.name,
                schema.task_name()
            ))
        })?;
        typed.push((element, tag_type));
    }

    let mut decoder = Decoder {
        text: &text,
        seen: HashSet::new(),
        extents: HashMap::new(),
        warnings: Vec::new(),
    };

    let mut tags = Vec::new();
    for (element, tag_type) in typed.iter().filter(|(_, t)| t.is_extent()) {
        if let Some(tag) = decoder.extent(element, tag_type) {
            decoder.extents.insert(tag.tid().to_string(), tag.clone());
            tags.push(Tag::Extent(tag));
        }
    }
    for (element, tag_type) in typed.iter().filter(|(_, t)| t.is_link()) {
        if let Some(tag) = decoder.link(element, tag_type) {
            tags.push(Tag::Link(tag));
        }
    }

    log::debug!(
        "Decoded {} tag(s) with {} warning(s) for task '{}'",
        tags.len(),
        decoder.warnings.len(),
        raw.root
    );

    let warnings = decoder.warnings;
    Ok(Decoded::Annotated(AnnotatedDocument {
        task_name: raw.root,
        text,
        tags,
        warnings,
    }))
}

struct Decoder<'a> {
    text: &'a str,
    seen: HashSet<String>,
    extents: HashMap<String, ExtentTag>,
    warnings: Vec<DecodeWarning>,
}

impl Decoder<'_> {
    fn warn(&mut self, element: &RawElement, tid: Option<&str>, message: String) {
        let warning = DecodeWarning {
            element: element.name.clone(),
            tid: tid.map(str::to_string),
            message,
        };
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Claim the element's id, or explain why it cannot be used
    fn claim_id(&mut self, element: &RawElement) -> Option<String> {
        match element.attribute("id").filter(|tid| !tid.is_empty()) {
            None => {
                self.warn(element, None, "missing id; element dropped".to_string());
                None
            }
            Some(tid) if self.seen.contains(tid) => {
                self.warn(element, Some(tid), "duplicate id; element dropped".to_string());
                None
            }
            Some(tid) => {
                self.seen.insert(tid.to_string());
                Some(tid.to_string())
            }
        }
    }

    fn extent(&mut self, element: &RawElement, tag_type: &TagType) -> Option<ExtentTag> {
        let tid = self.claim_id(element)?;

        let ranges = match resolve_ranges(element) {
            Ok(Some(ranges)) => ranges,
            Ok(None) => {
                if !tag_type.is_non_consuming() {
                    self.warn(
                        element,
                        Some(tid.as_str()),
                        "no spans given; treated as non-consuming".to_string(),
                    );
                }
                Vec::new()
            }
            Err(e) => {
                self.warn(element, Some(tid.as_str()), format!("{}; element dropped", e));
                return None;
            }
        };

        // Bounds are checked on ranges so an absurd end never gets expanded
        let length = spans::char_len(self.text);
        if ranges.iter().any(|range| range.end > length) {
            self.warn(
                element,
                Some(tid.as_str()),
                format!(
                    "spans run past the end of the text ({} characters); element dropped",
                    length
                ),
            );
            return None;
        }
        let offsets = ranges.into_iter().flat_map(SpanRange::offsets);

        let mut tag = match ExtentTag::new(&tid, tag_type, offsets, self.text) {
            Ok(tag) => tag,
            Err(e) => {
                self.warn(element, Some(tid.as_str()), format!("{}; element dropped", e));
                return None;
            }
        };

        for (name, value) in &element.attributes {
            if RESERVED_EXTENT_ATTRIBUTES.contains(&name.as_str()) {
                continue;
            }
            self.attribute(element, tag_type, &tid, name, value, |attribute_type| {
                tag.set_attribute(attribute_type, value)
            });
        }

        Some(tag)
    }

    fn link(&mut self, element: &RawElement, tag_type: &TagType) -> Option<LinkTag> {
        let tid = self.claim_id(element)?;

        let mut tag = match LinkTag::new(&tid, tag_type) {
            Ok(tag) => tag,
            Err(e) => {
                self.warn(element, Some(tid.as_str()), format!("{}; element dropped", e));
                return None;
            }
        };

        let mut consumed: HashSet<String> = HashSet::from(["id".to_string()]);
        for argument_type in tag_type.argument_types() {
            let id_key = format!("{}ID", argument_type.name);
            consumed.insert(format!("{}Text", argument_type.name));

            let target = element
                .attribute(&id_key)
                .filter(|target| !target.is_empty())
                .map(str::to_string);
            consumed.insert(id_key);

            let Some(target) = target else {
                continue;
            };
            match self.extents.get(&target) {
                Some(extent) => {
                    if let Err(e) = tag.add_argument(argument_type, extent) {
                        self.warn(element, Some(tid.as_str()), e.to_string());
                    }
                }
                None => self.warn(
                    element,
                    Some(tid.as_str()),
                    format!(
                        "argument '{}' refers to unknown extent tag {}; left unset",
                        argument_type.name, target
                    ),
                ),
            }
        }

        for (name, value) in &element.attributes {
            if consumed.contains(name) {
                continue;
            }
            self.attribute(element, tag_type, &tid, name, value, |attribute_type| {
                tag.set_attribute(attribute_type, value)
            });
        }

        Some(tag)
    }

    /// Apply one free attribute through `set`, dropping it with a warning
    /// when it is undeclared or its value is not allowed
    fn attribute<F, T>(
        &mut self,
        element: &RawElement,
        tag_type: &TagType,
        tid: &str,
        name: &str,
        value: &str,
        set: F,
    ) where
        F: FnOnce(&crate::domain::schema::AttributeType) -> Result<T>,
    {
        if value.is_empty() {
            return;
        }
        let Some(attribute_type) = tag_type.attribute_type(name) else {
            self.warn(
                element,
                Some(tid),
                format!("attribute '{}' is not declared for {}; dropped", name, tag_type.name),
            );
            return;
        };
        if let Err(e) = set(attribute_type) {
            self.warn(element, Some(tid), format!("{}; dropped", e));
        }
    }
}

/// Offsets from `spans`, or from the legacy `start`/`end` pair.
///
/// `Ok(None)` means the element carries no span information at all.
fn resolve_ranges(element: &RawElement) -> Result<Option<Vec<SpanRange>>> {
    if let Some(span_string) = element.attribute("spans") {
        return spans::string_to_ranges(span_string).map(Some);
    }

    match (element.attribute("start"), element.attribute("end")) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let (start, end) = (parse_legacy_offset(start)?, parse_legacy_offset(end)?);
            match (start, end) {
                (-1, -1) => Ok(Some(Vec::new())),
                (s, e) if s >= 0 && e > s => Ok(Some(vec![SpanRange::new(s as usize, e as usize)])),
                (s, e) => Err(AnnotaskError::MalformedSpan(format!(
                    "start {} and end {} do not form a span",
                    s, e
                ))),
            }
        }
        _ => Err(AnnotaskError::MalformedSpan(
            "start and end must be given together".to_string(),
        )),
    }
}

fn parse_legacy_offset(value: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| {
        AnnotaskError::MalformedSpan(format!("'{}' is not a character offset", value))
    })
}
