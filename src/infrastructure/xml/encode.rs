//! Render a document and its tags in the interchange format

use crate::domain::schema::Schema;
use crate::domain::tags::{compare_tids, ExtentTag, LinkTag, Tag};
use quick_xml::escape::escape;
use std::collections::HashMap;

/// Root element name used when the schema has no task name
pub const DEFAULT_ROOT: &str = "Task";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Write the denormalized `text` attribute on extent tags
    pub write_text_attributes: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            write_text_attributes: true,
        }
    }
}

/// Encode the primary text and its tags as an annotated document.
///
/// Extent tags come before link tags so a linear reader can resolve
/// argument targets. Within each group tags follow schema type order, then
/// natural id order. Tags of types the schema does not declare are skipped.
pub fn encode(schema: &Schema, text: &str, tags: &[Tag], options: &EncodeOptions) -> String {
    let root = if schema.task_name().is_empty() {
        DEFAULT_ROOT
    } else {
        schema.task_name()
    };

    let type_order: HashMap<&str, usize> = schema
        .tag_types()
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    let mut ordered: Vec<&Tag> = Vec::with_capacity(tags.len());
    for tag in tags {
        if type_order.contains_key(tag.type_name()) {
            ordered.push(tag);
        } else {
            log::warn!(
                "Skipping {}: type '{}' is not in the schema",
                tag.tid(),
                tag.type_name()
            );
        }
    }
    ordered.sort_by(|a, b| {
        a.is_link()
            .cmp(&b.is_link())
            .then_with(|| type_order[a.type_name()].cmp(&type_order[b.type_name()]))
            .then_with(|| compare_tids(a.tid(), b.tid()))
    });

    let extents: HashMap<&str, &ExtentTag> = tags
        .iter()
        .filter_map(Tag::as_extent)
        .map(|e| (e.tid(), e))
        .collect();

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n");
    out.push_str(&format!("<{}>\n", root));
    out.push_str(&format!("<TEXT>{}</TEXT>\n", cdata(text)));
    out.push_str("<TAGS>\n");

    for tag in ordered {
        let line = match tag {
            Tag::Extent(extent) => extent_element(schema, extent, options),
            Tag::Link(link) => link_element(schema, link, &extents),
        };
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str("</TAGS>\n");
    out.push_str(&format!("</{}>\n", root));
    out
}

/// Wrap text in CDATA, splitting any `]]>` over two sections
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

fn extent_element(schema: &Schema, tag: &ExtentTag, options: &EncodeOptions) -> String {
    let mut element = format!("<{}", tag.type_name());
    push_attribute(&mut element, "id", tag.tid());
    push_attribute(&mut element, "spans", &tag.spans_as_string());
    if options.write_text_attributes && !tag.text().is_empty() {
        push_attribute(&mut element, "text", tag.text());
    }
    push_tag_attributes(&mut element, schema, tag.type_name(), |name| tag.attribute(name));
    element.push_str(" />");
    element
}

fn link_element(schema: &Schema, tag: &LinkTag, extents: &HashMap<&str, &ExtentTag>) -> String {
    let mut element = format!("<{}", tag.type_name());
    push_attribute(&mut element, "id", tag.tid());
    push_tag_attributes(&mut element, schema, tag.type_name(), |name| tag.attribute(name));

    if let Some(tag_type) = schema.tag_type(tag.type_name()) {
        for argument_type in tag_type.argument_types() {
            let Some(target) = tag.argument(&argument_type.name) else {
                continue;
            };
            push_attribute(&mut element, &format!("{}ID", argument_type.name), target);
            // Only targets in the encoded set have text to denormalize
            match extents.get(target).map(|e| e.text()) {
                Some(text) if !text.is_empty() => {
                    push_attribute(&mut element, &format!("{}Text", argument_type.name), text);
                }
                _ => {}
            }
        }
    }

    element.push_str(" />");
    element
}

/// Non-empty attribute values in schema declaration order
fn push_tag_attributes<'a, F>(element: &mut String, schema: &Schema, type_name: &str, value_of: F)
where
    F: Fn(&str) -> Option<&'a str>,
{
    let Some(tag_type) = schema.tag_type(type_name) else {
        return;
    };
    for attribute_type in tag_type.attribute_types() {
        if let Some(value) = value_of(&attribute_type.name).filter(|v| !v.is_empty()) {
            push_attribute(element, &attribute_type.name, value);
        }
    }
}

fn push_attribute(element: &mut String, name: &str, value: &str) {
    element.push(' ');
    element.push_str(name);
    element.push_str("=\"");
    element.push_str(&escape(value));
    element.push('"');
}
