//! Well-formedness checking event scan over quick-xml

use crate::error::{AnnotaskError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::ControlFlow;

/// Structural events seen by a scan visitor.
///
/// `depth` is the nesting level of the event: the root element opens at
/// depth 0 and its direct children at depth 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScanEvent {
    Open {
        name: String,
        attributes: Vec<(String, String)>,
        depth: usize,
        /// Self-closing element; no `Close` follows
        empty: bool,
    },
    Close {
        name: String,
        depth: usize,
    },
    /// Character data (escaped text or a CDATA section)
    Text {
        content: String,
        depth: usize,
    },
}

/// Walk the document, checking it is well-formed and handing each
/// structural event to `visit`.
///
/// When the visitor breaks, the scan stops early and the rest of the
/// document is not checked.
pub(crate) fn scan<F>(xml: &str, mut visit: F) -> Result<()>
where
    F: FnMut(ScanEvent) -> ControlFlow<()>,
{
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut depth = 0;
    let mut root_seen = false;

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|e| malformed(position, e))?;

        let scanned = match event {
            Event::Start(start) | Event::Empty(start) if depth == 0 && root_seen => {
                return Err(AnnotaskError::DocumentFormat(format!(
                    "second root element <{}> at byte {}",
                    element_name(&start),
                    position
                )));
            }
            Event::Start(start) => {
                root_seen = true;
                let open = ScanEvent::Open {
                    name: element_name(&start),
                    attributes: element_attributes(&start, position)?,
                    depth,
                    empty: false,
                };
                depth += 1;
                open
            }
            Event::Empty(start) => {
                root_seen = true;
                ScanEvent::Open {
                    name: element_name(&start),
                    attributes: element_attributes(&start, position)?,
                    depth,
                    empty: true,
                }
            }
            Event::End(end) => {
                if depth == 0 {
                    return Err(AnnotaskError::DocumentFormat(format!(
                        "closing tag without an open element at byte {}",
                        position
                    )));
                }
                depth -= 1;
                ScanEvent::Close {
                    name: String::from_utf8_lossy(end.name().as_ref()).into_owned(),
                    depth,
                }
            }
            Event::Text(text) => {
                let content = text.unescape().map_err(|e| malformed(position, e))?;
                if depth == 0 {
                    if content.trim().is_empty() {
                        continue;
                    }
                    return Err(AnnotaskError::DocumentFormat(format!(
                        "text outside of the root element at byte {}",
                        position
                    )));
                }
                ScanEvent::Text {
                    content: content.into_owned(),
                    depth,
                }
            }
            Event::CData(cdata) => {
                if depth == 0 {
                    return Err(AnnotaskError::DocumentFormat(format!(
                        "CDATA outside of the root element at byte {}",
                        position
                    )));
                }
                let bytes = cdata.into_inner();
                let content = std::str::from_utf8(&bytes)
                    .map_err(|e| malformed(position, e))?
                    .to_string();
                ScanEvent::Text { content, depth }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => continue,
        };

        if visit(scanned).is_break() {
            return Ok(());
        }
    }

    if depth != 0 {
        return Err(AnnotaskError::DocumentFormat(format!(
            "{} element(s) never closed",
            depth
        )));
    }
    if !root_seen {
        return Err(AnnotaskError::DocumentFormat(
            "document has no root element".to_string(),
        ));
    }

    Ok(())
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn element_attributes(start: &BytesStart<'_>, position: usize) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| malformed(position, e))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| malformed(position, e))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

fn malformed(position: usize, error: impl std::fmt::Display) -> AnnotaskError {
    AnnotaskError::DocumentFormat(format!("not well-formed XML near byte {}: {}", position, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Result<Vec<ScanEvent>> {
        let mut events = Vec::new();
        scan(xml, |event| {
            events.push(event);
            ControlFlow::Continue(())
        })?;
        Ok(events)
    }

    #[test]
    fn test_scan_reports_depths() {
        let events = collect("<?xml version=\"1.0\"?><R><A x=\"1\"/>hi</R>").unwrap();
        assert_eq!(
            events,
            vec![
                ScanEvent::Open {
                    name: "R".to_string(),
                    attributes: vec![],
                    depth: 0,
                    empty: false
                },
                ScanEvent::Open {
                    name: "A".to_string(),
                    attributes: vec![("x".to_string(), "1".to_string())],
                    depth: 1,
                    empty: true
                },
                ScanEvent::Text {
                    content: "hi".to_string(),
                    depth: 1
                },
                ScanEvent::Close {
                    name: "R".to_string(),
                    depth: 0
                },
            ]
        );
    }

    #[test]
    fn test_scan_unescapes_and_keeps_cdata_raw() {
        let events = collect("<R>a &amp; b<![CDATA[<x> & y]]></R>").unwrap();
        let texts: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["a & b", "<x> & y"]);
    }

    #[test]
    fn test_scan_rejects_malformed() {
        for bad in [
            "<R><A></R>",
            "<R>",
            "<R></R><S/>",
            "stray<R/>",
            "",
            "<R a=\"1\" a=\"2\"/>",
            "<R>&bogus;</R>",
        ] {
            assert!(
                matches!(collect(bad), Err(AnnotaskError::DocumentFormat(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_scan_stops_when_visitor_breaks() {
        let mut seen = 0;
        let result = scan("<R><A/><B/>", |_| {
            seen += 1;
            if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(result.is_ok());
        assert_eq!(seen, 2);
    }
}
