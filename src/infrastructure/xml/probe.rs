//! Cheap structural checks that stop short of decoding tags

use super::scan::{scan, ScanEvent};
use std::ops::ControlFlow;

/// Whether the whole document parses as well-formed XML
pub fn is_well_formed(xml: &str) -> bool {
    scan(xml, |_| ControlFlow::Continue(())).is_ok()
}

/// Name of the root element, if the document gets that far
pub fn root_name(xml: &str) -> Option<String> {
    let mut root = None;
    let scanned = scan(xml, |event| match event {
        ScanEvent::Open { name, .. } => {
            root = Some(name);
            ControlFlow::Break(())
        }
        _ => ControlFlow::Continue(()),
    });
    scanned.ok().and(root)
}

pub fn is_task_name_matching(xml: &str, task_name: &str) -> bool {
    root_name(xml).as_deref() == Some(task_name)
}

/// Content of the first `<TEXT>` element directly under the root
pub fn primary_text(xml: &str) -> Option<String> {
    let mut text: Option<String> = None;
    let mut inside = false;

    let scanned = scan(xml, |event| match event {
        ScanEvent::Open {
            name,
            depth: 1,
            empty,
            ..
        } if name == "TEXT" => {
            text = Some(String::new());
            if empty {
                ControlFlow::Break(())
            } else {
                inside = true;
                ControlFlow::Continue(())
            }
        }
        ScanEvent::Text { content, depth: 2 } if inside => {
            if let Some(text) = text.as_mut() {
                text.push_str(&content);
            }
            ControlFlow::Continue(())
        }
        ScanEvent::Close { depth: 1, .. } if inside => ControlFlow::Break(()),
        _ => ControlFlow::Continue(()),
    });

    scanned.ok().and(text)
}

/// Exact comparison of the primary text with `text`
pub fn is_primary_text_matching(xml: &str, text: &str) -> bool {
    primary_text(xml).as_deref() == Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "<?xml version=\"1.0\"?>\n<People>\n<TEXT><![CDATA[ Alice\n]]></TEXT>\n<TAGS>\n<PERSON id=\"P0\" spans=\"1~6\" />\n</TAGS>\n</People>\n";

    #[test]
    fn test_well_formed() {
        assert!(is_well_formed(DOCUMENT));
        assert!(!is_well_formed("<People><TEXT></People>"));
        assert!(!is_well_formed("just words"));
    }

    #[test]
    fn test_root_name() {
        assert_eq!(root_name(DOCUMENT).as_deref(), Some("People"));
        assert!(is_task_name_matching(DOCUMENT, "People"));
        assert!(!is_task_name_matching(DOCUMENT, "people"));
        assert_eq!(root_name("not xml at all"), None);
    }

    #[test]
    fn test_primary_text() {
        assert_eq!(primary_text(DOCUMENT).as_deref(), Some(" Alice\n"));
        assert!(is_primary_text_matching(DOCUMENT, " Alice\n"));
        assert!(!is_primary_text_matching(DOCUMENT, "Alice"));
        assert_eq!(primary_text("<People><TEXT/></People>").as_deref(), Some(""));
        assert_eq!(primary_text("<People><TAGS/></People>"), None);
    }

    #[test]
    fn test_primary_text_ignores_nested_text_elements() {
        let xml = "<People><TAGS><TEXT>no</TEXT></TAGS><TEXT>yes</TEXT></People>";
        assert_eq!(primary_text(xml).as_deref(), Some("yes"));
    }
}
