//! Span algebra
//!
//! A span is a set of character offsets into the primary text. It has three
//! interchangeable canonical forms:
//!
//! - sorted unique offsets: `[5, 6, 7, 10]`
//! - sorted merged half-open ranges: `[5, 8), [10, 11)`
//! - a delimited string: `"5~8,10~11"`
//!
//! The empty span is written as the placeholder `"-1~-1"`.
//!
//! # Examples
//!
//! ```
//! use annotask::domain::spans;
//!
//! assert_eq!(spans::offsets_to_string([5, 6, 7]), "5~8");
//! assert_eq!(spans::offsets_to_string([5, 7]), "5~6,7~8");
//! assert_eq!(spans::string_to_offsets("5~8").unwrap(), vec![5, 6, 7]);
//! ```

use crate::error::{AnnotaskError, Result};
use std::collections::BTreeSet;
use std::fmt;

/// String form of the empty span
pub const EMPTY_SPAN: &str = "-1~-1";

/// Joins the text of discontiguous ranges
pub const TEXT_SEPARATOR: &str = " ... ";

/// A half-open character range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanRange {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl SpanRange {
    pub fn new(start: usize, end: usize) -> Self {
        SpanRange { start, end }
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// All offsets covered by this range
    pub fn offsets(self) -> impl Iterator<Item = usize> {
        self.start..self.end
    }
}

impl fmt::Display for SpanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.start, self.end)
    }
}

/// Enumerate every offset in `[start, end)`
pub fn range(start: usize, end: usize) -> Vec<usize> {
    (start..end).collect()
}

/// Sort offsets and merge consecutive runs into half-open ranges.
///
/// Two offsets land in the same range only when the second is exactly one
/// past the first; any gap starts a new range.
pub fn offsets_to_ranges<I>(offsets: I) -> Vec<SpanRange>
where
    I: IntoIterator<Item = usize>,
{
    let sorted: BTreeSet<usize> = offsets.into_iter().collect();
    let mut ranges: Vec<SpanRange> = Vec::new();

    for offset in sorted {
        match ranges.last_mut() {
            Some(last) if last.end == offset => last.end = offset + 1,
            _ => ranges.push(SpanRange::new(offset, offset + 1)),
        }
    }

    ranges
}

/// Render ranges in canonical string form, ascending by start
pub fn ranges_to_string(ranges: &[SpanRange]) -> String {
    if ranges.is_empty() {
        return EMPTY_SPAN.to_string();
    }

    let mut sorted = ranges.to_vec();
    sorted.sort();
    sorted
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<String>>()
        .join(",")
}

/// Parse the canonical string form into ranges sorted by start.
///
/// The placeholder and the empty string both denote the empty span.
pub fn string_to_ranges(text: &str) -> Result<Vec<SpanRange>> {
    if text.is_empty() || text == EMPTY_SPAN {
        return Ok(Vec::new());
    }

    let mut ranges = Vec::new();
    for pair in text.split(',') {
        ranges.push(parse_pair(pair, text)?);
    }
    ranges.sort();

    Ok(ranges)
}

fn parse_pair(pair: &str, whole: &str) -> Result<SpanRange> {
    let (start, end) = pair.split_once('~').ok_or_else(|| {
        AnnotaskError::MalformedSpan(format!("'{}' in '{}' is not a start~end pair", pair, whole))
    })?;

    let start = parse_offset(start, whole)?;
    let end = parse_offset(end, whole)?;

    if start >= end {
        return Err(AnnotaskError::MalformedSpan(format!(
            "'{}' in '{}' must have start < end",
            pair, whole
        )));
    }

    Ok(SpanRange::new(start, end))
}

fn parse_offset(part: &str, whole: &str) -> Result<usize> {
    // `usize::from_str` accepts a leading '+', which is not a valid offset here
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AnnotaskError::MalformedSpan(format!(
            "'{}' in '{}' is not a character offset",
            part, whole
        )));
    }

    part.parse::<usize>().map_err(|e| {
        AnnotaskError::MalformedSpan(format!("'{}' in '{}': {}", part, whole, e))
    })
}

/// Render an offset set in canonical string form
pub fn offsets_to_string<I>(offsets: I) -> String
where
    I: IntoIterator<Item = usize>,
{
    ranges_to_string(&offsets_to_ranges(offsets))
}

/// Parse the canonical string form into sorted unique offsets
pub fn string_to_offsets(text: &str) -> Result<Vec<usize>> {
    let offsets: BTreeSet<usize> = string_to_ranges(text)?
        .into_iter()
        .flat_map(SpanRange::offsets)
        .collect();

    Ok(offsets.into_iter().collect())
}

/// Slice the document at the given character ranges.
///
/// Several ranges are joined with [`TEXT_SEPARATOR`]. Offsets past the end of
/// the document are clamped to its end.
pub fn slice_text(document: &str, ranges: &[SpanRange]) -> String {
    if ranges.is_empty() {
        return String::new();
    }

    // Byte position of every character boundary, including the end
    let boundaries: Vec<usize> = document
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(document.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    ranges
        .iter()
        .map(|r| {
            let start = boundaries[r.start.min(char_count)];
            let end = boundaries[r.end.min(char_count)];
            &document[start..end]
        })
        .collect::<Vec<&str>>()
        .join(TEXT_SEPARATOR)
}

/// Number of characters in the document, the upper bound for offsets
pub fn char_len(document: &str) -> usize {
    document.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_enumerates_half_open() {
        assert_eq!(range(3, 6), vec![3, 4, 5]);
        assert_eq!(range(4, 4), Vec::<usize>::new());
    }

    #[test]
    fn test_offsets_merge_only_adjacent() {
        assert_eq!(offsets_to_string([5, 6, 7]), "5~8");
        assert_eq!(offsets_to_string([5, 7]), "5~6,7~8");
    }

    #[test]
    fn test_offsets_unordered_with_duplicates() {
        assert_eq!(
            offsets_to_ranges([12, 3, 4, 3, 11]),
            vec![SpanRange::new(3, 5), SpanRange::new(11, 13)]
        );
    }

    #[test]
    fn test_empty_span_placeholder() {
        assert_eq!(offsets_to_string(Vec::<usize>::new()), EMPTY_SPAN);
        assert_eq!(string_to_offsets(EMPTY_SPAN).unwrap(), Vec::<usize>::new());
        assert_eq!(string_to_ranges("").unwrap(), Vec::new());
    }

    #[test]
    fn test_string_round_trip() {
        let offsets = vec![0, 1, 2, 9, 20, 21];
        let text = offsets_to_string(offsets.clone());
        assert_eq!(text, "0~3,9~10,20~22");
        assert_eq!(string_to_offsets(&text).unwrap(), offsets);
    }

    #[test]
    fn test_string_to_ranges_sorts_pairs() {
        assert_eq!(
            string_to_ranges("7~8,5~6").unwrap(),
            vec![SpanRange::new(5, 6), SpanRange::new(7, 8)]
        );
    }

    #[test]
    fn test_rejects_start_not_before_end() {
        assert!(matches!(
            string_to_ranges("5~5"),
            Err(AnnotaskError::MalformedSpan(_))
        ));
        assert!(matches!(
            string_to_ranges("8~5"),
            Err(AnnotaskError::MalformedSpan(_))
        ));
    }

    #[test]
    fn test_rejects_foreign_separators_and_whitespace() {
        for bad in ["5-8", "5~8;9~10", "5~8, 9~10", " 5~8", "5~8,", "a~b", "+5~8"] {
            assert!(
                matches!(string_to_ranges(bad), Err(AnnotaskError::MalformedSpan(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_placeholder_inside_list_is_malformed() {
        assert!(string_to_ranges("-1~-1,3~4").is_err());
    }

    #[test]
    fn test_slice_text_single_and_multiple_ranges() {
        let doc = "John ran home quickly";
        assert_eq!(slice_text(doc, &[SpanRange::new(0, 4)]), "John");
        assert_eq!(
            slice_text(doc, &[SpanRange::new(0, 4), SpanRange::new(14, 21)]),
            "John ... quickly"
        );
        assert_eq!(slice_text(doc, &[]), "");
    }

    #[test]
    fn test_slice_text_counts_characters_not_bytes() {
        let doc = "naïve 😀 text";
        assert_eq!(slice_text(doc, &[SpanRange::new(0, 5)]), "naïve");
        assert_eq!(slice_text(doc, &[SpanRange::new(6, 7)]), "😀");
        assert_eq!(slice_text(doc, &[SpanRange::new(8, 12)]), "text");
    }

    #[test]
    fn test_slice_text_clamps_past_end() {
        assert_eq!(slice_text("abc", &[SpanRange::new(1, 10)]), "bc");
        assert_eq!(slice_text("abc", &[SpanRange::new(5, 10)]), "");
    }

    #[test]
    fn test_span_range_helpers() {
        let r = SpanRange::new(2, 5);
        assert_eq!(r.len(), 3);
        assert!(!r.is_empty());
        assert!(r.contains(2));
        assert!(!r.contains(5));
        assert_eq!(r.to_string(), "2~5");
    }
}
