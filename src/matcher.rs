use crate::cache;
use thiserror::Error;

/// A half-open byte range `[start, end)` within a document.
///
/// Spans always come from matching against a specific document text; byte
/// offsets produced by the matcher fall on character boundaries of that text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Starting byte offset (inclusive)
    pub start: usize,
    /// Ending byte offset (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("pattern '{pattern}' matched 0 locations")]
    NoMatch { pattern: String },

    #[error("pattern '{pattern}' matched {count} locations, expected exactly 1")]
    AmbiguousMatch { pattern: String, count: usize },
}

fn compile(pattern: &str) -> Result<regex::Regex, LocateError> {
    cache::get_or_compile(pattern).map_err(|e| LocateError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Find all matches for a pattern, first to last.
pub fn find_all(text: &str, pattern: &str) -> Result<Vec<Span>, LocateError> {
    let re = compile(pattern)?;
    Ok(re
        .find_iter(text)
        .map(|m| Span::new(m.start(), m.end()))
        .collect())
}

/// Find exactly one match for a pattern.
///
/// Zero matches is `NoMatch`; more than one is `AmbiguousMatch` with the
/// full count. The caller is expected to refine the pattern rather than have
/// the engine pick an occurrence.
pub fn find_unique(text: &str, pattern: &str) -> Result<Span, LocateError> {
    let matches = find_all(text, pattern)?;

    match matches.len() {
        0 => Err(LocateError::NoMatch {
            pattern: pattern.to_string(),
        }),
        1 => Ok(matches[0]),
        n => Err(LocateError::AmbiguousMatch {
            pattern: pattern.to_string(),
            count: n,
        }),
    }
}

/// Resolve a target span from a start pattern and an optional end pattern.
///
/// Without `end_pattern` the span is the start pattern's own unique match.
/// With `end_pattern` the span runs from the start of the start match to the
/// end of the first end match beginning at or after the start match's end;
/// if no such end match exists the result is `NoMatch` for the end pattern.
///
/// Only the start pattern is held to the single-match rule. Patterns are
/// matched over the full document text, so multi-line patterns work.
pub fn locate(
    text: &str,
    start_pattern: &str,
    end_pattern: Option<&str>,
) -> Result<Span, LocateError> {
    let start = find_unique(text, start_pattern)?;

    let Some(end_pattern) = end_pattern else {
        return Ok(start);
    };

    let re = compile(end_pattern)?;
    match re.find_at(text, start.end) {
        Some(m) => Ok(Span::new(start.start, m.end())),
        None => Err(LocateError::NoMatch {
            pattern: end_pattern.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_single_line() {
        let text = "alpha\nbeta\ngamma\n";
        let span = find_unique(text, "beta\n").unwrap();
        assert_eq!(&text[span.range()], "beta\n");
        assert_eq!(span, Span::new(6, 11));
    }

    #[test]
    fn find_unique_no_match() {
        let result = find_unique("alpha\n", "delta");
        assert!(matches!(result, Err(LocateError::NoMatch { .. })));
    }

    #[test]
    fn find_unique_ambiguous_reports_count() {
        let text = "x\ny\nx\ny\nx\n";
        let result = find_unique(text, "x\n");
        assert_eq!(
            result,
            Err(LocateError::AmbiguousMatch {
                pattern: "x\n".to_string(),
                count: 3,
            })
        );
    }

    #[test]
    fn find_all_scan_order_is_first_to_last() {
        let spans = find_all("ab ab ab", "ab").unwrap();
        assert_eq!(
            spans,
            vec![Span::new(0, 2), Span::new(3, 5), Span::new(6, 8)]
        );
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let result = find_all("text", "(unclosed");
        assert!(matches!(result, Err(LocateError::InvalidPattern { .. })));
    }

    #[test]
    fn locate_block_spans_start_through_end() {
        let text = "fn a() {\n    body\n}\nfn b() {}\n";
        let span = locate(text, r"fn a\(\) \{", Some(r"\}\n")).unwrap();
        assert_eq!(&text[span.range()], "fn a() {\n    body\n}\n");
    }

    #[test]
    fn locate_block_takes_first_end_after_start() {
        let text = "begin\nmid\nend\nmore\nend\n";
        let span = locate(text, "begin\n", Some("end\n")).unwrap();
        assert_eq!(&text[span.range()], "begin\nmid\nend\n");
    }

    #[test]
    fn locate_block_end_before_start_does_not_qualify() {
        let text = "end\nbegin\ntail\n";
        let result = locate(text, "begin\n", Some("end\n"));
        assert!(matches!(result, Err(LocateError::NoMatch { pattern, .. }) if pattern == "end\n"));
    }

    #[test]
    fn locate_multiline_pattern() {
        let text = "a\nb\nc\n";
        let span = locate(text, "a\nb\n", None).unwrap();
        assert_eq!(&text[span.range()], "a\nb\n");
    }

    #[test]
    fn locate_is_case_sensitive() {
        let result = find_unique("Alpha\n", "alpha");
        assert!(matches!(result, Err(LocateError::NoMatch { .. })));
    }

    #[test]
    fn spans_are_byte_offsets_on_char_boundaries() {
        let text = "héllo wörld\n";
        let span = find_unique(text, "wörld").unwrap();
        assert_eq!(&text[span.range()], "wörld");
    }

    #[test]
    fn ambiguous_anchor_never_falls_back_to_first() {
        let text = "import os\nimport os\n";
        let result = locate(text, "import os\n", None);
        assert_eq!(
            result,
            Err(LocateError::AmbiguousMatch {
                pattern: "import os\n".to_string(),
                count: 2,
            })
        );
    }
}
