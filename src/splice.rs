//! Pure text splicing: the application half of an edit.
//!
//! Every operation here is a function of `(document text, span, content)` to
//! new document text. No I/O happens in this module; span acquisition and
//! verification live in [`crate::matcher`] and [`crate::verify`], and
//! persistence lives in [`crate::document`].

use crate::matcher::Span;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpliceError {
    #[error("invalid span: [{start}, {end}) in document of length {len}")]
    InvalidSpan {
        start: usize,
        end: usize,
        len: usize,
    },
}

/// Extract the text at a span, validating bounds and character boundaries.
pub fn slice(text: &str, span: Span) -> Result<&str, SpliceError> {
    if span.start > span.end {
        return Err(invalid(text, span));
    }
    text.get(span.range()).ok_or_else(|| invalid(text, span))
}

fn invalid(text: &str, span: Span) -> SpliceError {
    SpliceError::InvalidSpan {
        start: span.start,
        end: span.end,
        len: text.len(),
    }
}

/// Join content lines with the document's separator convention.
fn join_lines(content: &[String], sep: &str) -> String {
    content.join(sep)
}

/// Remove the text in `[span.start, span.end)` entirely.
pub fn delete(text: &str, span: Span) -> Result<String, SpliceError> {
    slice(text, span)?;

    let mut out = String::with_capacity(text.len() - span.len());
    out.push_str(&text[..span.start]);
    out.push_str(&text[span.end..]);
    Ok(out)
}

/// Remove `[span.start, span.end)` and put `content` in its place.
///
/// The seam is normalized: when the removed text ended with the separator,
/// the replacement block is terminated with one too, so the surrounding
/// line structure survives without duplicate or missing breaks.
pub fn replace(
    text: &str,
    span: Span,
    content: &[String],
    sep: &str,
) -> Result<String, SpliceError> {
    let removed = slice(text, span)?;

    let mut block = join_lines(content, sep);
    if removed.ends_with(sep) && !block.ends_with(sep) {
        block.push_str(sep);
    }

    let mut out = String::with_capacity(text.len() - span.len() + block.len());
    out.push_str(&text[..span.start]);
    out.push_str(&block);
    out.push_str(&text[span.end..]);
    Ok(out)
}

/// Insert `content` immediately after the end of the anchor match.
///
/// Text on both sides of the insertion point is untouched. When the anchor
/// match ends with the separator the inserted lines are terminated with one
/// as well, keeping them whole lines rather than merging into the next.
pub fn insert_after(
    text: &str,
    anchor: Span,
    content: &[String],
    sep: &str,
) -> Result<String, SpliceError> {
    let anchored = slice(text, anchor)?;

    let mut block = join_lines(content, sep);
    if anchored.ends_with(sep) && !block.ends_with(sep) {
        block.push_str(sep);
    }

    Ok(insert_at(text, anchor.end, &block))
}

/// Insert `content` immediately before the start of the anchor match.
///
/// Symmetric to [`insert_after`]: when the anchor match begins at a line
/// boundary, the inserted lines are terminated with the separator so the
/// anchor stays at the start of its own line.
pub fn insert_before(
    text: &str,
    anchor: Span,
    content: &[String],
    sep: &str,
) -> Result<String, SpliceError> {
    slice(text, anchor)?;

    let at_line_start = anchor.start == 0 || text[..anchor.start].ends_with(sep);
    let mut block = join_lines(content, sep);
    if at_line_start && !block.ends_with(sep) {
        block.push_str(sep);
    }

    Ok(insert_at(text, anchor.start, &block))
}

fn insert_at(text: &str, pos: usize, block: &str) -> String {
    let mut out = String::with_capacity(text.len() + block.len());
    out.push_str(&text[..pos]);
    out.push_str(block);
    out.push_str(&text[pos..]);
    out
}
