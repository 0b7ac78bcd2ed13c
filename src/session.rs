//! Edit session: ordered application of edit specs to one document.
//!
//! Each edit is resolved against the document state produced by the previous
//! edit, not against the original snapshot. Patterns are re-matched fresh per
//! edit, which is what keeps a multi-edit request correct when an earlier
//! edit changes the text a later pattern must find; there is deliberately no
//! offset-shift arithmetic here.

use crate::document::Document;
use crate::matcher::{self, LocateError, Span};
use crate::request::schema::{EditKind, EditSpec};
use crate::splice;
use crate::verify;
use std::fmt;

/// Per-edit result. Failures are ordinary data: a pattern that does not
/// match or a span that fails verification is an expected outcome of
/// content-addressed editing, not a fault.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "EditOutcome should be checked for success/failure"]
pub enum EditOutcome {
    /// Edit was applied at the resolved span of the then-current document
    Applied { span: Span },
    /// A required pattern matched nothing
    PatternNotFound { pattern: String },
    /// A pattern that must be unique matched more than once
    PatternAmbiguous { pattern: String, count: usize },
    /// The located span did not hold the expected content
    VerificationFailed {
        expected: String,
        actual: String,
        similarity: f64,
    },
    /// The edit itself was structurally invalid
    InvalidSpec { reason: String },
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied { .. })
    }
}

impl fmt::Display for EditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOutcome::Applied { span } => {
                write!(f, "applied at [{}, {})", span.start, span.end)
            }
            EditOutcome::PatternNotFound { pattern } => {
                write!(f, "pattern '{pattern}' matched 0 locations")
            }
            EditOutcome::PatternAmbiguous { pattern, count } => {
                write!(
                    f,
                    "pattern '{pattern}' matched {count} locations, expected exactly 1"
                )
            }
            EditOutcome::VerificationFailed {
                expected, actual, ..
            } => {
                write!(
                    f,
                    "content verification failed: expected {expected:?}, found {actual:?}"
                )
            }
            EditOutcome::InvalidSpec { reason } => write!(f, "invalid edit: {reason}"),
        }
    }
}

/// Result of processing one request: the document state reached, plus one
/// outcome per attempted edit, tagged with the edit's index in the request.
///
/// When an edit fails, processing stops there; edits applied before the
/// failing one remain applied to the returned document, and the caller
/// decides whether to persist or discard that partial state.
#[derive(Debug, Clone)]
pub struct SessionReport {
    document: Document,
    outcomes: Vec<(usize, EditOutcome)>,
    requested: usize,
}

impl SessionReport {
    pub fn text(&self) -> &str {
        self.document.text()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn outcomes(&self) -> &[(usize, EditOutcome)] {
        &self.outcomes
    }

    /// True when every requested edit was attempted and applied.
    pub fn succeeded(&self) -> bool {
        self.outcomes.len() == self.requested && self.outcomes.iter().all(|(_, o)| o.is_applied())
    }

    /// The failing outcome, if the session stopped early.
    pub fn failure(&self) -> Option<&(usize, EditOutcome)> {
        self.outcomes.iter().find(|(_, o)| !o.is_applied())
    }
}

/// Orchestrates one request against one document.
///
/// The session owns the document for the duration of the request and is
/// consumed by [`EditSession::run`].
#[derive(Debug)]
pub struct EditSession {
    document: Document,
}

impl EditSession {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Apply the edits strictly in request order, stopping at the first
    /// failure.
    pub fn run(mut self, specs: &[EditSpec]) -> SessionReport {
        let sep = self.document.separator().as_str();
        let mut outcomes = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            match apply_edit(self.document.text(), sep, spec) {
                Ok((new_text, span)) => {
                    self.document.set_text(new_text);
                    outcomes.push((index, EditOutcome::Applied { span }));
                }
                Err(outcome) => {
                    outcomes.push((index, outcome));
                    break;
                }
            }
        }

        SessionReport {
            document: self.document,
            outcomes,
            requested: specs.len(),
        }
    }
}

/// Resolve, verify, and apply a single edit against the current text.
///
/// Verification happens strictly before mutation: any failure returns the
/// outcome without touching the text.
fn apply_edit(text: &str, sep: &str, spec: &EditSpec) -> Result<(String, Span), EditOutcome> {
    spec.validate()
        .map_err(|reason| EditOutcome::InvalidSpec { reason })?;

    let span = resolve_span(text, spec)?;

    let verification = spec
        .verification()
        .map_err(|reason| EditOutcome::InvalidSpec { reason })?;
    if let Some(verification) = verification {
        let actual = splice::slice(text, span).map_err(|e| EditOutcome::InvalidSpec {
            reason: e.to_string(),
        })?;
        verify::verify(actual, &verification).map_err(|failure| {
            EditOutcome::VerificationFailed {
                expected: failure.expected,
                actual: failure.actual,
                similarity: failure.similarity,
            }
        })?;
    }

    let content = spec.content.as_deref().unwrap_or_default();
    let new_text = match spec.kind {
        EditKind::Delete => splice::delete(text, span),
        EditKind::Replace => splice::replace(text, span, content, sep),
        EditKind::Insert => {
            if spec.after_pattern.is_some() {
                splice::insert_after(text, span, content, sep)
            } else {
                splice::insert_before(text, span, content, sep)
            }
        }
    }
    .map_err(|e| EditOutcome::InvalidSpec {
        reason: e.to_string(),
    })?;

    Ok((new_text, span))
}

/// Resolve the target span (delete/replace) or anchor span (insert) for an
/// already-validated spec.
fn resolve_span(text: &str, spec: &EditSpec) -> Result<Span, EditOutcome> {
    let result = match spec.kind {
        EditKind::Delete | EditKind::Replace => {
            let start = spec.start_pattern.as_deref().unwrap_or_default();
            matcher::locate(text, start, spec.end_pattern.as_deref())
        }
        EditKind::Insert => {
            let anchor = spec
                .after_pattern
                .as_deref()
                .or(spec.before_pattern.as_deref())
                .unwrap_or_default();
            matcher::locate(text, anchor, None)
        }
    };

    result.map_err(|e| match e {
        LocateError::NoMatch { pattern } => EditOutcome::PatternNotFound { pattern },
        LocateError::AmbiguousMatch { pattern, count } => {
            EditOutcome::PatternAmbiguous { pattern, count }
        }
        invalid @ LocateError::InvalidPattern { .. } => EditOutcome::InvalidSpec {
            reason: invalid.to_string(),
        },
    })
}
