use crate::verify::Verification;
use serde::Deserialize;
use std::fmt;

/// Upper bound on edits per request, mirroring the transport-side limit.
pub const MAX_EDITS_PER_REQUEST: usize = 1000;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RequestConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub requests: Vec<EditRequest>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One file plus the ordered edits to apply to it. Each request is processed
/// as a single edit session against one snapshot of the file.
#[derive(Debug, Deserialize, Clone)]
pub struct EditRequest {
    /// Target path, resolved against the sandbox base directory
    pub file: String,
    #[serde(default)]
    pub edits: Vec<EditSpec>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Insert,
    Delete,
    Replace,
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditKind::Insert => write!(f, "insert"),
            EditKind::Delete => write!(f, "delete"),
            EditKind::Replace => write!(f, "replace"),
        }
    }
}

/// One requested transformation.
///
/// Delete and replace target the unique match of `start_pattern` (optionally
/// extended through `end_pattern` for block mode); insert anchors on the
/// unique match of `after_pattern` or `before_pattern`. `expected_content`
/// (or `expected_hash`, xxh3 as a hex string) guards the located span before
/// anything is mutated.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EditSpec {
    #[serde(alias = "type")]
    pub kind: EditKind,
    #[serde(default)]
    pub start_pattern: Option<String>,
    #[serde(default)]
    pub end_pattern: Option<String>,
    #[serde(default)]
    pub after_pattern: Option<String>,
    #[serde(default)]
    pub before_pattern: Option<String>,
    #[serde(default)]
    pub expected_content: Option<String>,
    #[serde(default)]
    pub expected_hash: Option<String>,
    #[serde(default)]
    pub content: Option<Vec<String>>,
}

impl EditSpec {
    fn bare(kind: EditKind) -> Self {
        Self {
            kind,
            start_pattern: None,
            end_pattern: None,
            after_pattern: None,
            before_pattern: None,
            expected_content: None,
            expected_hash: None,
            content: None,
        }
    }

    pub fn delete(start_pattern: impl Into<String>) -> Self {
        Self {
            start_pattern: Some(start_pattern.into()),
            ..Self::bare(EditKind::Delete)
        }
    }

    pub fn replace(start_pattern: impl Into<String>, content: Vec<String>) -> Self {
        Self {
            start_pattern: Some(start_pattern.into()),
            content: Some(content),
            ..Self::bare(EditKind::Replace)
        }
    }

    pub fn insert_after(after_pattern: impl Into<String>, content: Vec<String>) -> Self {
        Self {
            after_pattern: Some(after_pattern.into()),
            content: Some(content),
            ..Self::bare(EditKind::Insert)
        }
    }

    pub fn insert_before(before_pattern: impl Into<String>, content: Vec<String>) -> Self {
        Self {
            before_pattern: Some(before_pattern.into()),
            content: Some(content),
            ..Self::bare(EditKind::Insert)
        }
    }

    pub fn with_end_pattern(mut self, end_pattern: impl Into<String>) -> Self {
        self.end_pattern = Some(end_pattern.into());
        self
    }

    pub fn with_expected_content(mut self, expected: impl Into<String>) -> Self {
        self.expected_content = Some(expected.into());
        self
    }

    pub fn with_expected_hash(mut self, hash: u64) -> Self {
        self.expected_hash = Some(format!("{hash:#x}"));
        self
    }

    /// Check the structural rules for this edit's kind.
    ///
    /// Violations are per-edit failures (they become `InvalidSpec`
    /// outcomes), not request-level errors: a bad edit in position 3 must
    /// not stop positions 1 and 2 from being attempted.
    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            EditKind::Delete | EditKind::Replace => {
                match &self.start_pattern {
                    Some(p) if !p.is_empty() => {}
                    _ => return Err(format!("{} requires start_pattern", self.kind)),
                }
                if self.after_pattern.is_some() || self.before_pattern.is_some() {
                    return Err(format!(
                        "{} takes start_pattern, not an insert anchor",
                        self.kind
                    ));
                }
            }
            EditKind::Insert => {
                match (&self.after_pattern, &self.before_pattern) {
                    (Some(p), None) | (None, Some(p)) if !p.is_empty() => {}
                    (Some(_), Some(_)) => {
                        return Err(
                            "insert takes either after_pattern or before_pattern, not both"
                                .to_string(),
                        )
                    }
                    _ => {
                        return Err(
                            "insert requires an after_pattern or before_pattern anchor".to_string()
                        )
                    }
                }
                if self.start_pattern.is_some() || self.end_pattern.is_some() {
                    return Err("insert takes an anchor pattern, not start/end patterns".to_string());
                }
            }
        }

        match self.kind {
            EditKind::Replace | EditKind::Insert => {
                if self.content.as_ref().map_or(true, |c| c.is_empty()) {
                    return Err(format!("{} requires content", self.kind));
                }
            }
            EditKind::Delete => {
                if self.content.is_some() {
                    return Err("delete does not take content".to_string());
                }
            }
        }

        if self.expected_content.is_some() && self.expected_hash.is_some() {
            return Err("expected_content and expected_hash are mutually exclusive".to_string());
        }

        Ok(())
    }

    /// Build the verification for this edit, if any was requested.
    pub fn verification(&self) -> Result<Option<Verification>, String> {
        if let Some(expected) = &self.expected_content {
            return Ok(Some(Verification::Exact(expected.clone())));
        }

        if let Some(hash) = &self.expected_hash {
            let digits = hash.strip_prefix("0x").unwrap_or(hash);
            let value = u64::from_str_radix(digits, 16)
                .map_err(|_| format!("expected_hash is not a valid xxh3 hex digest: '{hash}'"))?;
            return Ok(Some(Verification::Hash(value)));
        }

        Ok(None)
    }
}

impl RequestConfig {
    /// Request-level validation, run at load time.
    ///
    /// This covers the shape of the request file itself; structural problems
    /// inside individual edits are deliberately left to the session so they
    /// surface as per-edit outcomes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.requests.is_empty() {
            issues.push(ValidationIssue::EmptyRequestList);
        }

        for (index, request) in self.requests.iter().enumerate() {
            if request.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingFile { index });
            }
            if request.edits.is_empty() {
                issues.push(ValidationIssue::EmptyEditList {
                    index,
                    file: request.file.clone(),
                });
            }
            if request.edits.len() > MAX_EDITS_PER_REQUEST {
                issues.push(ValidationIssue::TooManyEdits {
                    index,
                    count: request.edits.len(),
                    limit: MAX_EDITS_PER_REQUEST,
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRequestList,
    MissingFile {
        index: usize,
    },
    EmptyEditList {
        index: usize,
        file: String,
    },
    TooManyEdits {
        index: usize,
        count: usize,
        limit: usize,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRequestList => write!(f, "request file contains no requests"),
            ValidationIssue::MissingFile { index } => {
                write!(f, "request {index} is missing the target file path")
            }
            ValidationIssue::EmptyEditList { index, file } => {
                write!(f, "request {index} ('{file}') contains no edits")
            }
            ValidationIssue::TooManyEdits {
                index,
                count,
                limit,
            } => write!(
                f,
                "request {index} contains {count} edits, exceeding the limit of {limit}"
            ),
        }
    }
}
