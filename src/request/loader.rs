use crate::request::schema::{RequestConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum RequestError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl RequestError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            RequestError::Io { .. } => self,
            RequestError::Toml { path: None, source } => RequestError::Toml {
                path: Some(path),
                source,
            },
            RequestError::Json { path: None, source } => RequestError::Json {
                path: Some(path),
                source,
            },
            RequestError::Validation { path: None, source } => RequestError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Io { path, source } => {
                write!(
                    f,
                    "failed to read edit request from {}: {}",
                    path.display(),
                    source
                )
            }
            RequestError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse edit request TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse edit request TOML: {}", source),
            },
            RequestError::Json { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse edit request JSON ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse edit request JSON: {}", source),
            },
            RequestError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid edit request ({}): {}", path.display(), source),
                None => write!(f, "invalid edit request: {}", source),
            },
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Io { source, .. } => Some(source),
            RequestError::Toml { source, .. } => Some(source),
            RequestError::Json { source, .. } => Some(source),
            RequestError::Validation { source, .. } => Some(source),
        }
    }
}

/// Parse a TOML request file.
pub fn load_from_str(input: &str) -> Result<RequestConfig, RequestError> {
    let config: RequestConfig = toml_edit::de::from_str(input)
        .map_err(|source| RequestError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| RequestError::Validation { path: None, source })?;
    Ok(config)
}

/// Parse a JSON request payload (the shape spoken over the RPC boundary).
pub fn load_from_json_str(input: &str) -> Result<RequestConfig, RequestError> {
    let config: RequestConfig = serde_json::from_str(input)
        .map_err(|source| RequestError::Json { path: None, source })?;
    config
        .validate()
        .map_err(|source| RequestError::Validation { path: None, source })?;
    Ok(config)
}

/// Load a request file, dispatching on extension (`.json` is JSON,
/// everything else is TOML).
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RequestConfig, RequestError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| RequestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let result = if path.extension().and_then(|s| s.to_str()) == Some("json") {
        load_from_json_str(&contents)
    } else {
        load_from_str(&contents)
    };

    result.map_err(|error| error.with_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::schema::EditKind;

    #[test]
    fn load_toml_request() {
        let config = load_from_str(
            r#"
[meta]
name = "swap-greeting"

[[requests]]
file = "greeting.txt"

[[requests.edits]]
kind = "replace"
start_pattern = "hello"
expected_content = "hello"
content = ["goodbye"]
"#,
        )
        .unwrap();

        assert_eq!(config.meta.name, "swap-greeting");
        assert_eq!(config.requests.len(), 1);
        assert_eq!(config.requests[0].edits[0].kind, EditKind::Replace);
    }

    #[test]
    fn load_json_request() {
        let config = load_from_json_str(
            r#"{
                "requests": [{
                    "file": "app.py",
                    "edits": [
                        {"kind": "insert", "after_pattern": "import os\n", "content": ["import sys"]}
                    ]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.requests[0].file, "app.py");
        assert_eq!(config.requests[0].edits[0].kind, EditKind::Insert);
    }

    #[test]
    fn empty_request_list_is_rejected() {
        let result = load_from_str("[meta]\nname = \"empty\"\n");
        assert!(matches!(result, Err(RequestError::Validation { .. })));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let result = load_from_str("[[requests]\nfile=");
        assert!(matches!(result, Err(RequestError::Toml { .. })));
    }
}
