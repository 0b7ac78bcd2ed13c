use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Line-separator convention of a document.
///
/// Detected once when the document is constructed and preserved across
/// edits; content lines supplied by a request are joined with whichever
/// convention the file already uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSeparator {
    Lf,
    CrLf,
}

impl LineSeparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineSeparator::Lf => "\n",
            LineSeparator::CrLf => "\r\n",
        }
    }

    /// Detect the convention used by `text`. A document with any CRLF
    /// sequence is treated as CRLF; everything else (including empty text)
    /// defaults to LF.
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineSeparator::CrLf
        } else {
            LineSeparator::Lf
        }
    }
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// The full text content of one file, owned exclusively for the duration of
/// an edit request.
///
/// Created by reading the file (or from an in-memory string), mutated
/// edit-by-edit by the session, and written back atomically at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    separator: LineSeparator,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let separator = LineSeparator::detect(&text);
        Self { text, separator }
    }

    /// Read a document from disk, validating UTF-8.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let bytes = fs::read(path)?;
        let text = String::from_utf8(bytes)?;
        Ok(Self::new(text))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn separator(&self) -> LineSeparator {
        self.separator
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Replace the document text with the result of an edit.
    ///
    /// The separator convention detected at construction is kept, so a file
    /// only changes convention when an edit's content explicitly does so.
    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    /// Append content lines at the end of the document.
    ///
    /// With `ensure_newline`, a non-empty document that does not end with a
    /// separator gets one first, so appended content starts on its own line.
    /// Each content line is terminated; appending is always safe in the
    /// sense that existing text is never touched.
    pub fn append_lines(&mut self, lines: &[String], ensure_newline: bool) {
        let sep = self.separator.as_str();

        if ensure_newline && !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push_str(sep);
        }

        for line in lines {
            self.text.push_str(line);
            if !line.ends_with('\n') {
                self.text.push_str(sep);
            }
        }
    }

    /// Write the document to disk atomically.
    ///
    /// Uses tempfile + fsync + rename so a crash mid-write leaves either the
    /// old content or the new content, never a torn file. The mtime is
    /// bumped afterwards so downstream watchers notice the change.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        atomic_write(path, self.text.as_bytes())?;

        let now = filetime::FileTime::now();
        filetime::set_file_mtime(path, now)?;

        Ok(())
    }
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), DocumentError> {
    let parent = path.parent().ok_or_else(|| {
        DocumentError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| DocumentError::Io(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_lf() {
        let doc = Document::new("a\nb\n");
        assert_eq!(doc.separator(), LineSeparator::Lf);
    }

    #[test]
    fn detects_crlf() {
        let doc = Document::new("a\r\nb\r\n");
        assert_eq!(doc.separator(), LineSeparator::CrLf);
    }

    #[test]
    fn empty_defaults_to_lf() {
        assert_eq!(LineSeparator::detect(""), LineSeparator::Lf);
    }

    #[test]
    fn separator_survives_set_text() {
        let mut doc = Document::new("a\r\nb\r\n");
        doc.set_text("a\r\n".to_string());
        assert_eq!(doc.separator(), LineSeparator::CrLf);
    }

    #[test]
    fn append_to_terminated_document() {
        let mut doc = Document::new("log line 1\n");
        doc.append_lines(&["log line 2".to_string()], true);
        assert_eq!(doc.text(), "log line 1\nlog line 2\n");
    }

    #[test]
    fn append_inserts_missing_newline_first() {
        let mut doc = Document::new("no trailing newline");
        doc.append_lines(&["appended".to_string()], true);
        assert_eq!(doc.text(), "no trailing newline\nappended\n");
    }

    #[test]
    fn append_without_newline_guard_continues_last_line() {
        let mut doc = Document::new("partial");
        doc.append_lines(&["-suffix".to_string()], false);
        assert_eq!(doc.text(), "partial-suffix\n");
    }

    #[test]
    fn append_to_empty_document() {
        let mut doc = Document::new("");
        doc.append_lines(&["first".to_string(), "second".to_string()], true);
        assert_eq!(doc.text(), "first\nsecond\n");
    }

    #[test]
    fn append_keeps_crlf_convention() {
        let mut doc = Document::new("a\r\n");
        doc.append_lines(&["b".to_string()], true);
        assert_eq!(doc.text(), "a\r\nb\r\n");
    }

    #[test]
    fn from_path_rejects_invalid_utf8() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("binary.bin");
        fs::write(&file, [0xff, 0xfe, 0x00, 0x01]).unwrap();

        let result = Document::from_path(&file);
        assert!(matches!(result, Err(DocumentError::Utf8(_))));
    }

    #[test]
    fn atomic_write_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("out.txt");
        fs::write(&file, "original content").unwrap();

        let doc = Document::new("modified content\n");
        doc.write_to(&file).unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "modified content\n");
    }
}
