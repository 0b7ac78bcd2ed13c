//! Textpatch: pattern-based text editing with verified span edits
//!
//! An editing engine for automated callers that addresses file content by
//! pattern instead of line number: a regex locates the target span, an
//! optional expectation verifies its exact current text, and the edit
//! (insert, delete, replace) is applied as a pure splice over the document.
//!
//! # Architecture
//!
//! All edit operations resolve to a byte span located by [`matcher::locate`]
//! and applied by the splicing primitives in [`splice`]. Multi-edit requests
//! are folded by [`EditSession`], which re-resolves every pattern against
//! the current document state rather than tracking offset shifts.
//!
//! # Safety
//!
//! - A pattern that matches more than once is an error, never a guess
//! - Expected-content verification runs strictly before any mutation
//! - Atomic file writes (tempfile + fsync + rename)
//! - Sandbox base-directory enforcement with symlink resolution
//! - UTF-8 validation on read
//!
//! # Example
//!
//! ```
//! use textpatch::{Document, EditSession, EditSpec};
//!
//! let document = Document::new("x=1\n");
//! let edits = [
//!     EditSpec::replace("x=1", vec!["x=2".to_string()]).with_expected_content("x=1"),
//! ];
//!
//! let report = EditSession::new(document).run(&edits);
//! assert!(report.succeeded());
//! assert_eq!(report.text(), "x=2\n");
//! ```

pub mod cache;
pub mod document;
pub mod matcher;
pub mod request;
pub mod safety;
pub mod session;
pub mod splice;
pub mod verify;

// Re-exports
pub use document::{Document, DocumentError, LineSeparator};
pub use matcher::{find_all, find_unique, locate, LocateError, Span};
pub use request::{
    load_from_json_str, load_from_path, load_from_str, EditKind, EditRequest, EditSpec, Metadata,
    RequestConfig, RequestError, ValidationError, ValidationIssue,
};
pub use safety::{SafetyError, SandboxGuard, MAX_FILE_SIZE};
pub use session::{EditOutcome, EditSession, SessionReport};
pub use splice::SpliceError;
pub use verify::{verify, Verification, VerificationFailure};
