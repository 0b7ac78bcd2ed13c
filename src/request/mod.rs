pub mod loader;
pub mod schema;

pub use loader::{load_from_json_str, load_from_path, load_from_str, RequestError};
pub use schema::{
    EditKind, EditRequest, EditSpec, Metadata, RequestConfig, ValidationError, ValidationIssue,
    MAX_EDITS_PER_REQUEST,
};
