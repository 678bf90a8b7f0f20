//! Extraction target schemas: handles, validation, and typed decoding.

mod handle;
pub mod validation;

pub use handle::{apply_doc_comments, CompletionSchema, SchemaHandle};
pub use validation::{deserialize_payload, empty_required_fields, validate_payload};
