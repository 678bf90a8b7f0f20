//! Procedural macros for `investor-crawler`.
//!
//! * `#[completion_schema]` turns a `JsonSchema` struct into an extraction
//!   target whose doc comments become field descriptions for the model.
//! * `tool!` declares an agent tool from a parameter type and an async closure.

mod completion_schema;
mod schema_extraction;
mod tool;

use proc_macro::TokenStream;

#[proc_macro]
pub fn tool(input: TokenStream) -> TokenStream {
    tool::expand(input)
}

#[proc_macro_attribute]
pub fn completion_schema(attr: TokenStream, item: TokenStream) -> TokenStream {
    completion_schema::completion_schema(attr, item)
}
