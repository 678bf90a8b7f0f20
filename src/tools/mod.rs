//! Browsing tools the agent can call while extracting an investor profile

pub mod fetch;
pub mod jina;
pub mod search;
pub mod tool;
pub mod toolbox;

pub use fetch::FetchPageTool;
pub use jina::JinaReaderTool;
pub use search::WebSearchTool;
pub use tool::{Tool, ToolFuture, ToolRegistry};
pub use toolbox::Toolbox;
