//! investor-crawler: extract structured investor profiles from investor websites
//!
//! An LLM agent with browsing tools reads each target site and answers with
//! an [`Investor`] payload. The [`TaskDriver`] runs one extraction per URL,
//! checks every payload against the schema, and keeps one result slot per
//! input URL in input order, failed or not.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use investor_crawler::{AgentCapability, Agent, Investor, TaskDriver, Toolbox};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent = Agent::from_env(Toolbox::browsing(None, None)?)?;
//!     let driver = TaskDriver::new(AgentCapability::new(agent));
//!
//!     let urls = vec!["https://www.emeram.com/en/portfolio".to_string()];
//!     for record in driver.run::<Investor>(&urls).await {
//!         match record.value() {
//!             Some(investor) => println!("{investor}"),
//!             None => println!("{}: {}", record.url, record.status()),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

extern crate self as investor_crawler;

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod schema;
pub(crate) mod services;
pub mod tools;
pub mod types;

pub use crate::core::{Agent, AgentMemory, AgentStep, RunResult, TokenUsage};
pub use config::{CrawlerConfig, OutputFormat};
pub use crawler_macros::{completion_schema, tool};
pub use error::{CrawlerError, ErrorKind, Result};
pub use pipeline::{
    AgentCapability, ExtractionCapability, ExtractionRecord, FailurePolicy, JsonLinesSink,
    Outcome, PrettySink, RecordError, ResultSink, RunSummary, TaskDriver, TaskTemplate,
};
pub use schema::{CompletionSchema, SchemaHandle};
pub use tools::{Tool, Toolbox};
pub use types::{HoldingStatus, Investor, PortfolioCompany};

#[cfg(feature = "cli")]
pub mod cli;
