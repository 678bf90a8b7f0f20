//! Per-URL extraction pipeline: task prompts, the capability boundary, the
//! driver that fans targets out to it, and the sinks records are written to.

pub mod capability;
pub mod driver;
pub mod record;
pub mod sink;
pub mod task;

pub use capability::{AgentCapability, ExtractionCapability};
pub use driver::{FailurePolicy, TaskDriver};
pub use record::{ExtractionRecord, Outcome, RecordError, RunSummary};
pub use sink::{JsonLinesSink, PrettySink, ResultSink};
pub use task::TaskTemplate;
