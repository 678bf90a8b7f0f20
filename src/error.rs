use serde::Serialize;
use thiserror::Error;

/// Main error type for the crawler
#[derive(Error, Debug)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schema conformance error: {0}")]
    SchemaConformance(String),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid function call: {0}")]
    InvalidFunctionCall(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Maximum iterations exceeded: {0}")]
    MaxIterations(usize),

    #[error("Rate limit exceeded: retry after {retry_after}s")]
    RateLimit { retry_after: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Coarse failure classes surfaced in result records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing credential or invalid settings; aborts before any extraction.
    Configuration,
    /// The capability call itself failed (transport, API, tool, agent loop).
    CapabilityInvocation,
    /// The capability answered, but not in the declared shape.
    SchemaConformance,
    /// The capability did not answer within the per-call deadline.
    Timeout,
    /// Writing results failed.
    Output,
}

impl CrawlerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrawlerError::Config(_) => ErrorKind::Configuration,
            CrawlerError::SchemaConformance(_) => ErrorKind::SchemaConformance,
            CrawlerError::Timeout(_) => ErrorKind::Timeout,
            CrawlerError::Io(_) => ErrorKind::Output,
            CrawlerError::Http(_)
            | CrawlerError::Api(_)
            | CrawlerError::Serialization(_)
            | CrawlerError::ToolExecution(_)
            | CrawlerError::ToolNotFound(_)
            | CrawlerError::InvalidFunctionCall(_)
            | CrawlerError::MaxIterations(_)
            | CrawlerError::RateLimit { .. } => ErrorKind::CapabilityInvocation,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CrawlerError::Http(_)
                | CrawlerError::SchemaConformance(_)
                | CrawlerError::RateLimit { .. }
                | CrawlerError::Timeout(_)
                | CrawlerError::MaxIterations(_)
        )
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            CrawlerError::Config(_) => "CONFIG_ERROR",
            CrawlerError::Http(_) => "HTTP_ERROR",
            CrawlerError::Api(_) => "API_ERROR",
            CrawlerError::Serialization(_) => "SERIALIZATION_ERROR",
            CrawlerError::SchemaConformance(_) => "SCHEMA_CONFORMANCE_ERROR",
            CrawlerError::ToolExecution(_) => "TOOL_EXECUTION_ERROR",
            CrawlerError::ToolNotFound(_) => "TOOL_NOT_FOUND",
            CrawlerError::InvalidFunctionCall(_) => "INVALID_FUNCTION_CALL",
            CrawlerError::Timeout(_) => "TIMEOUT_ERROR",
            CrawlerError::MaxIterations(_) => "MAX_ITERATIONS_EXCEEDED",
            CrawlerError::RateLimit { .. } => "RATE_LIMIT_ERROR",
            CrawlerError::Io(_) => "IO_ERROR",
        }
    }

    /// Convert to a structured error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "kind": self.kind(),
                "message": self.to_string(),
                "retryable": self.is_retryable()
            }
        })
    }
}
